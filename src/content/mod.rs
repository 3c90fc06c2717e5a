pub mod library;
pub mod schema;

pub use library::{ContentError, DialogEntry};
pub use schema::{Category, Dialog, Level, Library, Role, Turn};
