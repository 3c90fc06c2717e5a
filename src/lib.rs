// The binary in main.rs drives everything through this library so the
// benches and integration tests see the same module tree.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod config;
pub mod content;
pub mod engine;
pub mod event;
pub mod session;
pub mod voice;
