pub mod controller;
pub mod navigator;
pub mod result;
pub mod state;
pub mod timer;

pub use controller::{Effect, ExitOutcome, Notice, SessionController};
pub use state::{Phase, SessionState};
pub use timer::{Timer, TimerKind, Timing};
