pub mod feedback;
pub mod normalize;
pub mod scoring;

pub use feedback::{Feedback, Tone, build_feedback};
pub use scoring::{Mode, ScoreResult, score};
