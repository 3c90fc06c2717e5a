//! Speech capabilities consumed by the session controller.
//!
//! Both capabilities are fire-and-report: calls return immediately and the
//! outcome arrives later as a [`VoiceEvent`] on the application event channel.

pub mod console;

use std::fmt;

use thiserror::Error;

/// Ticket for one speak request, echoed back on completion so late results
/// from stopped playback can be told apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeechId(pub u64);

impl fmt::Display for SpeechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechRequest {
    pub id: SpeechId,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechOutcome {
    Finished,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceEvent {
    SpeechFinished { id: SpeechId, outcome: SpeechOutcome },
    Transcript(String),
    RecognitionError(String),
    ListeningChanged(bool),
}

/// Runtime problems reported by the capabilities. None of them stop the
/// process; the controller turns them into notices.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PracticeError {
    #[error("speech recognition isn't supported in this environment")]
    RecognitionUnsupported,
    #[error("speech recognition error: {0}")]
    Recognition(String),
    #[error("speech playback failed: {0}")]
    Speech(String),
}

pub trait Speaker {
    /// Begin speaking; completion is reported as [`VoiceEvent::SpeechFinished`].
    fn speak(&mut self, request: SpeechRequest);
    /// Cut off any playback. Safe to call when idle.
    fn stop(&mut self);
}

pub trait Recognizer {
    /// Whether recognition exists at all here. Fixed for the recognizer's lifetime.
    fn is_supported(&self) -> bool;
    fn start(&mut self);
    fn stop(&mut self);
}
