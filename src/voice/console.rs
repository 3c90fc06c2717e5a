//! Terminal stand-ins for speech output and recognition.
//!
//! The speaker prints each line and reports completion after roughly the
//! time it would take to say it. The recognizer opens a "microphone" that the
//! stdin reader in [`crate::event`] turns into transcripts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::event::AppEvent;
use crate::voice::{Recognizer, SpeechOutcome, SpeechRequest, Speaker, VoiceEvent};

const MS_PER_WORD: f64 = 320.0;
const MIN_SPEECH_MS: f64 = 400.0;

pub struct ConsoleSpeaker {
    tx: Sender<AppEvent>,
    rate: f32,
    language: String,
    /// Id of the utterance still allowed to report completion; 0 when idle.
    current: Arc<AtomicU64>,
}

impl ConsoleSpeaker {
    pub fn new(tx: Sender<AppEvent>, rate: f32, language: &str) -> Self {
        Self {
            tx,
            rate,
            language: language.to_string(),
            current: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Rough speaking time for `text` at `rate` (1.0 is normal pace).
pub fn speaking_time(text: &str, rate: f32) -> Duration {
    let words = text.split_whitespace().count() as f64;
    let rate = if rate > 0.0 { rate as f64 } else { 1.0 };
    Duration::from_millis((words * MS_PER_WORD / rate).max(MIN_SPEECH_MS) as u64)
}

impl Speaker for ConsoleSpeaker {
    fn speak(&mut self, request: SpeechRequest) {
        tracing::debug!(target: "voice", "speaking {} in {}", request.id, self.language);
        println!("  » {}", request.text);

        let delay = speaking_time(&request.text, self.rate);
        let id = request.id;
        self.current.store(id.0, Ordering::SeqCst);
        let current = Arc::clone(&self.current);
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            if current.compare_exchange(id.0, 0, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                let _ = tx.send(AppEvent::Voice(VoiceEvent::SpeechFinished {
                    id,
                    outcome: SpeechOutcome::Finished,
                }));
            }
        });
    }

    fn stop(&mut self) {
        self.current.store(0, Ordering::SeqCst);
    }
}

pub struct ConsoleRecognizer {
    tx: Sender<AppEvent>,
    listening: Arc<AtomicBool>,
}

impl ConsoleRecognizer {
    pub fn new(tx: Sender<AppEvent>, listening: Arc<AtomicBool>) -> Self {
        Self { tx, listening }
    }
}

impl Recognizer for ConsoleRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&mut self) {
        if !self.listening.swap(true, Ordering::SeqCst) {
            println!("  🎤 listening... type what you say");
            let _ = self.tx.send(AppEvent::Voice(VoiceEvent::ListeningChanged(true)));
        }
    }

    fn stop(&mut self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            let _ = self.tx.send(AppEvent::Voice(VoiceEvent::ListeningChanged(false)));
        }
    }
}
