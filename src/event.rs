use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::engine::scoring::Mode;
use crate::voice::VoiceEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Skip,
    Quit,
    Yes,
    No,
    Mode(Mode),
    Replay,
    Example,
    Listen,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse a `:`-prefixed console line. Returns `None` for plain text.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix(':')?;
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let command = match name.as_str() {
            "skip" | "s" => Command::Skip,
            "quit" | "q" | "exit" => Command::Quit,
            "yes" | "y" => Command::Yes,
            "no" | "n" => Command::No,
            "replay" | "r" => Command::Replay,
            "example" | "e" => Command::Example,
            "listen" | "l" => Command::Listen,
            "help" | "h" | "?" => Command::Help,
            "mode" | "m" => match parts.next().map(str::parse::<Mode>) {
                Some(Ok(mode)) => Command::Mode(mode),
                _ => Command::Unknown(rest.to_string()),
            },
            _ => Command::Unknown(rest.to_string()),
        };
        Some(command)
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Voice(VoiceEvent),
    Command(Command),
    /// Text typed while the microphone was closed.
    Input(String),
    Closed,
}

pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    /// Read stdin on a background thread. While `listening` is set, typed
    /// lines stand in for recognized speech.
    pub fn new(listening: Arc<AtomicBool>) -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if forward_line(&input_tx, &listening, line).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(AppEvent::Closed);
        });

        Self { rx, tx }
    }

    /// Channel for capability threads to report back on.
    pub fn sender(&self) -> mpsc::Sender<AppEvent> {
        self.tx.clone()
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }

    /// Wait at most `timeout`; `None` means it elapsed.
    pub fn next_timeout(&self, timeout: Duration) -> anyhow::Result<Option<AppEvent>> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(err @ RecvTimeoutError::Disconnected) => Err(err.into()),
        }
    }
}

fn forward_line(
    tx: &mpsc::Sender<AppEvent>,
    listening: &AtomicBool,
    line: String,
) -> Result<(), mpsc::SendError<AppEvent>> {
    if let Some(command) = Command::parse(&line) {
        return tx.send(AppEvent::Command(command));
    }
    // One utterance per recognition session, like a browser recognizer.
    if listening.swap(false, Ordering::SeqCst) {
        let text = line.trim();
        if !text.is_empty() {
            tx.send(AppEvent::Voice(VoiceEvent::Transcript(text.to_string())))?;
        }
        return tx.send(AppEvent::Voice(VoiceEvent::ListeningChanged(false)));
    }
    tx.send(AppEvent::Input(line))
}
