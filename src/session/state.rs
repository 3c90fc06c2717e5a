use std::fmt;

use chrono::{DateTime, Utc};

use crate::content::schema::{Dialog, Turn};
use crate::engine::feedback::Feedback;
use crate::engine::scoring::{Mode, ScoreResult};
use crate::session::navigator::{Pair, pair_at};
use crate::session::result::{AttemptRecord, SessionSummary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Prompting,
    AwaitingLearner,
    Scoring,
    Advancing,
    Retrying,
    Completed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Starting => "starting",
            Phase::Prompting => "prompting",
            Phase::AwaitingLearner => "awaiting-learner",
            Phase::Scoring => "scoring",
            Phase::Advancing => "advancing",
            Phase::Retrying => "retrying",
            Phase::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working state for one selected dialog.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub dialog: Dialog,
    pub phase: Phase,
    /// Index into `dialog.turns`, or `turns.len()` once finished.
    pub position: usize,
    pub pair: Pair,
    pub mode: Mode,
    pub started: bool,
    pub is_learner_turn: bool,
    pub transcript: Option<String>,
    pub last_score: Option<ScoreResult>,
    pub feedback: Option<Feedback>,
    pub recognition_error: Option<String>,
    pub attempts: Vec<AttemptRecord>,
    pub started_at: Option<DateTime<Utc>>,
    /// Partner turn to move to once the advance pause elapses.
    pub(crate) pending_position: Option<usize>,
}

impl SessionState {
    pub fn new(dialog: Dialog, mode: Mode) -> Self {
        let pair = pair_at(&dialog.turns, 0);
        Self {
            dialog,
            phase: Phase::Idle,
            position: 0,
            pair,
            mode,
            started: false,
            is_learner_turn: false,
            transcript: None,
            last_score: None,
            feedback: None,
            recognition_error: None,
            attempts: Vec::new(),
            started_at: None,
            pending_position: None,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.dialog.turns
    }

    pub fn partner_turn(&self) -> Option<&Turn> {
        self.pair.partner.and_then(|i| self.dialog.turns.get(i))
    }

    pub fn learner_turn(&self) -> Option<&Turn> {
        self.pair.learner.and_then(|i| self.dialog.turns.get(i))
    }

    pub fn partner_line(&self) -> Option<&str> {
        self.partner_turn()
            .map(|t| t.text.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn expected_line(&self) -> Option<&str> {
        self.learner_turn()
            .map(|t| t.text.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// Move to `position` and recompute the displayed pair.
    pub(crate) fn move_to(&mut self, position: usize) {
        self.position = position.min(self.dialog.turns.len());
        self.pair = pair_at(&self.dialog.turns, self.position);
    }

    /// Reset per-attempt fields. Recognition errors never outlive the attempt
    /// they happened in.
    pub(crate) fn clear_attempt(&mut self, clear_feedback: bool) {
        self.transcript = None;
        self.last_score = None;
        self.recognition_error = None;
        if clear_feedback {
            self.feedback = None;
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_attempts(
            &self.dialog.id,
            &self.attempts,
            self.started_at,
            Utc::now(),
            self.is_complete(),
        )
    }

    /// Share of the dialog's learner lines already behind the current position.
    pub fn progress(&self) -> f64 {
        let turns = self.turns();
        let total = turns.iter().filter(|t| t.is_learner()).count();
        if total == 0 {
            return 0.0;
        }
        if self.is_complete() {
            return 1.0;
        }
        let current = self.pair.learner.unwrap_or(self.position);
        let done = turns[..current.min(turns.len())]
            .iter()
            .filter(|t| t.is_learner())
            .count();
        done as f64 / total as f64
    }
}
