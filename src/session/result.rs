use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::scoring::{Mode, ScoreResult};

/// One scored learner attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub turn_index: usize,
    pub transcript: String,
    pub expected: String,
    pub result: ScoreResult,
    pub mode: Mode,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub dialog_id: String,
    pub lines_passed: usize,
    pub attempts: usize,
    pub average_score: f64,
    pub best_score: u8,
    pub elapsed_secs: f64,
    #[serde(default)]
    pub completed: bool,
}

impl SessionSummary {
    pub fn from_attempts(
        dialog_id: &str,
        attempts: &[AttemptRecord],
        started_at: Option<DateTime<Utc>>,
        finished_at: DateTime<Utc>,
        completed: bool,
    ) -> Self {
        let lines_passed = attempts.iter().filter(|a| a.result.pass).count();
        let average_score = if attempts.is_empty() {
            0.0
        } else {
            attempts.iter().map(|a| a.result.score as f64).sum::<f64>() / attempts.len() as f64
        };
        let best_score = attempts.iter().map(|a| a.result.score).max().unwrap_or(0);
        let elapsed_secs = started_at
            .map(|start| (finished_at - start).num_milliseconds().max(0) as f64 / 1000.0)
            .unwrap_or(0.0);

        Self {
            dialog_id: dialog_id.to_string(),
            lines_passed,
            attempts: attempts.len(),
            average_score,
            best_score,
            elapsed_secs,
            completed,
        }
    }

    /// Share of attempts that passed, as a percentage.
    pub fn pass_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        (self.lines_passed as f64 / self.attempts as f64 * 100.0).clamp(0.0, 100.0)
    }
}
