use rust_i18n::t;
use serde::{Deserialize, Serialize};

use crate::engine::normalize::normalize;
use crate::engine::scoring::ScoreResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Good,
    Bad,
}

/// Learner-facing hints for one attempt. Rendering is left to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub tone: Tone,
    pub hints: Vec<String>,
}

impl Feedback {
    pub fn headline(&self) -> String {
        match self.tone {
            Tone::Good => t!("feedback.pass").into_owned(),
            Tone::Bad => t!("feedback.fail").into_owned(),
        }
    }
}

pub fn build_feedback(
    attempt: &str,
    expected: &str,
    keywords: &[String],
    result: &ScoreResult,
) -> Feedback {
    if result.pass {
        return Feedback {
            tone: Tone::Good,
            hints: vec![t!("feedback.pass").into_owned()],
        };
    }

    let mut hints = Vec::new();
    if !keywords.is_empty() && !result.keywords_ok {
        hints.push(t!("feedback.keywords", keywords = keywords.join(", ")).into_owned());
    }

    if needs_contraction_reminder(attempt, expected) {
        hints.push(t!("feedback.contraction").into_owned());
    }

    hints.push(t!("feedback.retry").into_owned());
    Feedback {
        tone: Tone::Bad,
        hints,
    }
}

/// Loose check for a dropped "I'm". Matches any "im" substring, so words like
/// "time" on either side also count.
fn needs_contraction_reminder(attempt: &str, expected: &str) -> bool {
    let expected = normalize(expected);
    let attempt = normalize(attempt);
    let has = |s: &str| s.contains("i'm") || s.contains("im");
    has(&expected) && !has(&attempt)
}
