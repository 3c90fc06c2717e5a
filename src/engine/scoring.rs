use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strsim::levenshtein;

use crate::engine::normalize::{normalize, tokenize};

const EASY_MIN_TOKEN_MATCH: f64 = 0.55;
const NORMAL_MIN_TOKEN_MATCH: f64 = 0.70;
const NORMAL_MIN_SIMILARITY: f64 = 0.72;
const STRICT_MIN_SIMILARITY: f64 = 0.88;

/// Difficulty setting that selects the pass policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Easy,
    #[default]
    Normal,
    Strict,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Easy, Mode::Normal, Mode::Strict];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Easy => "easy",
            Mode::Normal => "normal",
            Mode::Strict => "strict",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Mode::Easy),
            "normal" => Ok(Mode::Normal),
            "strict" => Ok(Mode::Strict),
            other => Err(format!("unknown mode '{other}' (expected easy, normal or strict)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub pass: bool,
    pub score: u8,
    pub similarity: f64,
    pub token_match: f64,
    pub keywords_ok: bool,
}

/// Score one spoken attempt against the expected line.
pub fn score(attempt: &str, expected: &str, keywords: &[String], mode: Mode) -> ScoreResult {
    let similarity = similarity(attempt, expected);
    let token_match = token_match(attempt, expected);
    let keywords_ok = keywords.is_empty() || keywords_present(attempt, keywords);

    let pass = match mode {
        Mode::Easy => keywords_ok && token_match >= EASY_MIN_TOKEN_MATCH,
        Mode::Normal => {
            keywords_ok
                && (token_match >= NORMAL_MIN_TOKEN_MATCH || similarity >= NORMAL_MIN_SIMILARITY)
        }
        Mode::Strict => similarity >= STRICT_MIN_SIMILARITY,
    };

    ScoreResult {
        pass,
        score: (100.0 * similarity.max(token_match)).round().min(100.0) as u8,
        similarity,
        token_match,
        keywords_ok,
    }
}

/// Edit-distance closeness of the normalized strings, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => {
            let dist = levenshtein(&a, &b);
            let longest = a.chars().count().max(b.chars().count());
            1.0 - dist as f64 / longest as f64
        }
    }
}

/// Fraction of expected words heard in the attempt.
///
/// Expected words are compared as a set, so an attempt word that repeats is
/// counted every time it appears and repeated expected words only need to be
/// said once. The ratio may exceed 1 when the learner repeats words.
pub fn token_match(attempt: &str, expected: &str) -> f64 {
    let expected_tokens = tokenize(expected);
    if expected_tokens.is_empty() {
        return 0.0;
    }
    let expected_set: HashSet<&str> = expected_tokens.iter().map(String::as_str).collect();
    let hits = tokenize(attempt)
        .iter()
        .filter(|t| expected_set.contains(t.as_str()))
        .count();
    hits as f64 / expected_tokens.len() as f64
}

/// Every keyword, normalized, occurs somewhere in the normalized attempt.
pub fn keywords_present(attempt: &str, keywords: &[String]) -> bool {
    let attempt = normalize(attempt);
    keywords.iter().all(|k| attempt.contains(&normalize(k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: &str = "I'm good, thanks. And you?";

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_similarity_from_edit_distance() {
        assert!(close(similarity("kitten", "sitting"), 1.0 - 3.0 / 7.0));
        assert!(close(similarity("flaw", "lawn"), 0.5));
        assert!(close(similarity("abc", "abc"), 1.0));
        // Measured on normalized text: "3" is compared as "three".
        assert!(close(similarity("3", "tree"), 0.8));
    }

    #[test]
    fn test_distance_on_normalized_text_is_a_metric() {
        let words = ["Good", "goods!", "food", "thanks", "", "I\u{2019}m"];
        let dist = |a: &str, b: &str| levenshtein(&normalize(a), &normalize(b));
        for a in words {
            for b in words {
                let ab = dist(a, b);
                assert_eq!(ab, dist(b, a));
                for c in words {
                    assert!(ab <= dist(a, c) + dist(c, b));
                }
            }
        }
    }

    #[test]
    fn test_similarity_identities() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(similarity("x", ""), 0.0);
        assert_eq!(similarity("Hello there", "hello, THERE!"), 1.0);
        assert_eq!(similarity("?!", ""), 1.0);
    }

    #[test]
    fn test_similarity_symmetric() {
        let pairs = [("good thanks", EXPECTED), ("abc", "abd"), ("one", "1 more")];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_token_match_counts_repeats() {
        // "good" appears twice in the attempt and is counted twice.
        assert!((token_match("good good", "good morning") - 1.0).abs() < 1e-9);
        // Repeated expected words collapse to one set entry but still count
        // in the denominator.
        assert!(close(token_match("good", "good good"), 0.5));
        assert!(close(token_match("good good", "good good"), 1.0));
        assert_eq!(token_match("anything", ""), 0.0);
        assert_eq!(token_match("", "hello"), 0.0);
    }

    #[test]
    fn test_keywords_are_substrings() {
        assert!(keywords_present("thanks a lot", &keywords(&["thank"])));
        assert!(!keywords_present("hello", &keywords(&["thanks"])));
        assert!(keywords_present("it's 3 o'clock", &keywords(&["Three"])));
    }

    #[test]
    fn test_scenario_normal_pass_with_expansion() {
        let result = score(
            "I am good thanks and you",
            EXPECTED,
            &keywords(&["good", "thanks", "you"]),
            Mode::Normal,
        );
        assert!(result.keywords_ok);
        assert!(result.token_match >= 0.7);
        assert!(result.pass);
    }

    #[test]
    fn test_scenario_strict_short_attempt_fails() {
        let result = score(
            "good thanks you",
            EXPECTED,
            &keywords(&["good", "thanks", "you"]),
            Mode::Strict,
        );
        assert!(result.similarity < 0.88);
        assert!(!result.pass);
    }

    #[test]
    fn test_empty_attempt_fails_every_mode() {
        for mode in Mode::ALL {
            let result = score("", EXPECTED, &[], mode);
            assert_eq!(result.similarity, 0.0);
            assert_eq!(result.token_match, 0.0);
            assert_eq!(result.score, 0);
            assert!(!result.pass, "{mode} passed an empty attempt");
        }
    }

    #[test]
    fn test_strict_ignores_keywords_and_tokens() {
        let exact = score(EXPECTED, EXPECTED, &keywords(&["banana"]), Mode::Strict);
        assert!(!exact.keywords_ok);
        assert!(exact.pass);

        for attempt in ["I'm good thanks and you", "im good thanks and u", "good", "no idea"] {
            let r = score(attempt, EXPECTED, &keywords(&["good"]), Mode::Strict);
            assert_eq!(r.pass, r.similarity >= 0.88, "attempt {attempt:?}");
        }
    }

    #[test]
    fn test_easy_requires_keywords() {
        let r = score("I'm fine thanks and you", EXPECTED, &keywords(&["good"]), Mode::Easy);
        assert!(r.token_match >= 0.55);
        assert!(!r.keywords_ok);
        assert!(!r.pass);
    }

    #[test]
    fn test_normal_passes_on_similarity_alone() {
        // Misheard words keep token match low but the string stays close.
        let r = score("I'm god thank and you", EXPECTED, &[], Mode::Normal);
        assert!(r.token_match < 0.7);
        assert!(r.similarity >= 0.72);
        assert!(r.pass);
    }

    #[test]
    fn test_score_capped_when_words_repeat() {
        let r = score("good good good", "good day", &[], Mode::Easy);
        assert!(r.token_match > 1.0);
        assert_eq!(r.score, 100);
    }

    #[test]
    fn test_score_is_mode_independent() {
        let scores: Vec<u8> = Mode::ALL
            .iter()
            .map(|&m| score("good thanks you", EXPECTED, &[], m).score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("Strict".parse::<Mode>(), Ok(Mode::Strict));
        assert!("hard".parse::<Mode>().is_err());
        assert_eq!(Mode::Easy.to_string(), "easy");
    }
}
