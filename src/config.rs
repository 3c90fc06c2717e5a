use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::engine::scoring::Mode;
use crate::session::timer::Timing;

const MIN_SPEECH_RATE: f32 = 0.7;
const MAX_SPEECH_RATE: f32 = 1.2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_speech_language")]
    pub speech_language: String,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_advance_pause_ms")]
    pub advance_pause_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
}

fn default_speech_language() -> String {
    "en-GB".to_string()
}
fn default_speech_rate() -> f32 {
    1.0
}
fn default_locale() -> String {
    "en".to_string()
}
fn default_watchdog_secs() -> u64 {
    8
}
fn default_settle_ms() -> u64 {
    200
}
fn default_advance_pause_ms() -> u64 {
    700
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            speech_language: default_speech_language(),
            speech_rate: default_speech_rate(),
            locale: default_locale(),
            watchdog_secs: default_watchdog_secs(),
            settle_ms: default_settle_ms(),
            advance_pause_ms: default_advance_pause_ms(),
            library_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.clamp_speech_rate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("speakdr")
            .join("config.toml")
    }

    pub fn timing(&self) -> Timing {
        Timing {
            settle: Duration::from_millis(self.settle_ms),
            watchdog: Duration::from_secs(self.watchdog_secs),
            advance_pause: Duration::from_millis(self.advance_pause_ms),
        }
    }

    /// Keep the rate inside what speech engines render intelligibly.
    pub fn clamp_speech_rate(&mut self) {
        if !self.speech_rate.is_finite() {
            self.speech_rate = default_speech_rate();
        }
        self.speech_rate = self.speech_rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE);
    }
}
