use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const MIN_SEQUENCE_LENGTH: usize = 1;
pub const MAX_SEQUENCE_LENGTH: usize = 14;
pub const MIN_MEMORIZE_SECS: u32 = 5;
pub const MAX_MEMORIZE_SECS: u32 = 60;
pub const MEMORIZE_SECS_STEP: u32 = 5;
pub const MIN_SPEECH_RATE: f32 = 0.1;
pub const MAX_SPEECH_RATE: f32 = 3.0;
pub const SPEECH_RATE_STEP: f32 = 0.1;

/// Settings for a single round, snapshotted when the round starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundConfig {
    pub sequence_length: usize,
    pub memorize_secs: u32,
    pub number_range_exclusive_max: u32,
    pub backwards: bool,
    pub speak_enabled: bool,
    pub display_enabled: bool,
    pub speech_rate: f32,
}

impl RoundConfig {
    /// A round must be shown or spoken, otherwise there is nothing to memorize
    pub fn is_playable(&self) -> bool {
        self.speak_enabled || self.display_enabled
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Config::default().round_config()
    }
}

/// Persisted player settings, as edited through the controls panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sequence_length: usize,
    pub memorize_secs: u32,
    /// Upper bound as typed by the player; parsed when a round starts
    pub range: String,
    pub backwards: bool,
    pub speak: bool,
    pub display: bool,
    pub speech_rate: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sequence_length: 6,
            memorize_secs: 5,
            range: "9".to_string(),
            backwards: false,
            speak: false,
            display: true,
            speech_rate: 1.0,
        }
    }
}

impl Config {
    pub fn round_config(&self) -> RoundConfig {
        RoundConfig {
            sequence_length: self
                .sequence_length
                .clamp(MIN_SEQUENCE_LENGTH, MAX_SEQUENCE_LENGTH),
            memorize_secs: self.memorize_secs,
            number_range_exclusive_max: parse_range(&self.range),
            backwards: self.backwards,
            speak_enabled: self.speak,
            display_enabled: self.display,
            speech_rate: self.speech_rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE),
        }
    }

    /// Snap every value into its control range
    pub fn normalized(mut self) -> Self {
        self.adjust_length(0);
        self.adjust_memorize_secs(0);
        self.adjust_speech_rate(0);
        self.range.retain(|c| c.is_ascii_digit());
        self
    }

    pub fn adjust_length(&mut self, steps: i32) {
        let next = self.sequence_length as i64 + steps as i64;
        self.sequence_length =
            next.clamp(MIN_SEQUENCE_LENGTH as i64, MAX_SEQUENCE_LENGTH as i64) as usize;
    }

    pub fn adjust_memorize_secs(&mut self, steps: i32) {
        let snapped = (self.memorize_secs / MEMORIZE_SECS_STEP) as i64 + steps as i64;
        let next = snapped * MEMORIZE_SECS_STEP as i64;
        self.memorize_secs = next.clamp(MIN_MEMORIZE_SECS as i64, MAX_MEMORIZE_SECS as i64) as u32;
    }

    pub fn adjust_speech_rate(&mut self, steps: i32) {
        // work in tenths to keep the slider on exact steps
        let tenths = (self.speech_rate / SPEECH_RATE_STEP).round() as i32 + steps;
        let min = (MIN_SPEECH_RATE / SPEECH_RATE_STEP).round() as i32;
        let max = (MAX_SPEECH_RATE / SPEECH_RATE_STEP).round() as i32;
        self.speech_rate = tenths.clamp(min, max) as f32 / 10.0;
    }

    pub fn push_range_char(&mut self, c: char) {
        if c.is_ascii_digit() && self.range.len() < 9 {
            self.range.push(c);
        }
    }

    pub fn pop_range_char(&mut self) {
        self.range.pop();
    }
}

/// Resolve the free-form range text to an exclusive upper bound of at least 1
pub fn parse_range(text: &str) -> u32 {
    text.trim().parse::<u32>().unwrap_or(0).max(1)
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "seqmem") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("seqmem_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg.normalized(),
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable config")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
