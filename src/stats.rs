use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Key the run history is stored under
pub const STATS_KEY: &str = "stats";

/// Outcome of one round: slots attempted and slots answered correctly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub total: u32,
    pub correct: u32,
}

impl RunResult {
    pub fn new(total: u32, correct: u32) -> Self {
        Self {
            total,
            correct: correct.min(total),
        }
    }
}

/// Minimal string key-value persistence
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile store, used by tests and when no data directory is available
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Append-only run history backed by a [`KeyValueStore`]
#[derive(Debug)]
pub struct StatsStore<S: KeyValueStore> {
    backend: S,
    history: Vec<RunResult>,
}

impl<S: KeyValueStore> StatsStore<S> {
    /// Open the store and read the persisted history
    pub fn open(backend: S) -> Self {
        let mut store = Self {
            backend,
            history: vec![],
        };
        store.history = store.load();
        store
    }

    /// Read the persisted history. Missing or unparsable payloads yield an empty history.
    pub fn load(&self) -> Vec<RunResult> {
        let Some(raw) = self.backend.get(STATS_KEY) else {
            return vec![];
        };

        match serde_json::from_str::<Vec<RunResult>>(&raw) {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable stats payload");
                vec![]
            }
        }
    }

    pub fn history(&self) -> &[RunResult] {
        &self.history
    }

    /// Add a result and persist the whole history.
    /// The in-memory history keeps the result even when persisting fails.
    pub fn append(&mut self, result: RunResult) -> Result<(), StoreError> {
        self.history.push(result);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.history.clear();
        self.persist()
    }

    pub fn summary(&self) -> StatsSummary {
        aggregate(&self.history)
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&self.history)?;
        self.backend.set(STATS_KEY, &payload)?;
        tracing::debug!(runs = self.history.len(), "stats persisted");
        Ok(())
    }
}

/// Percentage of correct answers, or the no-data sentinel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentage {
    NoData,
    Value(f64),
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percentage::NoData => write!(f, "0"),
            Percentage::Value(v) => write!(f, "{v:.2}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    pub correct_total: u64,
    pub attempted_total: u64,
    pub runs: usize,
    pub percentage: Percentage,
}

impl StatsSummary {
    pub fn headline(&self) -> String {
        format!(
            "You have answered correctly {} times out of {} in {} runs ({}%)",
            self.correct_total, self.attempted_total, self.runs, self.percentage
        )
    }
}

pub fn aggregate(history: &[RunResult]) -> StatsSummary {
    let correct_total: u64 = history.iter().map(|r| r.correct as u64).sum();
    let attempted_total: u64 = history.iter().map(|r| r.total as u64).sum();

    let percentage = if attempted_total == 0 {
        Percentage::NoData
    } else {
        let raw = correct_total as f64 * 100.0 / attempted_total as f64;
        Percentage::Value((raw * 100.0).round() / 100.0)
    };

    StatsSummary {
        correct_total,
        attempted_total,
        runs: history.len(),
        percentage,
    }
}
