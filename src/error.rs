use thiserror::Error;

use crate::round::RoundPhase;

/// Errors surfaced by key-value store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An operation was requested while the round machine had it disabled
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoundError {
    #[error("settings are locked while a round is in progress ({0})")]
    ConfigLocked(RoundPhase),

    #[error("a round needs the sequence displayed, spoken, or both")]
    NoPresentation,

    #[error("reveal is not available in phase {0}")]
    RevealUnavailable(RoundPhase),

    #[error("answer slot {index} is out of range for {len} slots")]
    AnswerOutOfRange { index: usize, len: usize },

    #[error("answers are not editable in phase {0}")]
    AnswersLocked(RoundPhase),
}
