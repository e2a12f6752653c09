use thiserror::Error;

use crate::lexicon::WordKind;

/// All errors produced by bargein-core.
#[derive(Debug, Error)]
pub enum BargeInError {
    #[error("{kind} word list is empty")]
    EmptyWordSet { kind: WordKind },

    #[error("words configured as both filler and command: {}", words.join(", "))]
    OverlappingWords { words: Vec<String> },

    #[error("partial timeout must be positive, got {0} ms")]
    InvalidTimeout(u64),

    #[error("no tokio runtime available — construct the engine inside a runtime or pass a handle")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, BargeInError>;
