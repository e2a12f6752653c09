//! Word lists and transcript normalisation.
//!
//! Both the configured phrases and every incoming transcript go through
//! [`normalize`], so matching is a plain string comparison afterwards.

pub mod word_set;

pub use word_set::WordSet;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which configured list a phrase belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordKind {
    /// Backchannel utterances ("yeah", "hmm") that never interrupt.
    Filler,
    /// Utterances ("stop", "hold on") that always interrupt.
    Command,
}

impl fmt::Display for WordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordKind::Filler => f.write_str("filler"),
            WordKind::Command => f.write_str("command"),
        }
    }
}

/// How a complete utterance is compared against the word lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The whole utterance must equal one configured phrase.
    #[default]
    Exact,
    /// Any command phrase on token boundaries interrupts; an utterance made
    /// only of filler phrases is ignored.
    Contains,
}

/// Normalise transcript text for matching.
///
/// Lowercases, splits on whitespace, strips punctuation and ellipsis markers
/// from both ends of every token, drops tokens that become empty and joins the
/// rest with single spaces. Inner hyphens and apostrophes survive
/// (`"Uh-huh..."` → `"uh-huh"`).
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|token| token.trim_matches(is_edge_marker))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_edge_marker(c: char) -> bool {
    !c.is_alphanumeric() && c != '\''
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize("  Stop  "), "stop");
    }

    #[test]
    fn strips_trailing_punctuation_and_ellipsis() {
        assert_eq!(normalize("sto…"), "sto");
        assert_eq!(normalize("wait..."), "wait");
        assert_eq!(normalize("Yeah!?"), "yeah");
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(normalize("hold \t  ON"), "hold on");
    }

    #[test]
    fn keeps_inner_hyphens_and_apostrophes() {
        assert_eq!(normalize("Uh-huh."), "uh-huh");
        assert_eq!(normalize("don't"), "don't");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(normalize("..."), "");
        assert_eq!(normalize(" … , "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn match_mode_deserializes_lowercase() {
        let mode: MatchMode = serde_json::from_str(r#""contains""#).expect("parse match mode");
        assert_eq!(mode, MatchMode::Contains);
        assert!(serde_json::from_str::<MatchMode>(r#""Contains""#).is_err());
    }
}
