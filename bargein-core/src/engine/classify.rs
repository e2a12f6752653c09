//! Pure classification rules. No state, no timers, no side effects.
//!
//! ```text
//! final, silent                   → PASS      agent-silent
//! final, speaking, command        → INTERRUPT command-word
//! final, speaking, filler         → IGNORE    filler-word
//! final, speaking, other          → PASS      unmatched-while-speaking
//!
//! partial, speaking, command      → INTERRUPT command-word
//! partial, speaking, filler       → IGNORE    filler-word
//! partial, speaking, other        → defer (arm the partial timer)
//!
//! timeout, prefix of command      → INTERRUPT partial-timeout-command
//! timeout, prefix of filler       → IGNORE    partial-timeout-filler
//! timeout, other                  → dropped
//! ```

use crate::decision::{DecisionKind, DecisionReason};
use crate::lexicon::{MatchMode, WordKind, WordSet};

/// Outcome of looking at one partial transcript while the agent speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartialVerdict {
    Decided(DecisionKind, DecisionReason),
    /// Wait for the final or the timeout. `hint` names the list the text
    /// could still grow into, `None` when it matches nothing yet.
    Defer { hint: Option<WordKind> },
    /// Nothing to judge (empty after normalisation).
    Empty,
}

/// The configured word lists plus the rules that read them.
#[derive(Debug, Clone)]
pub(crate) struct Classifier {
    fillers: WordSet,
    commands: WordSet,
    mode: MatchMode,
}

impl Classifier {
    pub(crate) fn new(fillers: WordSet, commands: WordSet, mode: MatchMode) -> Self {
        Self {
            fillers,
            commands,
            mode,
        }
    }

    /// Complete-utterance match. Commands are checked first.
    fn complete_match(&self, text: &str) -> Option<WordKind> {
        if text.is_empty() {
            return None;
        }
        match self.mode {
            MatchMode::Exact => {
                if self.commands.contains(text) {
                    Some(WordKind::Command)
                } else if self.fillers.contains(text) {
                    Some(WordKind::Filler)
                } else {
                    None
                }
            }
            MatchMode::Contains => {
                if self.commands.find_in(text).is_some() {
                    Some(WordKind::Command)
                } else if self.fillers.covers(text) {
                    Some(WordKind::Filler)
                } else {
                    None
                }
            }
        }
    }

    /// Decide a final transcript. `text` must be normalised.
    pub(crate) fn classify_final(&self, speaking: bool, text: &str) -> (DecisionKind, DecisionReason) {
        if !speaking {
            return (DecisionKind::Pass, DecisionReason::AgentSilent);
        }
        match self.complete_match(text) {
            Some(WordKind::Command) => (DecisionKind::Interrupt, DecisionReason::CommandWord),
            Some(WordKind::Filler) => (DecisionKind::Ignore, DecisionReason::FillerWord),
            None => (DecisionKind::Pass, DecisionReason::UnmatchedWhileSpeaking),
        }
    }

    /// Look at a partial transcript while the agent speaks. `text` must be normalised.
    pub(crate) fn classify_partial(&self, text: &str) -> PartialVerdict {
        if text.is_empty() {
            return PartialVerdict::Empty;
        }
        match self.complete_match(text) {
            Some(WordKind::Command) => {
                return PartialVerdict::Decided(DecisionKind::Interrupt, DecisionReason::CommandWord)
            }
            Some(WordKind::Filler) => {
                return PartialVerdict::Decided(DecisionKind::Ignore, DecisionReason::FillerWord)
            }
            None => {}
        }

        let hint = if self.commands.is_prefix_of_any(text) || self.commands.any_is_prefix_of(text) {
            Some(WordKind::Command)
        } else if self.fillers.is_prefix_of_any(text) {
            Some(WordKind::Filler)
        } else {
            None
        };
        PartialVerdict::Defer { hint }
    }

    /// Force a decision for a partial whose timer expired. `None` means the
    /// partial stays unresolved until a final arrives.
    pub(crate) fn classify_timeout(&self, text: &str) -> Option<(DecisionKind, DecisionReason)> {
        if self.commands.is_prefix_of_any(text) {
            Some((DecisionKind::Interrupt, DecisionReason::PartialTimeoutCommand))
        } else if self.fillers.is_prefix_of_any(text) {
            Some((DecisionKind::Ignore, DecisionReason::PartialTimeoutFiller))
        } else {
            None
        }
    }
}
