//! Decision values emitted by the engine.
//!
//! | Decision | Controller action |
//! |----------|-------------------|
//! | `Ignore` | none, the agent keeps talking |
//! | `Interrupt` | halt output, start listening |
//! | `Pass` | route the text to normal input handling |

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a decision was taken. Serialises to the kebab-case names below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    /// `"command-word"`
    CommandWord,
    /// `"filler-word"`
    FillerWord,
    /// `"partial-timeout-command"`
    PartialTimeoutCommand,
    /// `"partial-timeout-filler"`
    PartialTimeoutFiller,
    /// `"agent-silent"`
    AgentSilent,
    /// `"unmatched-while-speaking"`
    UnmatchedWhileSpeaking,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::CommandWord => "command-word",
            DecisionReason::FillerWord => "filler-word",
            DecisionReason::PartialTimeoutCommand => "partial-timeout-command",
            DecisionReason::PartialTimeoutFiller => "partial-timeout-filler",
            DecisionReason::AgentSilent => "agent-silent",
            DecisionReason::UnmatchedWhileSpeaking => "unmatched-while-speaking",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of a [`Decision`], handy for counters and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionKind {
    Ignore,
    Interrupt,
    Pass,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionKind::Ignore => f.write_str("IGNORE"),
            DecisionKind::Interrupt => f.write_str("INTERRUPT"),
            DecisionKind::Pass => f.write_str("PASS"),
        }
    }
}

/// One classification outcome. `text` is the transcript exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "UPPERCASE")]
pub enum Decision {
    Ignore { reason: DecisionReason, text: String },
    Interrupt { reason: DecisionReason, text: String },
    Pass { reason: DecisionReason, text: String },
}

impl Decision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Ignore { .. } => DecisionKind::Ignore,
            Decision::Interrupt { .. } => DecisionKind::Interrupt,
            Decision::Pass { .. } => DecisionKind::Pass,
        }
    }

    pub fn reason(&self) -> DecisionReason {
        match self {
            Decision::Ignore { reason, .. }
            | Decision::Interrupt { reason, .. }
            | Decision::Pass { reason, .. } => *reason,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Decision::Ignore { text, .. }
            | Decision::Interrupt { text, .. }
            | Decision::Pass { text, .. } => text,
        }
    }

    pub(crate) fn new(kind: DecisionKind, reason: DecisionReason, text: impl Into<String>) -> Self {
        let text = text.into();
        match kind {
            DecisionKind::Ignore => Decision::Ignore { reason, text },
            DecisionKind::Interrupt => Decision::Interrupt { reason, text },
            DecisionKind::Pass => Decision::Pass { reason, text },
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {:?}", self.kind(), self.reason(), self.text())
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Observer registered at engine construction.
///
/// Called after the engine has finished its own bookkeeping and released its
/// lock, either from the caller's context or from the partial-timer task.
/// Implementations should return quickly.
pub trait DecisionHandler: Send + Sync + 'static {
    fn on_decision(&self, decision: &Decision);
}

impl<F> DecisionHandler for F
where
    F: Fn(&Decision) + Send + Sync + 'static,
{
    fn on_decision(&self, decision: &Decision) {
        self(decision)
    }
}

/// Broadcast to [`crate::DecisionEngine::subscribe`] receivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEvent {
    /// Monotonically increasing per engine, starting at 1.
    pub seq: u64,
    #[serde(flatten)]
    pub decision: Decision,
}
