//! Scripted VAD/STT sessions.
//!
//! A scenario is a list of steps replayed in real time against one engine:
//!
//! ```json
//! [{ "name": "command partial", "steps": [
//!     { "op": "speaking", "value": true },
//!     { "op": "vadStart" },
//!     { "op": "partial", "text": "sto" },
//!     { "op": "waitMs", "value": 350 }
//! ]}]
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use bargein_core::{Decision, DecisionEngine};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::warn;

/// Gap between consecutive partials, roughly what a streaming STT produces.
const PARTIAL_GAP_MS: u64 = 50;
/// Delay between the last partial and the final.
const FINAL_DELAY_MS: u64 = 100;
/// Extra wait past the partial timeout so the timer has fired.
const TIMEOUT_SLACK_MS: u64 = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Speaking { value: bool },
    VadStart,
    Partial { text: String },
    Final { text: String },
    WaitMs { value: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// One utterance: set speaking, VAD onset, paced partials, then either the
    /// final or a wait long enough for the partial timer to fire.
    pub fn utterance(
        name: &str,
        speaking: bool,
        partials: &[&str],
        final_text: Option<&str>,
        timeout_ms: u64,
    ) -> Self {
        let mut steps = vec![Step::Speaking { value: speaking }, Step::VadStart];
        for partial in partials {
            steps.push(Step::WaitMs {
                value: PARTIAL_GAP_MS,
            });
            steps.push(Step::Partial {
                text: partial.to_string(),
            });
        }
        match final_text {
            Some(text) => {
                steps.push(Step::WaitMs {
                    value: FINAL_DELAY_MS,
                });
                steps.push(Step::Final {
                    text: text.to_string(),
                });
            }
            None => steps.push(Step::WaitMs {
                value: timeout_ms + TIMEOUT_SLACK_MS,
            }),
        }
        Self {
            name: name.to_string(),
            steps,
        }
    }
}

pub fn builtin_scenarios(timeout_ms: u64) -> Vec<Scenario> {
    vec![
        Scenario::utterance("Filler while speaking (okay)", true, &[], Some("okay"), timeout_ms),
        Scenario::utterance("Affirmation while silent (yeah)", false, &[], Some("yeah"), timeout_ms),
        Scenario::utterance("Command while speaking (stop)", true, &[], Some("stop"), timeout_ms),
        Scenario::utterance(
            "Mixed while speaking (yeah wait a second)",
            true,
            &[],
            Some("yeah wait a second"),
            timeout_ms,
        ),
        Scenario::utterance(
            "Filler partials (ye, yeah)",
            true,
            &["ye", "yeah"],
            None,
            timeout_ms,
        ),
        Scenario::utterance("Command partial then timeout (sto)", true, &["sto"], None, timeout_ms),
        Scenario::utterance(
            "Command partial then final (sto → stop)",
            true,
            &["sto"],
            Some("stop"),
            timeout_ms,
        ),
    ]
}

pub fn load_scenarios(path: &Path) -> anyhow::Result<Vec<Scenario>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid scenario file {}", path.display()))
}

/// Replay `scenario` and return every decision the engine emitted meanwhile,
/// including ones fired by the partial timer.
pub async fn run_scenario(engine: &DecisionEngine, scenario: &Scenario) -> Vec<Decision> {
    let mut rx = engine.subscribe();

    for step in &scenario.steps {
        match step {
            Step::Speaking { value } => engine.set_speaking(*value),
            Step::VadStart => engine.on_vad_start(),
            Step::Partial { text } => {
                engine.on_stt_partial(text);
            }
            Step::Final { text } => {
                engine.on_stt_final(text);
            }
            Step::WaitMs { value } => tokio::time::sleep(Duration::from_millis(*value)).await,
        }
    }

    let mut decisions = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => decisions.push(event.decision),
            Err(TryRecvError::Lagged(n)) => warn!("decision receiver lagged by {n} events"),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    decisions
}
