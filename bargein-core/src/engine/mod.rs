//! `DecisionEngine` — per-session barge-in controller.
//!
//! ## State
//!
//! ```text
//!            set_speaking(true)
//!   Silent ─────────────────────► Speaking
//!     ▲                              │
//!     └──── set_speaking(false) ─────┘  (drops any pending partial)
//!
//!   NoPending ── ambiguous partial ──► Pending ── newer partial ──► Pending (timer restarted)
//!       ▲                                │
//!       └── final / timeout / VAD onset ─┘
//! ```
//!
//! ## Threading
//!
//! Every event takes the state lock, finishes its transition and releases the
//! lock before the decision is delivered, so a handler may call straight back
//! into the engine. The partial timer is a tokio task that only holds a `Weak`
//! reference to the engine; each arm bumps a generation counter and a timer
//! whose generation no longer matches the pending partial does nothing.

pub(crate) mod classify;
pub mod diagnostics;

pub use diagnostics::{DiagnosticsSnapshot, EngineDiagnostics};

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Weak,
};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::{runtime::Handle, sync::broadcast, task::JoinHandle, time::Instant};
use tracing::{debug, info};

use crate::{
    decision::{Decision, DecisionEvent, DecisionHandler},
    error::{BargeInError, Result},
    lexicon::{normalize, MatchMode, WordKind, WordSet},
};
use classify::{Classifier, PartialVerdict};

/// Broadcast channel capacity: 256 decision events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

pub const DEFAULT_PARTIAL_TIMEOUT_MS: u64 = 200;

pub const DEFAULT_FILLER_WORDS: &[&str] =
    &["yeah", "ok", "okay", "hmm", "right", "uh-huh", "uhh", "uh"];

pub const DEFAULT_COMMAND_WORDS: &[&str] = &["wait", "stop", "no", "hold on", "cancel", "pause"];

/// Configuration for `DecisionEngine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EngineConfig {
    /// Utterances that never interrupt a speaking agent.
    pub filler_words: Vec<String>,
    /// Utterances that always interrupt a speaking agent.
    pub command_words: Vec<String>,
    /// How long an ambiguous partial may wait for its final. Default: 200.
    pub partial_timeout_ms: u64,
    /// How complete utterances are compared against the lists. Default: exact.
    pub match_mode: MatchMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filler_words: DEFAULT_FILLER_WORDS.iter().map(|w| w.to_string()).collect(),
            command_words: DEFAULT_COMMAND_WORDS.iter().map(|w| w.to_string()).collect(),
            partial_timeout_ms: DEFAULT_PARTIAL_TIMEOUT_MS,
            match_mode: MatchMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn partial_timeout(&self) -> Duration {
        Duration::from_millis(self.partial_timeout_ms)
    }

    /// Check the configuration without building an engine.
    pub fn validate(&self) -> Result<()> {
        self.build_classifier().map(|_| ())
    }

    fn build_classifier(&self) -> Result<Classifier> {
        if self.partial_timeout_ms == 0 {
            return Err(BargeInError::InvalidTimeout(self.partial_timeout_ms));
        }

        let fillers = WordSet::new(&self.filler_words);
        if fillers.is_empty() {
            return Err(BargeInError::EmptyWordSet {
                kind: WordKind::Filler,
            });
        }
        let commands = WordSet::new(&self.command_words);
        if commands.is_empty() {
            return Err(BargeInError::EmptyWordSet {
                kind: WordKind::Command,
            });
        }

        let shared = fillers.intersection(&commands);
        if !shared.is_empty() {
            return Err(BargeInError::OverlappingWords { words: shared });
        }

        Ok(Classifier::new(fillers, commands, self.match_mode))
    }
}

/// The latest ambiguous partial, waiting for its final or its timer.
struct PendingPartial {
    /// Transcript as received, reported back in the decision.
    text: String,
    normalized: String,
    received_at: Instant,
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct EngineState {
    speaking: bool,
    pending: Option<PendingPartial>,
    /// Bumped on every arm; a timer only acts if its generation is current.
    generation: u64,
}

impl EngineState {
    /// Drop the pending partial and abort its timer. Returns whether one existed.
    fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.timer.abort();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    config: EngineConfig,
    classifier: Classifier,
    timeout: Duration,
    state: Mutex<EngineState>,
    handler: Box<dyn DecisionHandler>,
    decision_tx: broadcast::Sender<DecisionEvent>,
    /// Monotonically increasing decision sequence counter.
    seq: AtomicU64,
    diagnostics: EngineDiagnostics,
    runtime: Handle,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.state.get_mut().cancel_pending();
    }
}

/// One engine per conversation session.
///
/// `DecisionEngine` is `Send + Sync`; wrap it in an `Arc` to share it between
/// the VAD, STT and agent-controller tasks.
pub struct DecisionEngine {
    inner: Arc<Inner>,
}

impl DecisionEngine {
    /// Create an engine on the current tokio runtime.
    ///
    /// # Errors
    /// - `BargeInError::NoRuntime` outside a runtime.
    /// - Any configuration error from [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, handler: impl DecisionHandler) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| BargeInError::NoRuntime)?;
        Self::with_runtime(config, handler, runtime)
    }

    /// Create an engine whose partial timers run on `runtime`.
    pub fn with_runtime(
        config: EngineConfig,
        handler: impl DecisionHandler,
        runtime: Handle,
    ) -> Result<Self> {
        let classifier = config.build_classifier()?;
        let (decision_tx, _) = broadcast::channel(BROADCAST_CAP);

        info!(
            fillers = config.filler_words.len(),
            commands = config.command_words.len(),
            timeout_ms = config.partial_timeout_ms,
            mode = ?config.match_mode,
            "decision engine ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                timeout: config.partial_timeout(),
                config,
                classifier,
                state: Mutex::new(EngineState::default()),
                handler: Box::new(handler),
                decision_tx,
                seq: AtomicU64::new(0),
                diagnostics: EngineDiagnostics::default(),
                runtime,
            }),
        })
    }

    /// The agent started or stopped producing speech.
    ///
    /// Going silent drops any pending partial without a decision.
    pub fn set_speaking(&self, speaking: bool) {
        let mut state = self.inner.state.lock();
        let was_speaking = state.speaking;
        state.speaking = speaking;

        if was_speaking && !speaking && state.cancel_pending() {
            debug!("agent went silent, pending partial dropped");
        }
    }

    /// User speech onset. Clears a pending partial left over from an earlier turn.
    pub fn on_vad_start(&self) {
        if self.inner.state.lock().cancel_pending() {
            debug!("vad onset, stale pending partial dropped");
        }
    }

    /// Handle a streaming partial transcript.
    ///
    /// Returns the decision when the partial is a complete filler or command
    /// while the agent speaks. Anything else arms (or restarts) the partial
    /// timer and returns `None`. Partials are not judged while the agent is
    /// silent.
    pub fn on_stt_partial(&self, text: &str) -> Option<Decision> {
        EngineDiagnostics::bump(&self.inner.diagnostics.partials_in);
        let normalized = normalize(text);

        let decision = {
            let mut state = self.inner.state.lock();
            if !state.speaking {
                return None;
            }

            match self.inner.classifier.classify_partial(&normalized) {
                PartialVerdict::Empty => return None,
                PartialVerdict::Decided(kind, reason) => {
                    state.cancel_pending();
                    Decision::new(kind, reason, text)
                }
                PartialVerdict::Defer { hint } => {
                    EngineDiagnostics::bump(&self.inner.diagnostics.partials_deferred);
                    debug!(partial = %normalized, ?hint, "partial deferred");
                    self.arm(&mut state, text, normalized);
                    return None;
                }
            }
        };

        self.inner.emit(&decision);
        Some(decision)
    }

    /// Handle the final transcript of an utterance.
    ///
    /// Always supersedes a pending partial. Returns `None` only when the text
    /// is empty after normalisation.
    pub fn on_stt_final(&self, text: &str) -> Option<Decision> {
        EngineDiagnostics::bump(&self.inner.diagnostics.finals_in);
        let normalized = normalize(text);

        let decision = {
            let mut state = self.inner.state.lock();
            state.cancel_pending();
            if normalized.is_empty() {
                debug!("empty final transcript, no decision");
                return None;
            }
            let (kind, reason) = self
                .inner
                .classifier
                .classify_final(state.speaking, &normalized);
            Decision::new(kind, reason, text)
        };

        self.inner.emit(&decision);
        Some(decision)
    }

    /// Subscribe to every decision this engine emits.
    pub fn subscribe(&self) -> broadcast::Receiver<DecisionEvent> {
        self.inner.decision_tx.subscribe()
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.state.lock().speaking
    }

    /// Whether an ambiguous partial is waiting on its timer.
    pub fn has_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.inner.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Replace the pending partial and restart the timer.
    fn arm(&self, state: &mut EngineState, text: &str, normalized: String) {
        state.cancel_pending();
        state.generation += 1;
        let generation = state.generation;

        let received_at = Instant::now();
        let deadline = received_at + self.inner.timeout;
        let engine: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer = self.inner.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = engine.upgrade() {
                inner.on_timeout(generation);
            }
        });

        state.pending = Some(PendingPartial {
            text: text.to_owned(),
            normalized,
            received_at,
            generation,
            timer,
        });
    }
}

impl Inner {
    fn on_timeout(&self, generation: u64) {
        let decision = {
            let mut state = self.state.lock();
            let current = state
                .pending
                .as_ref()
                .is_some_and(|p| p.generation == generation);
            if !current {
                EngineDiagnostics::bump(&self.diagnostics.stale_timer_fires);
                debug!(generation, "stale partial timer ignored");
                return;
            }
            let Some(pending) = state.pending.take() else {
                return;
            };
            EngineDiagnostics::bump(&self.diagnostics.timeouts_fired);

            let verdict = if state.speaking {
                self.classifier.classify_timeout(&pending.normalized)
            } else {
                None
            };
            match verdict {
                Some((kind, reason)) => Decision::new(kind, reason, pending.text),
                None => {
                    EngineDiagnostics::bump(&self.diagnostics.timeouts_dropped);
                    debug!(
                        partial = %pending.normalized,
                        waited = ?pending.received_at.elapsed(),
                        "partial timed out inconclusive"
                    );
                    return;
                }
            }
        };

        self.emit(&decision);
    }

    /// Deliver a decision. Must be called without the state lock held.
    fn emit(&self, decision: &Decision) {
        self.diagnostics.record_decision(decision.kind());
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, %decision, "decision");

        // No subscribers is the common case.
        let _ = self.decision_tx.send(DecisionEvent {
            seq,
            decision: decision.clone(),
        });
        self.handler.on_decision(decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{DecisionKind, DecisionReason};

    fn recording_engine(config: EngineConfig) -> (DecisionEngine, Arc<Mutex<Vec<Decision>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let engine = DecisionEngine::new(config, move |d: &Decision| sink.lock().push(d.clone()))
            .expect("valid config");
        (engine, seen)
    }

    async fn past_timeout() {
        tokio::time::sleep(Duration::from_millis(DEFAULT_PARTIAL_TIMEOUT_MS + 50)).await;
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = EngineConfig {
            partial_timeout_ms: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BargeInError::InvalidTimeout(0))
        ));
    }

    #[test]
    fn rejects_empty_lists() {
        let config = EngineConfig {
            filler_words: vec!["  ".into(), "...".into()],
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BargeInError::EmptyWordSet {
                kind: WordKind::Filler
            })
        ));

        let config = EngineConfig {
            command_words: Vec::new(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BargeInError::EmptyWordSet {
                kind: WordKind::Command
            })
        ));
    }

    #[test]
    fn rejects_overlapping_lists_after_normalisation() {
        let config = EngineConfig {
            filler_words: vec!["yeah".into(), "No.".into()],
            ..EngineConfig::default()
        };
        match config.validate() {
            Err(BargeInError::OverlappingWords { words }) => assert_eq!(words, vec!["no"]),
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn new_outside_runtime_fails() {
        let result = DecisionEngine::new(EngineConfig::default(), |_: &Decision| {});
        assert!(matches!(result, Err(BargeInError::NoRuntime)));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "partialTimeoutMs": 350, "matchMode": "contains" }"#)
                .expect("parse config");
        assert_eq!(config.partial_timeout_ms, 350);
        assert_eq!(config.match_mode, MatchMode::Contains);
        assert_eq!(config.filler_words, EngineConfig::default().filler_words);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_partials_never_arm() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        assert_eq!(engine.on_stt_partial("sto"), None);
        assert!(!engine.has_pending());
        past_timeout().await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn complete_partial_decides_immediately() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);

        let decision = engine.on_stt_partial("Stop!").expect("immediate decision");
        assert_eq!(decision.kind(), DecisionKind::Interrupt);
        assert_eq!(decision.reason(), DecisionReason::CommandWord);
        assert_eq!(decision.text(), "Stop!");
        assert!(!engine.has_pending());
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_partial_restarts_timer() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);

        engine.on_stt_partial("s");
        tokio::time::sleep(Duration::from_millis(150)).await;
        engine.on_stt_partial("sto");
        tokio::time::sleep(Duration::from_millis(150)).await;
        // 300 ms since the first partial, 150 ms since the second.
        assert!(seen.lock().is_empty());
        assert!(engine.has_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].reason(), DecisionReason::PartialTimeoutCommand);
        assert_eq!(seen[0].text(), "sto");
    }

    #[tokio::test(start_paused = true)]
    async fn going_silent_cancels_pending() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);
        engine.on_stt_partial("sto");
        assert!(engine.has_pending());

        engine.set_speaking(false);
        assert!(!engine.has_pending());
        past_timeout().await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn staying_speaking_keeps_pending() {
        let (engine, _seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);
        engine.on_stt_partial("sto");
        engine.set_speaking(true);
        assert!(engine.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn vad_onset_cancels_pending() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);
        engine.on_stt_partial("ye");
        engine.on_vad_start();
        assert!(!engine.has_pending());
        past_timeout().await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn inconclusive_partial_times_out_silently() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);
        assert_eq!(engine.on_stt_partial("tell me about"), None);
        assert!(engine.has_pending());

        past_timeout().await;
        assert!(seen.lock().is_empty());
        assert!(!engine.has_pending());
        let diag = engine.diagnostics_snapshot();
        assert_eq!(diag.timeouts_fired, 1);
        assert_eq!(diag.timeouts_dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_is_inconclusive() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);
        assert_eq!(engine.on_stt_partial("  ... "), None);
        assert!(!engine.has_pending());
        assert_eq!(engine.on_stt_final(""), None);

        engine.set_speaking(false);
        assert_eq!(engine.on_stt_final(""), None);
        assert_eq!(engine.on_stt_final(" … "), None);
        assert!(seen.lock().is_empty());
        assert_eq!(engine.diagnostics_snapshot().decisions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_is_a_no_op() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);
        engine.on_stt_partial("sto");
        let stale_generation = engine.inner.state.lock().generation;
        engine.on_stt_partial("ye");

        // A fire for the superseded generation must not act on the new partial.
        engine.inner.on_timeout(stale_generation);
        assert!(engine.has_pending());
        assert!(seen.lock().is_empty());
        assert_eq!(engine.diagnostics_snapshot().stale_timer_fires, 1);

        past_timeout().await;
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].reason(), DecisionReason::PartialTimeoutFiller);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_engine_disarms_timer() {
        let (engine, seen) = recording_engine(EngineConfig::default());
        engine.set_speaking(true);
        engine.on_stt_partial("sto");
        drop(engine);
        past_timeout().await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn handler_may_reenter_engine() {
        let engine: Arc<Mutex<Option<Arc<DecisionEngine>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&engine);
        let built = Arc::new(
            DecisionEngine::new(EngineConfig::default(), move |d: &Decision| {
                if d.kind() == DecisionKind::Interrupt {
                    if let Some(engine) = slot.lock().as_ref() {
                        engine.set_speaking(false);
                    }
                }
            })
            .expect("valid config"),
        );
        *engine.lock() = Some(Arc::clone(&built));

        built.set_speaking(true);
        built.on_stt_partial("sto");
        past_timeout().await;
        assert!(!built.is_speaking());

        // Break the handler → engine cycle.
        engine.lock().take();
    }

    #[tokio::test(start_paused = true)]
    async fn broadcast_carries_sequence_numbers() {
        let (engine, _seen) = recording_engine(EngineConfig::default());
        let mut rx = engine.subscribe();
        engine.set_speaking(true);
        engine.on_stt_final("yeah");
        engine.on_stt_final("stop");

        let first = rx.recv().await.expect("first event");
        let second = rx.recv().await.expect("second event");
        assert_eq!((first.seq, second.seq), (1, 2));
        assert_eq!(first.decision.kind(), DecisionKind::Ignore);
        assert_eq!(second.decision.kind(), DecisionKind::Interrupt);
    }
}
