//! # bargein-core
//!
//! Decides what to do with user speech that arrives while a voice agent is
//! talking.
//!
//! ## Architecture
//!
//! ```text
//! Agent controller ── set_speaking ──┐
//! VAD ─────────────── on_vad_start ──┤
//! STT ─── on_stt_partial / final ────┼─► DecisionEngine ─► DecisionHandler
//!                                    │        │                (IGNORE / INTERRUPT / PASS)
//!                         partial timer (tokio task)
//!                                             └─► broadcast::Sender<DecisionEvent>
//! ```
//!
//! Finals are always decided immediately. Partials are decided immediately
//! only when they are a complete filler or command; anything ambiguous waits
//! for the final transcript or the partial timeout.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod decision;
pub mod engine;
pub mod error;
pub mod lexicon;

// Convenience re-exports for downstream crates
pub use decision::{Decision, DecisionEvent, DecisionHandler, DecisionKind, DecisionReason};
pub use engine::{DecisionEngine, DiagnosticsSnapshot, EngineConfig};
pub use error::BargeInError;
pub use lexicon::{normalize, MatchMode, WordKind, WordSet};
