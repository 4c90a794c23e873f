//! Grammar matching engine.
//!
//! The engine is the part of the crate that knows nothing about actions or
//! tracing. It loads a compiled grammar artifact, walks input against it, and
//! reports `(name, matched text)` events to whatever [`RuleSink`] the caller
//! hands in. Everything above it (`dispatch`, `api`) only sees that boundary.
//!
//! ## How the parts work together
//!
//! ```text
//! artifact (.gzc) ── CompiledGrammar::load ──┐  (grammar.rs)
//!                      - validate names      │
//!                      - anchor patterns     │
//!                      - nullable / FIRST    │
//!                                            v
//! input ─────────────────────────── CompiledGrammar::run  (matcher.rs)
//!                                      │   - one-token lookahead via Lexer
//!                                      │     (lexer.rs)
//!                                      │   - post-order rule-end events
//!                                      v
//!                              RuleSink::on_match(name, text)
//!                                      │
//!                                      v
//!                              verdict (+ RunMetrics, metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `grammar.rs`: artifact schema, validation, and lookahead tables.
//! - `lexer.rs`: on-demand terminal recognition and ignorable text.
//! - `matcher.rs`: the walk itself, [`EmitMask`] and the [`RuleSink`] trait.
//! - `metrics.rs`: optional counters and timing for runs.
//!
//! ## Debugging
//!
//! Set `RULEHOOK_DEBUG=1` to print load, expectation and verdict traces.

#[path = "engine/grammar.rs"]
mod grammar;
#[path = "engine/lexer.rs"]
mod lexer;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;

pub use grammar::{ARTIFACT_FORMAT, ARTIFACT_VERSION, CompiledGrammar};
pub use matcher::{EmitMask, RuleSink};
pub use metrics::{RunMetrics, RunResult};
