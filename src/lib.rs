//! Match input against a compiled grammar and call back into named-rule actions.
//!
//! ```text
//! reference ── resolve ──▶ artifact ── CompiledGrammar::load ──▶ Parser
//!                                                                  │
//! input ── Parser::parse ── engine walk ── on_match(rule, text) ──▶ Dispatcher
//!                                                                  ├─ trace
//!                                                                  └─ action
//! ```
//!
//! See [`Parser`] for the entry point.

#[macro_use]
mod macros;
mod api;
mod dispatch;
mod engine;
mod error;
mod resolve;

pub use api::{Options, Parser, RunSummary};
pub use dispatch::{
    Action, ActionTable, Capture, DispatchStats, Dispatcher, Registrar, RuleName, TraceSink, TraceState, normalize,
};
pub use engine::{ARTIFACT_FORMAT, ARTIFACT_VERSION, CompiledGrammar, EmitMask, RuleSink, RunMetrics, RunResult};
pub use error::{ActionError, DispatchError, Error, LoadError};
pub use resolve::{ArtifactPath, DEFAULT_EXTENSION, resolve};

/// Whether `RULEHOOK_DEBUG` diagnostics are switched on.
#[doc(hidden)]
pub fn debug_enabled() -> bool {
    std::env::var_os("RULEHOOK_DEBUG").is_some()
}
