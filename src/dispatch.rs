//! Rule-hit dispatch: actions, tracing, and the dispatcher tying them together.
//!
//! ```text
//! engine ── on_match(rule, text) ──▶ Dispatcher::on_rule_match
//!                                      1. ActionTable lookup      (actions.rs)
//!                                      2. TraceState::record      (trace.rs)
//!                                      3. run action, if any
//! ```
//!
//! Nothing here knows how the engine matches; the dispatcher is just a
//! `RuleSink`.

#[path = "dispatch/actions.rs"]
mod actions;
#[path = "dispatch/dispatcher.rs"]
mod dispatcher;
#[path = "dispatch/trace.rs"]
mod trace;

pub use actions::{Action, ActionTable, Registrar, RuleName, normalize};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use trace::{Capture, TraceSink, TraceState};
