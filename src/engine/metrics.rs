//! Engine run metrics.
//!
//! The intended usage is:
//!
//! - `CompiledGrammar::run` for normal operation (verdict only).
//! - `CompiledGrammar::run_with_metrics` for profiling and for inspecting why
//!   an attempt stopped where it did.
//!
//! Collecting these counters costs a few integer increments per token, so the
//! plain `run` path simply drops them.

use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunMetrics {
    /// Total elapsed time for the match attempt, including time spent in
    /// callbacks.
    pub total: Duration,
    /// Terminals consumed.
    pub tokens: usize,
    /// Rules that ran to completion.
    pub rules_completed: usize,
    /// Deepest rule nesting reached.
    pub deepest: usize,
    /// Whether the attempt was cut short by `Options::max_depth`.
    pub depth_limit_hit: bool,
}

/// Verdict bundled with timing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Whether the whole input matched the start rule.
    pub matched: bool,
    pub metrics: RunMetrics,
}
