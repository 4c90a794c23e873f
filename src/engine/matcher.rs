//! Walking input against a compiled grammar.
//!
//! The walk is a recursive transition network traversal with one token of
//! lookahead. Every decision point (a `choice`, an `optional`, each further
//! iteration of a `star`/`plus`) commits to the first branch whose FIRST set
//! can be lexed at the current position, falling back to a nullable branch.
//! There is no backtracking, which is what lets events be emitted in-line:
//!
//! ```text
//! hello := "(" (hello | DIGITS) ")"          input: "((7))"
//!
//! LPAREN "("
//!   LPAREN "("
//!   DIGITS "7"
//!   RPAREN ")"
//!   hello  "(7)"         <- inner rule ends first (post-order)
//! RPAREN ")"
//! hello  "((7))"
//! ```
//!
//! Events already handed to the [`RuleSink`] stay delivered even if the
//! attempt fails later; a sink error aborts the walk immediately.
//!
//! ## Debugging
//!
//! Setting `RULEHOOK_DEBUG=1` prints every failed expectation and the final
//! verdict to stderr.

use super::grammar::{CompiledGrammar, Node, NodeKind, RuleId, TermId};
use super::lexer::Lexer;
use super::metrics::{RunMetrics, RunResult};
use crate::Options;
use crate::error::DispatchError;
use std::time::Instant;

bitflags::bitflags! {
    /// Which match events the engine reports to its [`RuleSink`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EmitMask: u8 {
        /// A rule ran to completion.
        const RULES     = 1 << 0;
        /// A terminal was consumed.
        const TERMINALS = 1 << 1;
    }
}

impl Default for EmitMask {
    fn default() -> Self {
        EmitMask::all()
    }
}

/// Receiver of match events, called synchronously while the engine walks.
///
/// `rule` is a rule or terminal name as written in the grammar; `text` is the
/// exact slice of the input it covered. Returning an error stops the walk and
/// the error becomes the result of the run.
pub trait RuleSink {
    fn on_match(&mut self, rule: &str, text: &str) -> Result<(), DispatchError>;
}

impl<F> RuleSink for F
where
    F: FnMut(&str, &str) -> Result<(), DispatchError>,
{
    fn on_match(&mut self, rule: &str, text: &str) -> Result<(), DispatchError> {
        self(rule, text)
    }
}

impl CompiledGrammar {
    /// Match `input` against this grammar, reporting events to `sink`.
    pub fn run(&self, input: &str, sink: &mut dyn RuleSink, options: &Options) -> Result<bool, DispatchError> {
        Ok(self.run_with_metrics(input, sink, options)?.matched)
    }

    /// Like [`run`](Self::run), but also returns counters and timing.
    pub fn run_with_metrics(
        &self,
        input: &str,
        sink: &mut dyn RuleSink,
        options: &Options,
    ) -> Result<RunResult, DispatchError> {
        let started = Instant::now();
        let mut walk = Walk {
            grammar: self,
            lexer: Lexer::new(self, input),
            sink,
            max_depth: options.max_depth,
            emit: options.emit,
            pos: 0,
            depth: 0,
            metrics: RunMetrics::default(),
        };

        let mut matched = walk.rule(self.start)?;
        if matched {
            let rest = walk.lexer.skip_ignored(walk.pos);
            let len = walk.lexer.input_len();
            if rest != len {
                debug_log!("[match:trailing_input] at={} remaining={}", rest, len - rest);
                matched = false;
            }
        }

        walk.metrics.total = started.elapsed();
        debug_log!(
            "[match:verdict] matched={} tokens={} rules={} deepest={}",
            matched,
            walk.metrics.tokens,
            walk.metrics.rules_completed,
            walk.metrics.deepest
        );
        Ok(RunResult { matched, metrics: walk.metrics })
    }
}

struct Walk<'g, 'i, 's> {
    grammar: &'g CompiledGrammar,
    lexer: Lexer<'g, 'i>,
    sink: &'s mut dyn RuleSink,
    max_depth: usize,
    emit: EmitMask,
    /// End of the last consumed token (ignorable text after it not included).
    pos: usize,
    depth: usize,
    metrics: RunMetrics,
}

impl<'g> Walk<'g, '_, '_> {
    fn node(&mut self, node: &'g Node) -> Result<bool, DispatchError> {
        match &node.kind {
            NodeKind::Term(t) => self.terminal(*t),
            NodeKind::Rule(r) => self.rule(*r),
            NodeKind::Seq(items) => {
                for item in items {
                    if !self.node(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            NodeKind::Choice(alts) => match self.choose(alts) {
                Some(alt) => self.node(alt),
                None => {
                    debug_log!("[match:no_alternative] at={} candidates={}", self.pos, alts.len());
                    Ok(false)
                }
            },
            NodeKind::Optional(inner) => {
                if self.lexer.predicts(&inner.first, self.pos) {
                    self.node(inner)
                } else {
                    Ok(true)
                }
            }
            NodeKind::Star(inner) => self.repeat(inner),
            NodeKind::Plus(inner) => {
                if !self.node(inner)? {
                    return Ok(false);
                }
                self.repeat(inner)
            }
        }
    }

    /// First alternative whose FIRST set lexes here, else the first nullable one.
    fn choose(&self, alts: &'g [Node]) -> Option<&'g Node> {
        alts.iter().find(|alt| self.lexer.predicts(&alt.first, self.pos)).or_else(|| alts.iter().find(|alt| alt.nullable))
    }

    fn repeat(&mut self, inner: &'g Node) -> Result<bool, DispatchError> {
        loop {
            if !self.lexer.predicts(&inner.first, self.pos) {
                return Ok(true);
            }
            let before = self.pos;
            if !self.node(inner)? {
                return Ok(false);
            }
            if self.pos == before {
                return Ok(true);
            }
        }
    }

    fn terminal(&mut self, term: TermId) -> Result<bool, DispatchError> {
        let Some(span) = self.lexer.token(term, self.pos) else {
            debug_log!("[match:expected] terminal=\"{}\" at={}", self.lexer.terminal_name(term), self.pos);
            return Ok(false);
        };

        self.pos = span.end;
        self.metrics.tokens += 1;
        if self.emit.contains(EmitMask::TERMINALS) {
            self.sink.on_match(self.lexer.terminal_name(term), self.lexer.text(span.start, span.end))?;
        }
        Ok(true)
    }

    fn rule(&mut self, id: RuleId) -> Result<bool, DispatchError> {
        let grammar = self.grammar;
        let rule = &grammar.rules[id];
        if self.depth >= self.max_depth {
            debug_log!("[match:depth_limit] rule=\"{}\" depth={} at={}", rule.name, self.depth, self.pos);
            self.metrics.depth_limit_hit = true;
            return Ok(false);
        }

        let start = self.lexer.skip_ignored(self.pos);
        self.depth += 1;
        self.metrics.deepest = self.metrics.deepest.max(self.depth);
        let matched = self.node(&rule.body);
        self.depth -= 1;
        if !matched? {
            return Ok(false);
        }

        // A rule that consumed nothing covers the empty slice where it ended.
        let start = start.min(self.pos);
        self.metrics.rules_completed += 1;
        if self.emit.contains(EmitMask::RULES) {
            self.sink.on_match(&rule.name, self.lexer.text(start, self.pos))?;
        }
        Ok(true)
    }
}
