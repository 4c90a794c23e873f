use super::actions::ActionTable;
use super::trace::TraceState;
use crate::engine::RuleSink;
use crate::error::DispatchError;

/// Counters for one dispatch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Match events received from the engine.
    pub events: usize,
    /// Events that found an action and ran it.
    pub yielded: usize,
}

/// Routes match events through the trace into the action table.
#[derive(Debug, Default)]
pub struct Dispatcher {
    pub(crate) actions: ActionTable,
    pub(crate) trace: TraceState,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(actions: ActionTable, trace: TraceState) -> Self {
        Dispatcher { actions, trace, stats: DispatchStats::default() }
    }

    /// Handle one match event.
    ///
    /// `rule` is traced exactly as emitted; only the action lookup normalizes
    /// it. The trace block is written before the action runs, so a failing
    /// action still leaves its event in the trace.
    pub fn on_rule_match(&mut self, rule: &str, text: &str) -> Result<(), DispatchError> {
        self.stats.events += 1;
        let action = self.actions.lookup(rule);
        self.trace.record(rule, text, action.is_some())?;

        let Some(action) = action else {
            return Ok(());
        };
        self.stats.yielded += 1;
        action(text).map_err(DispatchError::Action)
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionTable {
        &mut self.actions
    }

    pub fn trace_mut(&mut self) -> &mut TraceState {
        &mut self.trace
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Return the counters so far and start from zero.
    pub fn take_stats(&mut self) -> DispatchStats {
        std::mem::take(&mut self.stats)
    }
}

impl RuleSink for Dispatcher {
    fn on_match(&mut self, rule: &str, text: &str) -> Result<(), DispatchError> {
        self.on_rule_match(rule, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Capture, Registrar, TraceSink};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn traced() -> (Dispatcher, Capture) {
        let capture = Capture::new();
        let mut trace = TraceState::new(TraceSink::Capture(capture.clone()));
        trace.set_enabled(true);
        (Dispatcher::new(ActionTable::new(), trace), capture)
    }

    #[test]
    fn unregistered_rules_are_traced_but_not_yielded() {
        let (mut dispatcher, capture) = traced();

        dispatcher.on_rule_match("foo", "something").unwrap();
        assert_eq!(capture.contents(), "rule: 'foo'\n  string: 'something'\n");
        assert_eq!(dispatcher.stats(), DispatchStats { events: 1, yielded: 0 });
    }

    #[test]
    fn registered_rules_yield_with_the_text() {
        let (mut dispatcher, capture) = traced();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        Registrar::new(&mut dispatcher.actions).on(":foo", move |text| sink.borrow_mut().push(text.to_string()));

        dispatcher.on_rule_match("foo", "bar").unwrap();
        assert!(capture.contents().contains("rule: 'foo'\n  string: 'bar'\n  YIELDING TO RULE\n"));
        assert_eq!(*seen.borrow(), vec!["bar"]);
        assert_eq!(dispatcher.take_stats(), DispatchStats { events: 1, yielded: 1 });
        assert_eq!(dispatcher.stats(), DispatchStats::default());
    }

    #[test]
    fn trace_is_written_before_a_failing_action() {
        let (mut dispatcher, capture) = traced();
        Registrar::new(&mut dispatcher.actions).try_on("foo", |_| Err::<(), _>("refused"));

        let err = dispatcher.on_rule_match("foo", "bar").unwrap_err();
        assert_eq!(err.to_string(), "refused");
        assert!(capture.contents().ends_with("YIELDING TO RULE\n"));
    }

    #[test]
    fn dispatches_as_an_engine_sink() {
        let (mut dispatcher, capture) = traced();
        let sink: &mut dyn RuleSink = &mut dispatcher;

        sink.on_match("bar", "x").unwrap();
        assert_eq!(capture.contents(), "rule: 'bar'\n  string: 'x'\n");
    }

    #[test]
    fn traces_emitted_names_verbatim_but_looks_actions_up_normalized() {
        let (mut dispatcher, capture) = traced();
        Registrar::new(dispatcher.actions_mut()).on("q", |_| {});

        dispatcher.on_rule_match("'q'", "a").unwrap();
        assert_eq!(capture.contents(), "rule: ''q''\n  string: 'a'\n  YIELDING TO RULE\n");
        assert_eq!(dispatcher.stats().yielded, 1);
    }
}
