use crate::dispatch::{ActionTable, DispatchStats, Dispatcher, Registrar, TraceSink, TraceState};
use crate::engine::{CompiledGrammar, EmitMask, RunMetrics};
use crate::error::{ActionError, DispatchError, Error};
use crate::resolve::{self, DEFAULT_EXTENSION};
use std::sync::Arc;

/// Options that affect loading and matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Artifact extension tried when a reference has none (without the dot).
    pub extension: String,
    /// Maximum rule nesting before an attempt is abandoned as a no-match.
    pub max_depth: usize,
    /// Which match events reach the dispatcher.
    pub emit: EmitMask,
    /// Whether tracing starts enabled.
    pub trace: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { extension: DEFAULT_EXTENSION.to_string(), max_depth: 500, emit: EmitMask::default(), trace: false }
    }
}

/// Outcome of [`Parser::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether the whole input matched.
    pub matched: bool,
    /// Events dispatched during this run, and how many ran an action.
    pub dispatch: DispatchStats,
    pub metrics: RunMetrics,
}

/// A loaded grammar plus the actions and trace settings attached to it.
///
/// # Example
/// ```
/// use rulehook::Parser;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let mut parser = Parser::new("testdata/hello")?;
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let sink = Rc::clone(&seen);
/// parser.on("hello", move |text| sink.borrow_mut().push(text.to_string()));
///
/// assert!(parser.parse("(5)")?);
/// assert_eq!(seen.borrow().last().map(String::as_str), Some("(5)"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Parser {
    grammar: Arc<CompiledGrammar>,
    options: Options,
    dispatcher: Dispatcher,
}

impl Parser {
    /// Resolve `reference` and load the grammar artifact it names.
    pub fn new(reference: &str) -> Result<Self, Error> {
        Self::with_options(reference, Options::default())
    }

    pub fn with_options(reference: &str, options: Options) -> Result<Self, Error> {
        let path = resolve::resolve(reference, &options.extension)?;
        let grammar =
            CompiledGrammar::load(path.as_path()).map_err(|source| Error::Load { path: path.into_path_buf(), source })?;
        Ok(Self::from_compiled(Arc::new(grammar), options))
    }

    /// Build a parser over an already loaded grammar, e.g. one shared between threads.
    pub fn from_compiled(grammar: Arc<CompiledGrammar>, options: Options) -> Self {
        let mut trace = TraceState::new(TraceSink::Stdout);
        trace.set_enabled(options.trace);
        Parser { grammar, options, dispatcher: Dispatcher::new(ActionTable::new(), trace) }
    }

    pub fn grammar(&self) -> &Arc<CompiledGrammar> {
        &self.grammar
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // --- Actions -------------------------------------------------------------

    /// Run `action` with the matched text whenever `identifier` matches.
    ///
    /// Registering again under any equivalent form of the name replaces the
    /// previous action.
    pub fn on<F>(&mut self, identifier: &str, action: F) -> &mut Self
    where
        F: FnMut(&str) + 'static,
    {
        Registrar::new(&mut self.dispatcher.actions).on(identifier, action);
        self
    }

    /// Like [`on`](Self::on), but an `Err` stops the match and is returned
    /// from `parse`.
    pub fn try_on<F, E>(&mut self, identifier: &str, action: F) -> &mut Self
    where
        F: FnMut(&str) -> Result<(), E> + 'static,
        E: Into<ActionError>,
    {
        Registrar::new(&mut self.dispatcher.actions).try_on(identifier, action);
        self
    }

    /// Register several actions at once.
    ///
    /// ```
    /// # let mut parser = rulehook::Parser::new("testdata/create_table")?;
    /// parser.rules(|r| {
    ///     r.on("table_name", |name| println!("table {name}"));
    ///     r.on("column_name", |name| println!("column {name}"));
    /// });
    /// # Ok::<(), rulehook::Error>(())
    /// ```
    pub fn rules<F>(&mut self, declare: F) -> &mut Self
    where
        F: FnOnce(&mut Registrar<'_>),
    {
        declare(&mut Registrar::new(&mut self.dispatcher.actions));
        self
    }

    /// Forget the action for `identifier`. Returns whether there was one.
    pub fn remove_action(&mut self, identifier: &str) -> bool {
        self.dispatcher.actions.remove(identifier)
    }

    pub fn actions(&self) -> &ActionTable {
        &self.dispatcher.actions
    }

    // --- Matching ------------------------------------------------------------

    /// Match `input`, running actions as rules complete.
    ///
    /// `Ok(false)` means the input did not match; actions for rules that
    /// completed before the mismatch have already run.
    pub fn matches(&mut self, input: &str) -> Result<bool, DispatchError> {
        Ok(self.run(input)?.matched)
    }

    /// Same as [`matches`](Self::matches).
    pub fn parse(&mut self, input: &str) -> Result<bool, DispatchError> {
        self.matches(input)
    }

    /// Match `input` and report counters alongside the verdict.
    pub fn run(&mut self, input: &str) -> Result<RunSummary, DispatchError> {
        self.dispatcher.take_stats();
        let result = self.grammar.run_with_metrics(input, &mut self.dispatcher, &self.options);
        let dispatch = self.dispatcher.take_stats();
        let result = result?;

        Ok(RunSummary { matched: result.matched, dispatch, metrics: result.metrics })
    }

    /// Dispatch a single event by hand, exactly as the engine would.
    pub fn dispatch(&mut self, rule: &str, text: &str) -> Result<(), DispatchError> {
        self.dispatcher.on_rule_match(rule, text)
    }

    // --- Tracing -------------------------------------------------------------

    pub fn set_tracing(&mut self, enabled: bool) -> &mut Self {
        self.dispatcher.trace.set_enabled(enabled);
        self
    }

    pub fn is_tracing(&self) -> bool {
        self.dispatcher.trace.is_enabled()
    }

    /// Redirect trace output, returning the previous sink.
    pub fn set_trace_sink(&mut self, sink: TraceSink) -> TraceSink {
        self.dispatcher.trace.set_sink(sink)
    }

    pub fn trace_sink(&self) -> &TraceSink {
        self.dispatcher.trace.sink()
    }
}
