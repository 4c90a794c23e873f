//! Rule names and the table of actions registered against them.
//!
//! Callers name rules however is convenient: `hello`, `:hello`, `"hello"`,
//! `'hello'` or `:"hello"` all mean the same rule. The forms are collapsed once
//! at the [`RuleName`] boundary, so the table itself only ever compares plain
//! case-sensitive strings.

use crate::error::ActionError;
use std::collections::HashMap;
use std::fmt;

/// A callback attached to a rule. Receives the exact text the rule matched.
pub type Action = Box<dyn FnMut(&str) -> Result<(), ActionError>>;

/// Strip one leading `:` and one pair of matching surrounding quotes.
///
/// Nothing else is touched: no case folding, no whitespace trimming. A lone
/// `:` is a name of its own, not the empty name.
pub fn normalize(identifier: &str) -> &str {
    let re = regex!(r#"(?s)^:?(?:"(.*)"|'(.*)'|(.+))$"#);
    re.captures(identifier)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map_or(identifier, |m| m.as_str())
}

/// A normalized, case-sensitive rule name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleName(String);

impl RuleName {
    pub fn new(identifier: &str) -> Self {
        RuleName(normalize(identifier).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for RuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rule name to action, at most one action per name.
#[derive(Default)]
pub struct ActionTable {
    actions: HashMap<RuleName, Action>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `action` under the normalized `identifier`, replacing any previous one.
    pub(crate) fn register(&mut self, identifier: &str, action: Action) {
        let name = RuleName::new(identifier);
        if self.actions.insert(name.clone(), action).is_some() {
            debug_log!("[actions:replace] rule=\"{}\"", name);
        }
    }

    /// Action registered under any form of `identifier`. Never has side effects.
    pub fn lookup(&mut self, identifier: &str) -> Option<&mut Action> {
        self.actions.get_mut(normalize(identifier))
    }

    /// Drop the action for `identifier`. Returns whether one was registered.
    pub fn remove(&mut self, identifier: &str) -> bool {
        self.actions.remove(normalize(identifier)).is_some()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.actions.contains_key(normalize(identifier))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> Vec<&RuleName> {
        let mut names: Vec<&RuleName> = self.actions.keys().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ActionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTable").field("rules", &self.names()).field("actions", &"<functions>").finish()
    }
}

/// Registration-only view of an [`ActionTable`], handed to `Parser::rules`.
pub struct Registrar<'a> {
    table: &'a mut ActionTable,
}

impl<'a> Registrar<'a> {
    pub fn new(table: &'a mut ActionTable) -> Self {
        Registrar { table }
    }

    /// Register an infallible action.
    pub fn on<F>(&mut self, identifier: &str, mut action: F) -> &mut Self
    where
        F: FnMut(&str) + 'static,
    {
        self.table.register(
            identifier,
            Box::new(move |text| {
                action(text);
                Ok(())
            }),
        );
        self
    }

    /// Register an action whose error aborts the match attempt.
    pub fn try_on<F, E>(&mut self, identifier: &str, mut action: F) -> &mut Self
    where
        F: FnMut(&str) -> Result<(), E> + 'static,
        E: Into<ActionError>,
    {
        self.table.register(identifier, Box::new(move |text| action(text).map_err(Into::into)));
        self
    }
}
