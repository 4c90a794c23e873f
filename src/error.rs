//! Error types.
//!
//! Errors are split by *when* they can happen:
//!
//! - [`Error`]: construction time. A grammar reference that does not resolve, or
//!   an artifact that cannot be loaded. These never surface from `parse`.
//! - [`DispatchError`]: parse time. A failing action or a failing trace sink.
//!   A non-matching input is not an error at all; it is `Ok(false)`.
//!
//! [`LoadError`] details why an existing artifact was rejected.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by fallible actions.
///
/// Whatever the action returns is carried to the `parse` caller untouched
/// inside [`DispatchError::Action`], so callers can downcast it back.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Construction-time failures.
#[derive(Error, Debug)]
pub enum Error {
    /// No artifact exists at the reference (with or without the extension).
    #[error("No such file or directory: {reference}")]
    NotFound { reference: String },

    /// The artifact exists but is not a usable compiled grammar.
    #[error("failed to load grammar {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
}

/// Reasons a compiled grammar artifact is rejected by the loader.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read artifact: {0}")]
    Io(#[from] io::Error),

    #[error("artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized artifact format '{0}'")]
    Format(String),

    #[error("unsupported artifact version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("start rule '{0}' is not defined")]
    MissingStart(String),

    #[error("rule '{rule}' references undefined rule '{target}'")]
    UnknownRule { rule: String, target: String },

    #[error("rule '{rule}' references undefined terminal '{terminal}'")]
    UnknownTerminal { rule: String, terminal: String },

    #[error("terminal '{terminal}' has an invalid pattern: {source}")]
    BadPattern {
        terminal: String,
        #[source]
        source: regex::Error,
    },

    #[error("terminal '{0}' can match the empty string")]
    EmptyMatch(String),

    #[error("ignore pattern #{index} is invalid: {source}")]
    BadIgnore {
        index: usize,
        #[source]
        source: regex::Error,
    },

    #[error("ignore pattern #{0} can match the empty string")]
    EmptyIgnore(usize),

    #[error("rule '{0}' is left-recursive")]
    LeftRecursion(String),
}

/// Parse-time failures. Both abort the match attempt immediately.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// An action returned an error; it is carried here as-is.
    #[error(transparent)]
    Action(ActionError),

    /// Writing to the trace sink failed.
    #[error("trace sink write failed: {0}")]
    Trace(#[source] io::Error),
}

impl DispatchError {
    /// The action's own error, if this failure came from an action.
    pub fn action_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DispatchError::Action(err) => Some(err.as_ref()),
            DispatchError::Trace(_) => None,
        }
    }

    /// Consume this error and return the action's original error, if any.
    pub fn into_action_error(self) -> Result<ActionError, DispatchError> {
        match self {
            DispatchError::Action(err) => Ok(err),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Boom(u32);

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom {}", self.0)
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn action_errors_round_trip_untouched() {
        let err = DispatchError::Action(Box::new(Boom(7)));
        assert_eq!(err.to_string(), "boom 7");
        assert_eq!(err.action_error().and_then(|e| e.downcast_ref::<Boom>()), Some(&Boom(7)));

        let inner = err.into_action_error().unwrap();
        assert_eq!(*inner.downcast::<Boom>().unwrap(), Boom(7));
    }

    #[test]
    fn not_found_names_the_original_reference() {
        let err = Error::NotFound { reference: "spec/hello".to_string() };
        assert_eq!(err.to_string(), "No such file or directory: spec/hello");
    }
}
