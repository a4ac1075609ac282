//! Error types.
//!
//! Errors fall in three families, matching the three phases a script goes
//! through:
//!
//! ```text
//! registration ── PatternError   (malformed pattern, fatal to that registration)
//! resolution   ── ParseError     (no match / semantic error, reported per line)
//! execution    ── RuntimeError   (walk failures, wraps ExecutorError/TriggerError)
//! ```
//!
//! Candidate-level failures during resolution (a descriptor whose `init`
//! rejects its captures, a failed type check) never surface as errors of their
//! own: the resolver moves on to the next candidate and only reports once the
//! whole candidate set is exhausted.

use thiserror::Error;

/// A pattern string could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("unclosed '{open}' opened at {position}")]
    Unclosed { open: char, position: usize },

    #[error("unbalanced '{close}' at {position}")]
    Unbalanced { close: char, position: usize },

    #[error("malformed expression slot '%{content}%' at {position}")]
    MalformedSlot { content: String, position: usize },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("invalid regex '{source_text}': {message}")]
    InvalidRegex { source_text: String, message: String },

    #[error("dangling escape at end of pattern")]
    TrailingEscape,
}

/// Resolution of a text fragment failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No candidate accepted the text.
    #[error("No {category} matching '{text}' was found")]
    NoMatch { category: &'static str, text: String },

    /// A candidate matched but the result was unusable (type, arity, policy).
    #[error("{message}")]
    Semantic { message: String },

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

impl ParseError {
    pub(crate) fn no_match(category: &'static str, text: &str) -> Self {
        ParseError::NoMatch { category, text: text.to_string() }
    }

    pub(crate) fn semantic(message: impl Into<String>) -> Self {
        ParseError::Semantic { message: message.into() }
    }
}

/// Returned by `SyntaxElement::init` when an element refuses its captures.
///
/// A message is reported as a semantic diagnostic; a silent rejection simply
/// lets the resolver try the next candidate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{}", message.as_deref().unwrap_or("initialization rejected"))]
pub struct InitError {
    pub message: Option<String>,
}

impl InitError {
    pub fn silent() -> Self {
        Self { message: None }
    }

    pub fn new(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()) }
    }
}

/// A trigger's item array was used out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("trigger items have already been set")]
    AlreadyLoaded,

    #[error("trigger items have not been loaded yet")]
    NotLoaded,
}

/// Executor precondition violations. These never occur under correct driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("executor has already been started")]
    AlreadyStarted,

    #[error("executor has not been started")]
    NotStarted,

    #[error("executor has already finished")]
    AlreadyFinished,

    #[error("interrupt is only allowed while an item is being walked")]
    NotWalking,

    #[error("exit has already been requested")]
    ExitTwice,

    #[error("cursor {index} is outside of 0..={len}")]
    OutOfBounds { index: isize, len: usize },
}

/// Failure while walking an item.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// An adapter was used against its arity (single read of a plural expression).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("'{0}' cannot be changed")]
    NotChangeable(String),

    /// Errors raised by syntax elements themselves.
    #[error("{0}")]
    Script(String),
}
