//! Triggers and their flattened item array.
//!
//! A trigger's body is stored as one flat array of items. A section occupies
//! a contiguous range bracketed by its scope markers:
//!
//! ```text
//! index  item
//! 0      Statement  print "start"
//! 1      ScopeStart #0 (while ...)     ─┐ span #0 = 1..=4
//! 2      Statement  print "tick"        │
//! 3      Statement  wait 1 tick         │
//! 4      ScopeEnd   #0                 ─┘
//! 5      Statement  print "done"
//! ```
//!
//! The section objects themselves live in the trigger's scope arena and are
//! addressed by [`ScopeId`]; the markers only carry the id.

use once_cell::sync::OnceCell;

use crate::error::{RuntimeError, TriggerError};
use crate::lang::{CodeSection, Effect, Event, TriggerContext};
use crate::script::SourceLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

/// Indices of a scope's start and end markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeSpan {
    pub id: ScopeId,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
pub enum TriggerItem {
    Statement(Box<dyn Effect>),
    ScopeStart(ScopeId),
    ScopeEnd(ScopeId),
}

#[derive(Debug)]
pub struct Scope {
    pub section: Box<dyn CodeSection>,
    pub span: ScopeSpan,
}

#[derive(Debug, Default)]
pub struct TriggerBody {
    pub items: Vec<TriggerItem>,
    pub scopes: Vec<Scope>,
}

impl TriggerBody {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }
}

/// A resolved event header with its body. The body is set exactly once and
/// is read-only afterwards, so a trigger can be shared between firings.
#[derive(Debug)]
pub struct Trigger {
    name: &'static str,
    event: Box<dyn Event>,
    line: SourceLine,
    body: OnceCell<TriggerBody>,
}

impl Trigger {
    pub fn new(name: &'static str, event: Box<dyn Event>, line: SourceLine) -> Self {
        Self { name, event, line, body: OnceCell::new() }
    }

    /// Descriptor name of the event.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn event(&self) -> &dyn Event {
        self.event.as_ref()
    }

    pub fn line(&self) -> &SourceLine {
        &self.line
    }

    pub fn set_items(&self, body: TriggerBody) -> Result<(), TriggerError> {
        self.body.set(body).map_err(|_| TriggerError::AlreadyLoaded)
    }

    pub fn body(&self) -> Result<&TriggerBody, TriggerError> {
        self.body.get().ok_or(TriggerError::NotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.body.get().is_some()
    }

    /// Whether a firing described by `ctx` concerns this trigger.
    pub fn matches(&self, ctx: &TriggerContext) -> Result<bool, RuntimeError> {
        self.event.check(ctx)
    }
}
