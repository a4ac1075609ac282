//! Syntax elements and their initialization context.

use std::fmt;

use super::context::TriggerContext;
use super::expression::Expression;
use super::state::{ParserState, SyntaxRestriction};
use crate::engine::PatternMatch;
use crate::error::{InitError, RuntimeError};
use crate::runtime::{ExecutorState, ScopeSpan};
use crate::types::TypeRegistry;

/// Anything a descriptor factory produces.
pub trait SyntaxElement: Send + Sync {
    /// Receive the captures of the matched pattern. An error rejects the match
    /// and lets the resolver try the next pattern or descriptor.
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError>;

    fn describe(&self, debug: bool) -> String;
}

/// What `init` gets to see of a successful match.
pub struct InitContext<'a> {
    captures: Vec<Option<Box<dyn Expression>>>,
    matched_pattern: usize,
    mark: i32,
    regex_matches: Vec<String>,
    state: &'a mut ParserState,
    types: &'a TypeRegistry,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(
        found: PatternMatch,
        matched_pattern: usize,
        state: &'a mut ParserState,
        types: &'a TypeRegistry,
    ) -> Self {
        let slots = found.captures.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
        let mut captures: Vec<Option<Box<dyn Expression>>> = (0..slots).map(|_| None).collect();
        for (index, expression) in found.captures {
            captures[index] = Some(expression);
        }
        Self { captures, matched_pattern, mark: found.mark, regex_matches: found.regex_matches, state, types }
    }

    /// Take the expression captured by slot `slot`.
    pub fn take(&mut self, slot: usize) -> Result<Box<dyn Expression>, InitError> {
        self.take_optional(slot).ok_or_else(InitError::silent)
    }

    /// Take the expression of a slot that sits inside an optional group.
    pub fn take_optional(&mut self, slot: usize) -> Option<Box<dyn Expression>> {
        self.captures.get_mut(slot).and_then(Option::take)
    }

    /// Index of the pattern alternative that matched.
    pub fn matched_pattern(&self) -> usize {
        self.matched_pattern
    }

    pub fn mark(&self) -> i32 {
        self.mark
    }

    pub fn regex_matches(&self) -> &[String] {
        &self.regex_matches
    }

    pub fn state(&self) -> &ParserState {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut ParserState {
        &mut *self.state
    }

    pub fn types(&self) -> &TypeRegistry {
        self.types
    }
}

/// A statement.
pub trait Effect: SyntaxElement {
    fn execute(&self, ctx: &mut TriggerContext, state: &mut ExecutorState) -> Result<(), RuntimeError>;
}

/// A section: a header line with an indented body.
///
/// In the flattened item array the body sits between the section's scope
/// start and scope end; walking those markers calls `enter` and `leave`, both
/// with the scope's span so the section can direct the cursor.
pub trait CodeSection: SyntaxElement {
    fn enter(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError>;

    fn leave(
        &self,
        _ctx: &mut TriggerContext,
        _state: &mut ExecutorState,
        _span: ScopeSpan,
    ) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Restriction applied to the section's body.
    fn allowed_syntaxes(&self) -> Option<SyntaxRestriction> {
        None
    }
}

/// A trigger header such as `on load`.
pub trait Event: SyntaxElement {
    /// Whether a firing described by `ctx` should run the trigger.
    fn check(&self, ctx: &TriggerContext) -> Result<bool, RuntimeError>;
}

impl fmt::Debug for dyn Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Effect({})", self.describe(true))
    }
}

impl fmt::Debug for dyn CodeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeSection({})", self.describe(true))
    }
}

impl fmt::Debug for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.describe(true))
    }
}

/// `continue if <condition>`: stops the trigger when the condition is false.
#[derive(Debug)]
pub struct InlineCondition {
    condition: Box<dyn Expression>,
}

impl InlineCondition {
    pub fn new(condition: Box<dyn Expression>) -> Self {
        Self { condition }
    }
}

impl SyntaxElement for InlineCondition {
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("continue if {}", self.condition.describe(debug))
    }
}

impl Effect for InlineCondition {
    fn execute(&self, ctx: &mut TriggerContext, state: &mut ExecutorState) -> Result<(), RuntimeError> {
        if !self.condition.check(ctx)? {
            state.exit()?;
        }
        Ok(())
    }
}
