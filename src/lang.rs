//! Language building blocks.
//!
//! These are the traits a syntax author implements and the values the
//! resolver hands them:
//!
//! - `element.rs`: [`SyntaxElement`] (initialization from a match) and the
//!   three statement-level kinds [`Effect`], [`CodeSection`] and [`Event`].
//! - `expression.rs`: [`Expression`] with its `Singular`/`Plural` adapters,
//!   literals, lists, conversions and variables.
//! - `context.rs`: [`TriggerContext`], the state owned by one firing.
//! - `state.rs`: [`ParserState`], what the resolver knows about the sections
//!   enclosing the element being built.

#[path = "lang/context.rs"]
mod context;
#[path = "lang/element.rs"]
mod element;
#[path = "lang/expression.rs"]
mod expression;
#[path = "lang/state.rs"]
mod state;

#[allow(unused_imports)]
pub use context::{LoopFrame, SwitchFrame, TriggerContext};
#[allow(unused_imports)]
pub use element::{CodeSection, Effect, Event, InitContext, InlineCondition, SyntaxElement};
#[allow(unused_imports)]
pub use expression::{
    BraceVariables, ConvertedExpression, Expression, ExpressionList, Literal, Plural, PluralExpression, Singular,
    SingularExpression, Variable, VariableResolver,
};
pub(crate) use expression::join_list;
#[allow(unused_imports)]
pub use state::{ChainId, ParserState, SyntaxRestriction};
