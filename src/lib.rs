//! A natural-language scripting front end and runtime.
//!
//! Syntax is declared as patterns (`print %objects%`, `if %boolean%`,
//! `[on] command %*string%`) registered in a [`SyntaxRegistry`]. Script text
//! is resolved against it into typed elements, and each event section becomes
//! a [`Trigger`] whose body is a flat item array walked by a
//! [`TriggerExecutor`].
//!
//! ```text
//! FileSection tree ── SyntaxParser ──▶ Trigger ── TriggerExecutor ──▶ output
//!                      (engine)          (runtime)     │ suspended
//!                                                      └─▶ TickScheduler
//! ```

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod lang;
mod runtime;
mod script;
mod syntaxes;
mod types;
mod value;

pub use api::{LoadResult, ParserOptions, fire, load, load_script};
pub use engine::{
    Acceptance, Category, ChoiceAlternative, ConditionalPolicy, Diagnostic, Diagnostics, ErrorKind, ExpressionInfo,
    ExpressionSlot, Factory, MatchContext, PatternMatch, PatternNode, RecentList, RecentLists, RegexPattern,
    SyntaxInfo, SyntaxParser, SyntaxRegistry, compile,
};
pub use error::{ExecutorError, InitError, ParseError, PatternError, RuntimeError, TriggerError};
pub use lang::{
    BraceVariables, ChainId, CodeSection, ConvertedExpression, Effect, Event, Expression, ExpressionList,
    InitContext, InlineCondition, Literal, LoopFrame, ParserState, Plural, PluralExpression, Singular,
    SingularExpression, SwitchFrame, SyntaxElement, SyntaxRestriction, TriggerContext, Variable, VariableResolver,
};
pub use runtime::{
    Completion, Element, ExecutorState, ExecutorStatus, Scope, ScopeId, ScopeSpan, TaskId, TickScheduler, Trigger,
    TriggerBody, TriggerBuilder, TriggerExecutor, TriggerItem,
};
pub use script::{FileElement, FileSection, SourceLine};
pub use types::{Converter, LiteralParser, PatternType, TypeId, TypeInfo, TypeRegistry};
pub use value::{Relation, Value, compare};
