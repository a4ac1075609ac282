//! Bundled syntax library.
//!
//! A small but complete set of descriptors, registered by
//! [`SyntaxRegistry::with_builtins`]:
//!
//! | category    | names                                            |
//! |-------------|--------------------------------------------------|
//! | expressions | `length`, `base conversion`, `loop number`, `random number`, `default value` |
//! | conditions  | `regex match`, `compare`                         |
//! | effects     | `print`, `set`, `wait`, `stop`                   |
//! | sections    | `if`, `else if`, `else`, `while`, `loop`, `switch`, `case` |
//! | events      | `load`, `command`                                |
//!
//! Elements are created empty by their factory and receive their captures in
//! `init`. Until then their slots are `None`.

#[path = "syntaxes/conditions.rs"]
mod conditions;
#[path = "syntaxes/effects.rs"]
mod effects;
#[path = "syntaxes/events.rs"]
mod events;
#[path = "syntaxes/expressions.rs"]
mod expressions;
#[path = "syntaxes/sections.rs"]
mod sections;

#[cfg(test)]
#[path = "syntaxes/tests.rs"]
mod tests;

#[allow(unused_imports)]
pub use conditions::{Comparison, RegexMatch};
#[allow(unused_imports)]
pub use effects::{PrintEffect, SetEffect, StopEffect, WaitEffect};
#[allow(unused_imports)]
pub use events::{CommandEvent, LoadEvent};
#[allow(unused_imports)]
pub use expressions::{BaseConversion, DefaultValue, Length, LoopNumber, RandomNumber};
#[allow(unused_imports)]
pub use sections::{CaseSection, ElseIfSection, ElseSection, IfSection, LoopSection, SwitchSection, WhileSection};

use crate::engine::SyntaxRegistry;
use crate::error::{PatternError, RuntimeError};
use crate::lang::Expression;

pub(crate) fn register(registry: &mut SyntaxRegistry) -> Result<(), PatternError> {
    expressions::register(registry)?;
    conditions::register(registry)?;
    effects::register(registry)?;
    sections::register(registry)?;
    events::register(registry)?;
    Ok(())
}

/// The expression bound to a slot by `init`.
fn bound<'a>(slot: &'a Option<Box<dyn Expression>>, owner: &str) -> Result<&'a dyn Expression, RuntimeError> {
    slot.as_deref().ok_or_else(|| RuntimeError::ContractViolation(format!("{owner} was used before init")))
}

fn describe_bound(slot: &Option<Box<dyn Expression>>, debug: bool) -> String {
    slot.as_ref().map_or_else(|| "nothing".to_string(), |e| e.describe(debug))
}
