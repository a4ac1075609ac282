use regex::Regex;

use super::{bound, describe_bound};
use crate::engine::SyntaxRegistry;
use crate::error::{InitError, PatternError, RuntimeError};
use crate::lang::{Expression, InitContext, Singular, SingularExpression, SyntaxElement, TriggerContext};
use crate::types::TypeId;
use crate::value::{Relation, Value, compare};

pub(super) fn register(registry: &mut SyntaxRegistry) -> Result<(), PatternError> {
    registry.register_expression(
        "regex match",
        "boolean",
        &["%string% [1:(doesn't|does not|do not|don't)] match[es] [regex] %string%"],
        || Box::new(Singular(RegexMatch::default())),
    )?;
    registry.register_expression(
        "compare",
        "boolean",
        &[
            "%objects% (is|are) [1:not] (equal to|2:greater than|4:less than) %objects%",
            "%objects% (=|1:!=|2:\\>|4:\\<) %objects%",
        ],
        || Box::new(Singular(Comparison::default())),
    )?;
    Ok(())
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

// --- Regex match --------------------------------------------------------------

/// `<text> matches <regex>`: the regex has to match the whole text.
#[derive(Debug, Default)]
pub struct RegexMatch {
    text: Option<Box<dyn Expression>>,
    pattern: Option<Box<dyn Expression>>,
    /// Compiled once when the pattern is a literal.
    compiled: Option<Regex>,
    negated: bool,
}

impl SyntaxElement for RegexMatch {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.text = Some(ctx.take(0)?);
        let pattern = ctx.take(1)?;
        if let Some(Value::Text(source)) = pattern.literal_values().and_then(|v| v.first()) {
            let regex = anchored(source).map_err(|e| InitError::new(format!("'{source}' is not a valid regex: {e}")))?;
            self.compiled = Some(regex);
        }
        self.pattern = Some(pattern);
        self.negated = ctx.mark() & 1 != 0;
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        let verb = if self.negated { "doesn't match" } else { "matches" };
        format!("{} {verb} {}", describe_bound(&self.text, debug), describe_bound(&self.pattern, debug))
    }
}

impl SingularExpression for RegexMatch {
    fn get(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        let text = bound(&self.text, "regex match")?.get_one(ctx)?;
        let Some(text) = text.as_ref().and_then(Value::as_str) else {
            return Ok(Some(Value::Boolean(self.negated)));
        };
        let matched = match &self.compiled {
            Some(regex) => regex.is_match(text),
            None => {
                let source = bound(&self.pattern, "regex match")?.get_one(ctx)?;
                let Some(source) = source.as_ref().and_then(Value::as_str) else {
                    return Ok(Some(Value::Boolean(self.negated)));
                };
                anchored(source)
                    .map_err(|e| RuntimeError::Script(format!("'{source}' is not a valid regex: {e}")))?
                    .is_match(text)
            }
        };
        Ok(Some(Value::Boolean(matched != self.negated)))
    }

    fn return_type(&self) -> TypeId {
        TypeId::BOOLEAN
    }

    fn is_conditional(&self) -> bool {
        true
    }
}

// --- Comparison ---------------------------------------------------------------

/// `a is [not] (equal to|greater than|less than) b`, using [`compare`].
///
/// Lists follow their kind on both sides: every value of an AND list has to
/// satisfy the relation, any value of an OR list.
#[derive(Debug, Default)]
pub struct Comparison {
    left: Option<Box<dyn Expression>>,
    right: Option<Box<dyn Expression>>,
    relation: Option<Relation>,
    negated: bool,
}

impl Comparison {
    fn relation(&self) -> Relation {
        self.relation.unwrap_or(Relation::Equal)
    }
}

impl SyntaxElement for Comparison {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.left = Some(ctx.take(0)?);
        self.right = Some(ctx.take(1)?);
        self.negated = ctx.mark() & 1 != 0;
        self.relation = Some(match ctx.mark() & 6 {
            0 => Relation::Equal,
            2 => Relation::Greater,
            4 => Relation::Less,
            _ => return Err(InitError::silent()),
        });
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        let relation = match self.relation() {
            Relation::Greater => "greater than",
            Relation::Less => "less than",
            _ => "equal to",
        };
        let not = if self.negated { "not " } else { "" };
        format!("{} is {not}{relation} {}", describe_bound(&self.left, debug), describe_bound(&self.right, debug))
    }
}

impl SingularExpression for Comparison {
    fn get(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        let left = bound(&self.left, "compare")?;
        let right = bound(&self.right, "compare")?;
        let lhs = left.get_all(ctx)?;
        let rhs = right.get_all(ctx)?;
        let wanted = self.relation();

        let holds_for = |a: &Value| {
            let related = |b: &Value| compare(a, b).is(wanted);
            if right.is_and_list() { rhs.iter().all(related) } else { rhs.iter().any(related) }
        };
        let holds = !lhs.is_empty()
            && !rhs.is_empty()
            && if left.is_and_list() { lhs.iter().all(holds_for) } else { lhs.iter().any(holds_for) };
        Ok(Some(Value::Boolean(holds != self.negated)))
    }

    fn return_type(&self) -> TypeId {
        TypeId::BOOLEAN
    }

    fn is_conditional(&self) -> bool {
        true
    }
}
