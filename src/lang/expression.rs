//! Expressions.
//!
//! Every value-producing node of a resolved script implements [`Expression`].
//! Authors of new syntax usually implement one of the two narrower traits
//! instead and wrap it in its adapter, which fills in the arity-specific half
//! of the contract:
//!
//! ```text
//! SingularExpression ── Singular<E> ──┐
//!                                     ├──▶ Box<dyn Expression>
//! PluralExpression   ── Plural<E>   ──┘
//! ```
//!
//! - `Singular` synthesizes `get_all` as a zero- or one-element list and
//!   requires exactly one value on `set_all`.
//! - `Plural` rejects `get_one` with a contract violation; the resolver never
//!   hands a plural expression to a slot that expects a single value.

use std::fmt;

use super::context::TriggerContext;
use super::element::{InitContext, SyntaxElement};
use crate::error::{InitError, RuntimeError};
use crate::types::{Converter, PatternType, TypeId};
use crate::value::Value;

pub trait Expression: SyntaxElement {
    fn get_one(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError>;

    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError>;

    fn is_single(&self) -> bool;

    fn return_type(&self) -> TypeId;

    fn is_literal(&self) -> bool {
        false
    }

    /// The values of a literal, known without a context.
    fn literal_values(&self) -> Option<&[Value]> {
        None
    }

    /// `false` for `a or b` lists.
    fn is_and_list(&self) -> bool {
        true
    }

    /// Conditions are boolean expressions meant to be checked, not stored.
    fn is_conditional(&self) -> bool {
        false
    }

    fn accepts_change(&self) -> bool {
        false
    }

    fn set_one(&self, _ctx: &mut TriggerContext, _value: Value) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotChangeable(self.describe(false)))
    }

    fn set_all(&self, _ctx: &mut TriggerContext, _values: Vec<Value>) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotChangeable(self.describe(false)))
    }

    /// Evaluate as a condition: every value (AND) or any value (OR) must be
    /// `true`. No values means `false`.
    fn check(&self, ctx: &TriggerContext) -> Result<bool, RuntimeError> {
        let values = self.get_all(ctx)?;
        if values.is_empty() {
            return Ok(false);
        }
        let truthy = |v: &Value| v.as_bool().unwrap_or(false);
        Ok(if self.is_and_list() { values.iter().all(truthy) } else { values.iter().any(truthy) })
    }
}

impl fmt::Debug for dyn Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self.describe(true))
    }
}

// --- Adapters -----------------------------------------------------------------

pub trait SingularExpression: SyntaxElement {
    fn get(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError>;

    fn return_type(&self) -> TypeId;

    fn is_conditional(&self) -> bool {
        false
    }

    fn accepts_change(&self) -> bool {
        false
    }

    fn set(&self, _ctx: &mut TriggerContext, _value: Value) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotChangeable(self.describe(false)))
    }
}

pub trait PluralExpression: SyntaxElement {
    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError>;

    fn return_type(&self) -> TypeId;

    fn is_and_list(&self) -> bool {
        true
    }

    fn accepts_change(&self) -> bool {
        false
    }

    fn set_all(&self, _ctx: &mut TriggerContext, _values: Vec<Value>) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotChangeable(self.describe(false)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Singular<E>(pub E);

impl<E: SingularExpression> SyntaxElement for Singular<E> {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.0.init(ctx)
    }

    fn describe(&self, debug: bool) -> String {
        self.0.describe(debug)
    }
}

impl<E: SingularExpression> Expression for Singular<E> {
    fn get_one(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        self.0.get(ctx)
    }

    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
        Ok(self.0.get(ctx)?.into_iter().collect())
    }

    fn is_single(&self) -> bool {
        true
    }

    fn return_type(&self) -> TypeId {
        self.0.return_type()
    }

    fn is_conditional(&self) -> bool {
        self.0.is_conditional()
    }

    fn accepts_change(&self) -> bool {
        self.0.accepts_change()
    }

    fn set_one(&self, ctx: &mut TriggerContext, value: Value) -> Result<(), RuntimeError> {
        self.0.set(ctx, value)
    }

    fn set_all(&self, ctx: &mut TriggerContext, values: Vec<Value>) -> Result<(), RuntimeError> {
        match <[Value; 1]>::try_from(values) {
            Ok([value]) => self.0.set(ctx, value),
            Err(values) => Err(RuntimeError::ContractViolation(format!(
                "'{}' holds a single value but {} were given",
                self.0.describe(false),
                values.len()
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Plural<E>(pub E);

impl<E: PluralExpression> SyntaxElement for Plural<E> {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.0.init(ctx)
    }

    fn describe(&self, debug: bool) -> String {
        self.0.describe(debug)
    }
}

impl<E: PluralExpression> Expression for Plural<E> {
    fn get_one(&self, _ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        Err(RuntimeError::ContractViolation(format!(
            "'{}' can hold several values and cannot be read as a single one",
            self.0.describe(false)
        )))
    }

    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
        self.0.get_all(ctx)
    }

    fn is_single(&self) -> bool {
        false
    }

    fn return_type(&self) -> TypeId {
        self.0.return_type()
    }

    fn is_and_list(&self) -> bool {
        self.0.is_and_list()
    }

    fn accepts_change(&self) -> bool {
        self.0.accepts_change()
    }

    fn set_one(&self, ctx: &mut TriggerContext, value: Value) -> Result<(), RuntimeError> {
        self.0.set_all(ctx, vec![value])
    }

    fn set_all(&self, ctx: &mut TriggerContext, values: Vec<Value>) -> Result<(), RuntimeError> {
        self.0.set_all(ctx, values)
    }
}

// --- Built-in expression kinds ------------------------------------------------

/// Render `a, b and c` / `a, b or c`.
pub(crate) fn join_list(items: &[String], and: bool) -> String {
    match items.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, init)) => format!("{} {} {}", init.join(", "), if and { "and" } else { "or" }, last),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        other => other.to_string(),
    }
}

/// A literal value or list of literal values.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    values: Vec<Value>,
    ty: TypeId,
    and: bool,
}

impl Literal {
    pub fn single(value: Value, ty: TypeId) -> Self {
        Self { values: vec![value], ty, and: true }
    }

    pub fn list(values: Vec<Value>, ty: TypeId, and: bool) -> Self {
        Self { values, ty, and }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl SyntaxElement for Literal {
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        Ok(())
    }

    fn describe(&self, _debug: bool) -> String {
        let items: Vec<String> = self.values.iter().map(describe_value).collect();
        join_list(&items, self.and)
    }
}

impl Expression for Literal {
    fn get_one(&self, _ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        Ok(self.values.first().cloned())
    }

    fn get_all(&self, _ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
        Ok(self.values.clone())
    }

    fn is_single(&self) -> bool {
        self.values.len() == 1
    }

    fn return_type(&self) -> TypeId {
        self.ty
    }

    fn is_literal(&self) -> bool {
        true
    }

    fn literal_values(&self) -> Option<&[Value]> {
        Some(&self.values)
    }

    fn is_and_list(&self) -> bool {
        self.and
    }
}

/// A list whose elements are not all literals.
#[derive(Debug)]
pub struct ExpressionList {
    items: Vec<Box<dyn Expression>>,
    ty: TypeId,
    and: bool,
}

impl ExpressionList {
    pub fn new(items: Vec<Box<dyn Expression>>, ty: TypeId, and: bool) -> Self {
        Self { items, ty, and }
    }

    pub fn items(&self) -> &[Box<dyn Expression>] {
        &self.items
    }
}

impl SyntaxElement for ExpressionList {
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        let items: Vec<String> = self.items.iter().map(|e| e.describe(debug)).collect();
        join_list(&items, self.and)
    }
}

impl Expression for ExpressionList {
    /// The first value, for OR lists as for AND lists.
    fn get_one(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        Ok(self.get_all(ctx)?.into_iter().next())
    }

    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::new();
        for item in &self.items {
            values.extend(item.get_all(ctx)?);
        }
        Ok(values)
    }

    fn is_single(&self) -> bool {
        false
    }

    fn return_type(&self) -> TypeId {
        self.ty
    }

    fn is_and_list(&self) -> bool {
        self.and
    }
}

/// An expression whose values are converted to another type on the fly.
/// Values the converter rejects are dropped.
pub struct ConvertedExpression {
    inner: Box<dyn Expression>,
    to: TypeId,
    converter: Converter,
}

impl ConvertedExpression {
    pub fn new(inner: Box<dyn Expression>, to: TypeId, converter: Converter) -> Self {
        Self { inner, to, converter }
    }
}

impl fmt::Debug for ConvertedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertedExpression").field("inner", &self.inner).field("to", &self.to).finish()
    }
}

impl SyntaxElement for ConvertedExpression {
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        if debug { format!("{} as {}", self.inner.describe(true), self.to.name()) } else { self.inner.describe(false) }
    }
}

impl Expression for ConvertedExpression {
    fn get_one(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        Ok(self.inner.get_one(ctx)?.and_then(|v| (self.converter)(&v)))
    }

    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
        Ok(self.inner.get_all(ctx)?.iter().filter_map(self.converter).collect())
    }

    fn is_single(&self) -> bool {
        self.inner.is_single()
    }

    fn return_type(&self) -> TypeId {
        self.to
    }

    fn is_and_list(&self) -> bool {
        self.inner.is_and_list()
    }

    fn is_conditional(&self) -> bool {
        self.inner.is_conditional()
    }
}

// --- Variables ------------------------------------------------------------------

/// Recognizes variable references in script text.
pub trait VariableResolver: Send + Sync {
    fn parse_variable(&self, text: &str, expected: PatternType) -> Option<Box<dyn Expression>>;
}

/// `{name}` holds one value, `{name::*}` a list. Variables live in the
/// firing's [`TriggerContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceVariables;

impl VariableResolver for BraceVariables {
    fn parse_variable(&self, text: &str, expected: PatternType) -> Option<Box<dyn Expression>> {
        let caps = regex!(r"^\{([^{}*]+?)(::\*)?\}$").captures(text.trim())?;
        let name = caps[1].trim().to_string();
        Some(Box::new(Variable { name, list: caps.get(2).is_some(), ty: expected.ty }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    list: bool,
    ty: TypeId,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_list(&self) -> bool {
        self.list
    }
}

impl SyntaxElement for Variable {
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        Ok(())
    }

    fn describe(&self, _debug: bool) -> String {
        if self.list { format!("{{{}::*}}", self.name) } else { format!("{{{}}}", self.name) }
    }
}

impl Expression for Variable {
    fn get_one(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        Ok(ctx.variable(&self.name).first().cloned())
    }

    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
        Ok(ctx.variable(&self.name).to_vec())
    }

    fn is_single(&self) -> bool {
        !self.list
    }

    fn return_type(&self) -> TypeId {
        self.ty
    }

    fn accepts_change(&self) -> bool {
        true
    }

    fn set_one(&self, ctx: &mut TriggerContext, value: Value) -> Result<(), RuntimeError> {
        ctx.set_variable(&self.name, vec![value]);
        Ok(())
    }

    fn set_all(&self, ctx: &mut TriggerContext, values: Vec<Value>) -> Result<(), RuntimeError> {
        if !self.list && values.len() > 1 {
            return Err(RuntimeError::ContractViolation(format!(
                "{} holds a single value but {} were given",
                self.describe(false),
                values.len()
            )));
        }
        ctx.set_variable(&self.name, values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Answer;

    impl SyntaxElement for Answer {
        fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
            Ok(())
        }

        fn describe(&self, _debug: bool) -> String {
            "the answer".into()
        }
    }

    impl SingularExpression for Answer {
        fn get(&self, _ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
            Ok(Some(Value::Integer(42)))
        }

        fn return_type(&self) -> TypeId {
            TypeId::INTEGER
        }
    }

    #[derive(Debug, Default)]
    struct Digits;

    impl SyntaxElement for Digits {
        fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
            Ok(())
        }

        fn describe(&self, _debug: bool) -> String {
            "the digits".into()
        }
    }

    impl PluralExpression for Digits {
        fn get_all(&self, _ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
            Ok((0..3).map(Value::Integer).collect())
        }

        fn return_type(&self) -> TypeId {
            TypeId::INTEGER
        }
    }

    #[test]
    fn singular_adapter_boxes_its_value() {
        let ctx = TriggerContext::new("test");
        let answer = Singular(Answer);
        assert!(answer.is_single());
        assert_eq!(answer.get_all(&ctx).unwrap(), vec![Value::Integer(42)]);
        let mut ctx = ctx;
        assert_eq!(answer.set_one(&mut ctx, Value::Integer(1)), Err(RuntimeError::NotChangeable("the answer".into())));
    }

    #[test]
    fn plural_adapter_rejects_single_reads() {
        let ctx = TriggerContext::new("test");
        let digits = Plural(Digits);
        assert!(!digits.is_single());
        assert!(matches!(digits.get_one(&ctx), Err(RuntimeError::ContractViolation(_))));
        assert_eq!(digits.get_all(&ctx).unwrap().len(), 3);
    }

    #[test]
    fn literal_lists_render_like_source() {
        let list = Literal::list(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)], TypeId::NUMBER, true);
        assert_eq!(list.describe(false), "1, 2 and 3");
        let list = Literal::list(vec![Value::Text("a".into()), Value::Text("b".into())], TypeId::STRING, false);
        assert_eq!(list.describe(false), "\"a\" or \"b\"");
    }

    #[test]
    fn variables_read_and_write_the_context() {
        let mut ctx = TriggerContext::new("test");
        let single = BraceVariables.parse_variable("{score}", PatternType::single(TypeId::NUMBER)).unwrap();
        let list = BraceVariables.parse_variable("{scores::*}", PatternType::plural(TypeId::NUMBER)).unwrap();
        assert!(single.is_single());
        assert!(!list.is_single());
        assert_eq!(list.describe(false), "{scores::*}");

        single.set_one(&mut ctx, Value::Integer(7)).unwrap();
        list.set_all(&mut ctx, vec![Value::Integer(1), Value::Integer(2)]).unwrap();
        assert_eq!(single.get_one(&ctx).unwrap(), Some(Value::Integer(7)));
        assert_eq!(list.get_all(&ctx).unwrap(), vec![Value::Integer(1), Value::Integer(2)]);
        assert!(single.set_all(&mut ctx, vec![Value::Integer(1), Value::Integer(2)]).is_err());
        assert!(BraceVariables.parse_variable("{broken", PatternType::single(TypeId::OBJECT)).is_none());
    }

    #[test]
    fn or_lists_check_any() {
        let ctx = TriggerContext::new("test");
        let any = Literal::list(vec![Value::Boolean(false), Value::Boolean(true)], TypeId::BOOLEAN, false);
        let all = Literal::list(vec![Value::Boolean(false), Value::Boolean(true)], TypeId::BOOLEAN, true);
        assert!(any.check(&ctx).unwrap());
        assert!(!all.check(&ctx).unwrap());
    }
}
