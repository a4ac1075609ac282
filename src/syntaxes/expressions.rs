use rand::Rng;
use rand::distributions::Open01;

use super::{bound, describe_bound};
use crate::engine::SyntaxRegistry;
use crate::error::{InitError, PatternError, RuntimeError};
use crate::lang::{Expression, InitContext, Singular, SingularExpression, SyntaxElement, TriggerContext};
use crate::types::TypeId;
use crate::value::Value;

pub(super) fn register(registry: &mut SyntaxRegistry) -> Result<(), PatternError> {
    registry.register_expression("length", "integer", &["length of %string%", "%string%'s length"], || {
        Box::new(Singular(Length::default()))
    })?;
    registry.register_expression(
        "base conversion",
        "string",
        &["%integer% convert[ed] (in|to) (hex[adecimal]|1:octal|2:binary)"],
        || Box::new(Singular(BaseConversion::default())),
    )?;
    registry.register_expression("loop number", "integer", &["loop-(number|counter|iteration)"], || {
        Box::new(Singular(LoopNumber))
    })?;
    registry.register_expression(
        "random number",
        "number",
        &[
            "[a] [1:strictly] random integer (from|between) %integer% (to|and) %integer%",
            "[a] [1:strictly] random number (from|between) %number% (to|and) %number%",
        ],
        || Box::new(Singular(RandomNumber::default())),
    )?;
    registry.register_expression("default value", "objects", &["%objects% (otherwise|?) %objects%"], || {
        Box::new(DefaultValue::default())
    })?;
    Ok(())
}

// --- Default value ------------------------------------------------------------

/// `a otherwise b`: the values of `a`, or those of `b` when `a` has none.
#[derive(Debug, Default)]
pub struct DefaultValue {
    first: Option<Box<dyn Expression>>,
    second: Option<Box<dyn Expression>>,
    ty: Option<TypeId>,
}

impl SyntaxElement for DefaultValue {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        let first = ctx.take(0)?;
        let second = ctx.take(1)?;
        self.ty = Some(ctx.types().common_supertype(&[first.return_type(), second.return_type()]));
        self.first = Some(first);
        self.second = Some(second);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("{} otherwise {}", describe_bound(&self.first, debug), describe_bound(&self.second, debug))
    }
}

impl Expression for DefaultValue {
    fn get_one(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        match bound(&self.first, "default value")?.get_one(ctx)? {
            Some(value) => Ok(Some(value)),
            None => bound(&self.second, "default value")?.get_one(ctx),
        }
    }

    fn get_all(&self, ctx: &TriggerContext) -> Result<Vec<Value>, RuntimeError> {
        let values = bound(&self.first, "default value")?.get_all(ctx)?;
        if !values.is_empty() {
            return Ok(values);
        }
        bound(&self.second, "default value")?.get_all(ctx)
    }

    fn is_single(&self) -> bool {
        self.first.as_ref().is_some_and(|e| e.is_single()) && self.second.as_ref().is_some_and(|e| e.is_single())
    }

    fn return_type(&self) -> TypeId {
        self.ty.unwrap_or(TypeId::OBJECT)
    }
}

// --- Length -------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Length {
    text: Option<Box<dyn Expression>>,
}

impl SyntaxElement for Length {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.text = Some(ctx.take(0)?);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("length of {}", describe_bound(&self.text, debug))
    }
}

impl SingularExpression for Length {
    fn get(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        let text = bound(&self.text, "length")?.get_one(ctx)?;
        Ok(text.as_ref().and_then(Value::as_str).map(|s| Value::Integer(s.chars().count() as i64)))
    }

    fn return_type(&self) -> TypeId {
        TypeId::INTEGER
    }
}

// --- Base conversion ----------------------------------------------------------

/// `255 converted to hex` -> `"ff"`.
#[derive(Debug, Default)]
pub struct BaseConversion {
    number: Option<Box<dyn Expression>>,
    radix: u32,
}

impl BaseConversion {
    fn radix_name(&self) -> &'static str {
        match self.radix {
            8 => "octal",
            2 => "binary",
            _ => "hexadecimal",
        }
    }
}

impl SyntaxElement for BaseConversion {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.number = Some(ctx.take(0)?);
        self.radix = match ctx.mark() {
            1 => 8,
            2 => 2,
            _ => 16,
        };
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("{} converted to {}", describe_bound(&self.number, debug), self.radix_name())
    }
}

impl SingularExpression for BaseConversion {
    fn get(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        let number = bound(&self.number, "base conversion")?.get_one(ctx)?;
        let Some(n) = number.as_ref().and_then(Value::as_i64) else {
            return Ok(None);
        };
        let digits = match self.radix {
            8 => format!("{:o}", n.unsigned_abs()),
            2 => format!("{:b}", n.unsigned_abs()),
            _ => format!("{:x}", n.unsigned_abs()),
        };
        Ok(Some(Value::Text(if n < 0 { format!("-{digits}") } else { digits })))
    }

    fn return_type(&self) -> TypeId {
        TypeId::STRING
    }
}

// --- Loop number --------------------------------------------------------------

/// Iteration of the innermost `loop N times`, starting at 1.
#[derive(Debug, Default)]
pub struct LoopNumber;

impl SyntaxElement for LoopNumber {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        if !ctx.state().is_inside("loop") {
            return Err(InitError::new("loop-number can only be used inside a loop"));
        }
        Ok(())
    }

    fn describe(&self, _debug: bool) -> String {
        "loop-number".into()
    }
}

impl SingularExpression for LoopNumber {
    fn get(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        Ok(ctx.current_loop().map(|frame| Value::Integer(frame.iteration)))
    }

    fn return_type(&self) -> TypeId {
        TypeId::INTEGER
    }
}

// --- Random number ------------------------------------------------------------

/// A random integer or number between two bounds, given in either order.
/// Bounds are inclusive unless `strictly` is used.
#[derive(Debug, Default)]
pub struct RandomNumber {
    low: Option<Box<dyn Expression>>,
    high: Option<Box<dyn Expression>>,
    integer: bool,
    strictly: bool,
}

impl RandomNumber {
    fn pick_integer(&self, a: i64, b: i64) -> Option<i64> {
        let (mut low, mut high) = (a.min(b), a.max(b));
        if self.strictly {
            low = low.checked_add(1)?;
            high = high.checked_sub(1)?;
        }
        (low <= high).then(|| rand::thread_rng().gen_range(low..=high))
    }

    fn pick_number(&self, a: f64, b: f64) -> Option<f64> {
        if !a.is_finite() || !b.is_finite() {
            return None;
        }
        let (low, high) = (a.min(b), a.max(b));
        let mut rng = rand::thread_rng();
        if !self.strictly {
            return Some(rng.gen_range(low..=high));
        }
        if low == high {
            return None;
        }
        let unit: f64 = rng.sample(Open01);
        Some(low + (high - low) * unit)
    }
}

impl SyntaxElement for RandomNumber {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.low = Some(ctx.take(0)?);
        self.high = Some(ctx.take(1)?);
        self.integer = ctx.matched_pattern() == 0;
        self.strictly = ctx.mark() == 1;
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!(
            "a {}random {} between {} and {}",
            if self.strictly { "strictly " } else { "" },
            if self.integer { "integer" } else { "number" },
            describe_bound(&self.low, debug),
            describe_bound(&self.high, debug)
        )
    }
}

impl SingularExpression for RandomNumber {
    fn get(&self, ctx: &TriggerContext) -> Result<Option<Value>, RuntimeError> {
        let low = bound(&self.low, "random number")?.get_one(ctx)?;
        let high = bound(&self.high, "random number")?.get_one(ctx)?;
        let (Some(low), Some(high)) = (low, high) else {
            return Ok(None);
        };
        if self.integer {
            let (Some(a), Some(b)) = (low.as_i64(), high.as_i64()) else {
                return Ok(None);
            };
            return Ok(self.pick_integer(a, b).map(Value::Integer));
        }
        let (Some(a), Some(b)) = (low.as_f64(), high.as_f64()) else {
            return Ok(None);
        };
        Ok(self.pick_number(a, b).map(Value::Number))
    }

    fn return_type(&self) -> TypeId {
        if self.integer { TypeId::INTEGER } else { TypeId::NUMBER }
    }
}
