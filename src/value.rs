//! Runtime values and the default comparator.

use std::cmp::Ordering;
use std::fmt;

use chrono::Duration;

use crate::types::TypeId;

/// A value produced by an expression at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    Integer(i64),
    Text(String),
    Timespan(Duration),
}

impl Value {
    /// The most specific built-in type of this value.
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Boolean(_) => TypeId::BOOLEAN,
            Value::Number(_) => TypeId::NUMBER,
            Value::Integer(_) => TypeId::INTEGER,
            Value::Text(_) => TypeId::STRING,
            Value::Timespan(_) => TypeId::TIMESPAN,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            // Whole numbers print without the trailing ".0".
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => f.write_str(s),
            Value::Timespan(d) => format_timespan(f, *d),
        }
    }
}

fn format_timespan(f: &mut fmt::Formatter<'_>, d: Duration) -> fmt::Result {
    let millis = d.num_milliseconds();
    if millis % 1000 != 0 {
        return write!(f, "{millis} milliseconds");
    }
    let seconds = d.num_seconds();
    let (amount, unit) = if seconds != 0 && seconds % 3600 == 0 {
        (seconds / 3600, "hour")
    } else if seconds != 0 && seconds % 60 == 0 {
        (seconds / 60, "minute")
    } else {
        (seconds, "second")
    };
    if amount == 1 { write!(f, "1 {unit}") } else { write!(f, "{amount} {unit}s") }
}

/// Outcome of comparing two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Equal,
    Less,
    Greater,
    /// Values that are different but have no ordering between them.
    Unequal,
}

impl Relation {
    /// Whether `self` satisfies the `wanted` relation.
    ///
    /// ```text
    /// wanted   | satisfied by
    /// Equal    | Equal
    /// Unequal  | Less, Greater, Unequal
    /// Less     | Less
    /// Greater  | Greater
    /// ```
    pub fn is(self, wanted: Relation) -> bool {
        match wanted {
            Relation::Unequal => self != Relation::Equal,
            other => self == other,
        }
    }
}

impl From<Ordering> for Relation {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Relation::Less,
            Ordering::Equal => Relation::Equal,
            Ordering::Greater => Relation::Greater,
        }
    }
}

/// Default comparator.
///
/// Numbers compare numerically across `Number`/`Integer`, timespans compare by
/// length, and all other pairs only distinguish equal from unequal.
pub fn compare(a: &Value, b: &Value) -> Relation {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).map(Relation::from).unwrap_or(Relation::Unequal);
    }
    match (a, b) {
        (Value::Timespan(x), Value::Timespan(y)) => x.cmp(y).into(),
        (Value::Text(x), Value::Text(y)) if x.eq_ignore_ascii_case(y) => Relation::Equal,
        (x, y) if x == y => Relation::Equal,
        _ => Relation::Unequal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Integer(-4).to_string(), "-4");
    }

    #[test]
    fn timespans_display_in_largest_whole_unit() {
        assert_eq!(Value::Timespan(Duration::seconds(120)).to_string(), "2 minutes");
        assert_eq!(Value::Timespan(Duration::seconds(1)).to_string(), "1 second");
        assert_eq!(Value::Timespan(Duration::milliseconds(50)).to_string(), "50 milliseconds");
    }

    #[test]
    fn compare_mixes_integers_and_numbers() {
        assert_eq!(compare(&Value::Integer(2), &Value::Number(2.0)), Relation::Equal);
        assert_eq!(compare(&Value::Integer(1), &Value::Number(2.5)), Relation::Less);
        assert_eq!(compare(&Value::Text("a".into()), &Value::Integer(1)), Relation::Unequal);
        assert!(compare(&Value::Number(3.0), &Value::Number(1.0)).is(Relation::Greater));
        assert!(compare(&Value::Boolean(true), &Value::Boolean(false)).is(Relation::Unequal));
    }
}
