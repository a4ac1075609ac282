//! Type registry.
//!
//! Types are identified by a static name and arranged in a single-parent
//! hierarchy rooted at `object`. Each type may carry a literal parser (used by
//! the resolver before any registered syntax is tried) and the registry holds a
//! converter table for values that are not assignable but can be converted.
//!
//! ```text
//! object
//! ├── number
//! │   └── integer
//! ├── boolean
//! ├── string
//! └── timespan
//! ```

use std::collections::HashMap;

use chrono::Duration;

use crate::value::Value;

/// Identifier of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub &'static str);

impl TypeId {
    pub const OBJECT: TypeId = TypeId("object");
    pub const NUMBER: TypeId = TypeId("number");
    pub const INTEGER: TypeId = TypeId("integer");
    pub const BOOLEAN: TypeId = TypeId("boolean");
    pub const STRING: TypeId = TypeId("string");
    pub const TIMESPAN: TypeId = TypeId("timespan");

    pub fn name(self) -> &'static str {
        self.0
    }
}

/// A type as written in a pattern: `number` is single, `numbers` is plural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternType {
    pub ty: TypeId,
    pub single: bool,
}

impl PatternType {
    pub fn single(ty: TypeId) -> Self {
        Self { ty, single: true }
    }

    pub fn plural(ty: TypeId) -> Self {
        Self { ty, single: false }
    }
}

pub type LiteralParser = fn(&str) -> Option<Value>;
pub type Converter = fn(&Value) -> Option<Value>;

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub parent: Option<TypeId>,
    pub singular: &'static str,
    pub plural: &'static str,
    pub literal: Option<LiteralParser>,
}

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    converters: HashMap<(TypeId, TypeId), Converter>,
}

impl Default for TypeRegistry {
    /// The built-in types plus their converters.
    fn default() -> Self {
        let mut types = Self::empty();
        types.register(TypeId::OBJECT, None, "object", "objects", None);
        types.register(TypeId::NUMBER, Some(TypeId::OBJECT), "number", "numbers", Some(parse_number));
        types.register(TypeId::INTEGER, Some(TypeId::NUMBER), "integer", "integers", Some(parse_integer));
        types.register(TypeId::BOOLEAN, Some(TypeId::OBJECT), "boolean", "booleans", Some(parse_boolean));
        types.register(TypeId::STRING, Some(TypeId::OBJECT), "string", "strings", Some(parse_string));
        types.register(TypeId::TIMESPAN, Some(TypeId::OBJECT), "timespan", "timespans", Some(parse_timespan));

        types.register_converter(TypeId::NUMBER, TypeId::INTEGER, |v| v.as_i64().map(Value::Integer));
        types.register_converter(TypeId::NUMBER, TypeId::STRING, |v| Some(Value::Text(v.to_string())));
        types.register_converter(TypeId::BOOLEAN, TypeId::STRING, |v| Some(Value::Text(v.to_string())));
        types.register_converter(TypeId::TIMESPAN, TypeId::STRING, |v| Some(Value::Text(v.to_string())));
        types
    }
}

impl TypeRegistry {
    /// A registry with no types at all, not even `object`.
    pub fn empty() -> Self {
        Self { types: Vec::new(), converters: HashMap::new() }
    }

    /// Register a type. Re-registering an id replaces its previous entry in place.
    pub fn register(
        &mut self,
        id: TypeId,
        parent: Option<TypeId>,
        singular: &'static str,
        plural: &'static str,
        literal: Option<LiteralParser>,
    ) {
        let info = TypeInfo { id, parent, singular, plural, literal };
        match self.types.iter_mut().find(|t| t.id == id) {
            Some(existing) => *existing = info,
            None => self.types.push(info),
        }
    }

    pub fn register_converter(&mut self, from: TypeId, to: TypeId, converter: Converter) {
        self.converters.insert((from, to), converter);
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn literal_parser(&self, id: TypeId) -> Option<LiteralParser> {
        self.get(id).and_then(|t| t.literal)
    }

    /// Types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }

    /// Resolve a type name as written in a pattern (`number`, `numbers`, ...).
    pub fn pattern_type(&self, name: &str) -> Option<PatternType> {
        let name = name.trim();
        self.types.iter().find_map(|t| {
            if t.singular.eq_ignore_ascii_case(name) {
                Some(PatternType::single(t.id))
            } else if t.plural.eq_ignore_ascii_case(name) {
                Some(PatternType::plural(t.id))
            } else {
                None
            }
        })
    }

    /// `from` and its ancestors, most specific first.
    fn lineage(&self, from: TypeId) -> Vec<TypeId> {
        let mut chain = vec![from];
        let mut current = from;
        while let Some(parent) = self.get(current).and_then(|t| t.parent) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// True when every value of `from` is also a value of `to`.
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        to == TypeId::OBJECT || self.lineage(from).contains(&to)
    }

    /// The converter used to turn `from` values into `to` values, looking up
    /// converters registered for any ancestor of `from`.
    pub fn converter(&self, from: TypeId, to: TypeId) -> Option<Converter> {
        self.lineage(from).into_iter().find_map(|ty| self.converters.get(&(ty, to)).copied())
    }

    pub fn converter_exists(&self, from: TypeId, to: TypeId) -> bool {
        self.converter(from, to).is_some()
    }

    pub fn convert(&self, value: &Value, from: TypeId, to: TypeId) -> Option<Value> {
        if self.is_assignable(from, to) {
            return Some(value.clone());
        }
        self.converter(from, to).and_then(|c| c(value))
    }

    /// Most specific type every given type is assignable to.
    pub fn common_supertype(&self, types: &[TypeId]) -> TypeId {
        let Some((first, rest)) = types.split_first() else {
            return TypeId::OBJECT;
        };
        self.lineage(*first)
            .into_iter()
            .find(|candidate| rest.iter().all(|t| self.is_assignable(*t, *candidate)))
            .unwrap_or(TypeId::OBJECT)
    }
}

// --- Literal parsers ---------------------------------------------------------

fn parse_number(text: &str) -> Option<Value> {
    if !regex!(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().map(Value::Number)
}

fn parse_integer(text: &str) -> Option<Value> {
    if !regex!(r"^[+-]?\d+$").is_match(text) {
        return None;
    }
    text.parse::<i64>().ok().map(Value::Integer)
}

fn parse_boolean(text: &str) -> Option<Value> {
    if text.eq_ignore_ascii_case("true") {
        Some(Value::Boolean(true))
    } else if text.eq_ignore_ascii_case("false") {
        Some(Value::Boolean(false))
    } else {
        None
    }
}

/// `"..."`, with `""` standing for a literal quote.
fn parse_string(text: &str) -> Option<Value> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            // A lone quote would have ended the literal.
            if chars.next_if_eq(&'"').is_none() {
                return None;
            }
        }
        out.push(c);
    }
    Some(Value::Text(out))
}

/// Milliseconds per game tick, as in the scheduler.
pub(crate) const TICK_MILLIS: i64 = 50;

fn parse_timespan(text: &str) -> Option<Value> {
    let caps = regex!(r"(?i)^(\d+(?:\.\d+)?|an?)\s+(tick|second|minute|hour|day)s?$").captures(text)?;
    let amount = match &caps[1] {
        a if a.eq_ignore_ascii_case("a") || a.eq_ignore_ascii_case("an") => 1.0,
        a => a.parse::<f64>().ok()?,
    };
    let unit_millis = match caps[2].to_ascii_lowercase().as_str() {
        "tick" => TICK_MILLIS,
        "second" => 1_000,
        "minute" => 60_000,
        "hour" => 3_600_000,
        _ => 86_400_000,
    };
    Some(Value::Timespan(Duration::milliseconds((amount * unit_millis as f64).round() as i64)))
}
