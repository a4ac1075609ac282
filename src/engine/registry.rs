//! Syntax registry.
//!
//! A descriptor pairs a name and one or more compiled patterns with a factory
//! that produces a fresh, uninitialized element. Descriptors are kept per
//! category in registration order; the order is the tie-breaker whenever
//! several descriptors could match the same text.
//!
//! ```text
//! register_expression("length", "integer", &["length of %string%"], factory)
//!        │ compile each pattern          (pattern.rs)
//!        v
//! expressions: [ExpressionInfo { syntax: SyntaxInfo { name, patterns, factory }, return_type }]
//! ```
//!
//! The registry is read-only once parsing starts and can be shared between
//! parser handles.

use std::fmt;

use super::pattern::{PatternNode, compile};
use crate::error::PatternError;
use crate::lang::{BraceVariables, CodeSection, Effect, Event, Expression, VariableResolver};
use crate::types::{PatternType, TypeRegistry};

pub type Factory<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

pub struct SyntaxInfo<T: ?Sized> {
    name: &'static str,
    patterns: Vec<PatternNode>,
    factory: Factory<T>,
}

impl<T: ?Sized> SyntaxInfo<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Compiled pattern alternatives, in registration order.
    pub fn patterns(&self) -> &[PatternNode] {
        &self.patterns
    }

    pub fn create(&self) -> Box<T> {
        (self.factory)()
    }
}

impl<T: ?Sized> fmt::Debug for SyntaxInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxInfo")
            .field("name", &self.name)
            .field("patterns", &self.patterns.len())
            .field("factory", &"<function>")
            .finish()
    }
}

/// An expression descriptor with its declared return type.
#[derive(Debug)]
pub struct ExpressionInfo {
    syntax: SyntaxInfo<dyn Expression>,
    return_type: PatternType,
}

impl ExpressionInfo {
    pub fn name(&self) -> &'static str {
        self.syntax.name
    }

    pub fn patterns(&self) -> &[PatternNode] {
        &self.syntax.patterns
    }

    pub fn create(&self) -> Box<dyn Expression> {
        self.syntax.create()
    }

    pub fn return_type(&self) -> PatternType {
        self.return_type
    }
}

pub struct SyntaxRegistry {
    types: TypeRegistry,
    variables: Box<dyn VariableResolver>,
    expressions: Vec<ExpressionInfo>,
    effects: Vec<SyntaxInfo<dyn Effect>>,
    sections: Vec<SyntaxInfo<dyn CodeSection>>,
    events: Vec<SyntaxInfo<dyn Event>>,
}

impl Default for SyntaxRegistry {
    /// Built-in types and brace variables, but no syntax.
    fn default() -> Self {
        Self::new(TypeRegistry::default())
    }
}

impl fmt::Debug for SyntaxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxRegistry")
            .field("types", &self.types.iter().map(|t| t.id.name()).collect::<Vec<_>>())
            .field("expressions", &self.expressions.iter().map(|e| e.name()).collect::<Vec<_>>())
            .field("effects", &self.effects.iter().map(|e| e.name).collect::<Vec<_>>())
            .field("sections", &self.sections.iter().map(|e| e.name).collect::<Vec<_>>())
            .field("events", &self.events.iter().map(|e| e.name).collect::<Vec<_>>())
            .finish()
    }
}

impl SyntaxRegistry {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            variables: Box::new(BraceVariables),
            expressions: Vec::new(),
            effects: Vec::new(),
            sections: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Built-in types plus the bundled syntax library.
    pub fn with_builtins() -> Result<Self, PatternError> {
        let mut registry = Self::default();
        crate::syntaxes::register(&mut registry)?;
        Ok(registry)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn variables(&self) -> &dyn VariableResolver {
        self.variables.as_ref()
    }

    pub fn set_variable_resolver(&mut self, resolver: Box<dyn VariableResolver>) {
        self.variables = resolver;
    }

    pub fn expressions(&self) -> &[ExpressionInfo] {
        &self.expressions
    }

    pub fn effects(&self) -> &[SyntaxInfo<dyn Effect>] {
        &self.effects
    }

    pub fn sections(&self) -> &[SyntaxInfo<dyn CodeSection>] {
        &self.sections
    }

    pub fn events(&self) -> &[SyntaxInfo<dyn Event>] {
        &self.events
    }

    // --- Registration -------------------------------------------------------

    fn compile_all(&self, patterns: &[&str]) -> Result<Vec<PatternNode>, PatternError> {
        if patterns.is_empty() {
            return Err(PatternError::Empty);
        }
        patterns.iter().map(|p| compile(p, &self.types)).collect()
    }

    /// `return_type` is a type name as written in patterns (`integer`,
    /// `strings`, ...); the plural form declares a plural return.
    pub fn register_expression<F>(
        &mut self,
        name: &'static str,
        return_type: &str,
        patterns: &[&str],
        factory: F,
    ) -> Result<(), PatternError>
    where
        F: Fn() -> Box<dyn Expression> + Send + Sync + 'static,
    {
        let return_type = self
            .types
            .pattern_type(return_type)
            .ok_or_else(|| PatternError::UnknownType { name: return_type.to_string() })?;
        let patterns = self.compile_all(patterns)?;
        let syntax = SyntaxInfo { name, patterns, factory: Box::new(factory) };
        self.expressions.push(ExpressionInfo { syntax, return_type });
        Ok(())
    }

    pub fn register_effect<F>(&mut self, name: &'static str, patterns: &[&str], factory: F) -> Result<(), PatternError>
    where
        F: Fn() -> Box<dyn Effect> + Send + Sync + 'static,
    {
        let patterns = self.compile_all(patterns)?;
        self.effects.push(SyntaxInfo { name, patterns, factory: Box::new(factory) });
        Ok(())
    }

    pub fn register_section<F>(&mut self, name: &'static str, patterns: &[&str], factory: F) -> Result<(), PatternError>
    where
        F: Fn() -> Box<dyn CodeSection> + Send + Sync + 'static,
    {
        let patterns = self.compile_all(patterns)?;
        self.sections.push(SyntaxInfo { name, patterns, factory: Box::new(factory) });
        Ok(())
    }

    pub fn register_event<F>(&mut self, name: &'static str, patterns: &[&str], factory: F) -> Result<(), PatternError>
    where
        F: Fn() -> Box<dyn Event> + Send + Sync + 'static,
    {
        let patterns = self.compile_all(patterns)?;
        self.events.push(SyntaxInfo { name, patterns, factory: Box::new(factory) });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntaxes::PrintEffect;
    use crate::types::TypeId;

    #[test]
    fn registration_compiles_every_pattern() {
        let mut registry = SyntaxRegistry::default();
        registry.register_effect("print", &["print %objects%", "say %objects%"], || Box::new(PrintEffect::default())).unwrap();
        assert_eq!(registry.effects().len(), 1);
        assert_eq!(registry.effects()[0].patterns().len(), 2);
        assert_eq!(registry.effects()[0].create().describe(false), "print nothing");
    }

    #[test]
    fn malformed_patterns_fail_only_their_registration() {
        let mut registry = SyntaxRegistry::default();
        let err = registry.register_effect("broken", &["print (unclosed"], || Box::new(PrintEffect::default()));
        assert!(matches!(err, Err(PatternError::Unclosed { open: '(', .. })));
        let err = registry.register_effect("unknown", &["print %colour%"], || Box::new(PrintEffect::default()));
        assert_eq!(err, Err(PatternError::UnknownType { name: "colour".into() }));
        assert!(registry.effects().is_empty());

        registry.register_effect("print", &["print %objects%"], || Box::new(PrintEffect::default())).unwrap();
        assert_eq!(registry.effects().len(), 1);
    }

    #[test]
    fn expression_return_types_come_from_type_names() {
        let registry = SyntaxRegistry::with_builtins().unwrap();
        let length = registry.expressions().iter().find(|e| e.name() == "length").unwrap();
        assert_eq!(length.return_type(), PatternType::single(TypeId::INTEGER));
    }
}
