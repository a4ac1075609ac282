//! Syntax resolution.
//!
//! [`SyntaxParser`] turns script text into typed elements. It is the handle
//! that owns everything mutable about a parse (recency lists, diagnostics,
//! section state) while the [`SyntaxRegistry`] it reads stays shared.
//!
//! ```text
//! parse_expression(text, expected)
//!   1. strip enclosing parentheses, reject empty text
//!   2. literal via type parsers      ── Literal (converted when needed)
//!   3. variable via VariableResolver ── Variable
//!   4. plural expected: list literal ── Literal list / ExpressionList
//!   5. registered expressions, recent ones first, earliest registered wins
//!        match pattern ─▶ factory ─▶ init ─▶ return type ─▶ arity ─▶ policy ─▶ restriction
//!   6. "No expression matching '<text>' was found"
//! ```
//!
//! Every candidate failure is local: its `NoMatch` noise is forgotten and only
//! exhaustion of the whole candidate set is reported. Semantic errors (a
//! candidate matched but its result was unusable) stay pending and outrank the
//! final "no match" when the line is finished.

use tracing::{debug, trace};

use super::diagnostics::{Diagnostics, ErrorKind};
use super::matcher::{MatchContext, PatternMatch};
use super::pattern::PatternNode;
use super::recent::{Category, RecentLists};
use super::registry::{ExpressionInfo, SyntaxInfo, SyntaxRegistry};
use super::split::{split_list, strip_enclosing_parentheses};
use crate::api::ParserOptions;
use crate::error::ParseError;
use crate::lang::{
    ConvertedExpression, Effect, Expression, ExpressionList, InitContext, InlineCondition, Literal, ParserState,
    SyntaxElement,
};
use crate::runtime::{Element, Trigger, TriggerBuilder};
use crate::script::{FileElement, FileSection};
use crate::types::{PatternType, TypeId};

/// Whether a boolean slot accepts conditions, plain booleans, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalPolicy {
    /// Only non-conditional booleans (literals, variables, boolean expressions).
    NotConditional,
    MaybeConditional,
    /// Only conditions.
    Conditional,
}

const INLINE_CONDITION: &str = "continue if";

pub struct SyntaxParser<'r> {
    registry: &'r SyntaxRegistry,
    options: ParserOptions,
    recent: RecentLists,
    diagnostics: Diagnostics,
    state: ParserState,
    /// Expression descriptors currently being matched, with their text.
    active: Vec<(usize, String)>,
    depth: usize,
}

impl<'r> SyntaxParser<'r> {
    pub fn new(registry: &'r SyntaxRegistry, options: ParserOptions) -> Self {
        Self {
            registry,
            recent: RecentLists::new(options.recent_capacity),
            options,
            diagnostics: Diagnostics::new(),
            state: ParserState::new(),
            active: Vec::new(),
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'r SyntaxRegistry {
        self.registry
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ParserState {
        &mut self.state
    }

    pub fn recent(&self) -> &RecentLists {
        &self.recent
    }

    /// Resolve against the `total` descriptors of `category` and return the
    /// earliest registered one that `attempt` accepts.
    ///
    /// Recent descriptors are tried first. A recent hit only spares the
    /// attempts on descriptors registered after it; earlier ones are still
    /// tried and take precedence, with the parser state rolled back to what
    /// they would have seen.
    fn resolve_first<T>(
        &mut self,
        category: Category,
        total: usize,
        mut attempt: impl FnMut(&mut Self, usize) -> Option<T>,
    ) -> Option<(usize, T)> {
        let order = self.recent.get(category).order(total);
        let base = self.state.clone();
        let mut best: Option<(usize, T)> = None;
        for index in order {
            let outranked = match &best {
                Some((winner, _)) if index > *winner => continue,
                Some(_) => Some(std::mem::replace(&mut self.state, base.clone())),
                None => None,
            };
            match attempt(self, index) {
                Some(found) => best = Some((index, found)),
                None => {
                    if let Some(state) = outranked {
                        self.state = state;
                    }
                }
            }
        }
        let (index, found) = best?;
        self.recent.get_mut(category).acknowledge(index);
        self.diagnostics.clear_logs();
        Some((index, found))
    }

    fn report(&mut self, err: ParseError) -> ParseError {
        let kind = if matches!(err, ParseError::Semantic { .. }) { ErrorKind::Semantic } else { ErrorKind::NoMatch };
        self.diagnostics.error(err.to_string(), kind);
        err
    }

    fn semantic(&mut self, message: String) {
        self.diagnostics.error(message, ErrorKind::Semantic);
    }

    /// Run `f` one nesting level down.
    fn nested<T>(&mut self, text: &str, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= self.options.max_depth {
            return Err(self.report(ParseError::semantic(format!("'{text}' is nested too deeply"))));
        }
        self.diagnostics.recurse();
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        self.diagnostics.callback();
        result
    }

    // --- Expressions ----------------------------------------------------------

    pub fn parse_expression(&mut self, text: &str, expected: PatternType) -> Result<Box<dyn Expression>, ParseError> {
        let text = strip_enclosing_parentheses(text);
        if text.is_empty() {
            return Err(self.report(ParseError::no_match("expression", text)));
        }

        if let Some(literal) = self.parse_literal(text, expected.ty) {
            return Ok(literal);
        }

        if let Some(variable) = self.registry.variables().parse_variable(text, expected) {
            if expected.single && !variable.is_single() {
                return Err(self.report(ParseError::semantic(format!(
                    "{text} is a list variable, but a single value is expected here"
                ))));
            }
            return Ok(variable);
        }

        if !expected.single {
            let checkpoint = self.diagnostics.checkpoint();
            match self.parse_list_literal(text, expected) {
                Ok(list) => return Ok(list),
                Err(_) => self.diagnostics.forget_since(checkpoint),
            }
        }

        self.parse_registered(text, expected, None)
    }

    /// Try every literal parser whose type is assignable or convertible to
    /// `expected`, in type registration order.
    pub fn parse_literal(&self, text: &str, expected: TypeId) -> Option<Box<dyn Expression>> {
        let types = self.registry.types();
        for info in types.iter() {
            let Some(parser) = info.literal else {
                continue;
            };
            let converter = if types.is_assignable(info.id, expected) {
                None
            } else {
                match types.converter(info.id, expected) {
                    Some(converter) => Some(converter),
                    None => continue,
                }
            };
            let Some(value) = parser(text) else {
                continue;
            };
            let literal = match converter {
                None => Literal::single(value, info.id),
                Some(convert) => match convert(&value) {
                    Some(converted) => Literal::single(converted, expected),
                    None => continue,
                },
            };
            return Some(Box::new(literal));
        }
        None
    }

    /// `a, b and c` / `a or b`, each element resolved one level down.
    pub fn parse_list_literal(&mut self, text: &str, expected: PatternType) -> Result<Box<dyn Expression>, ParseError> {
        let Some(split) = split_list(text).filter(|s| s.elements.len() > 1) else {
            return Err(ParseError::no_match("list", text));
        };
        let and = split.is_and_list();

        let mut items = Vec::with_capacity(split.elements.len());
        for element in split.elements {
            items.push(self.nested(element, |p| p.parse_expression(element, expected))?);
        }

        let types: Vec<TypeId> = items.iter().map(|e| e.return_type()).collect();
        let ty = self.registry.types().common_supertype(&types);
        if items.iter().all(|e| e.is_literal()) {
            let values = items.iter().flat_map(|e| e.literal_values().unwrap_or_default().iter().cloned()).collect();
            return Ok(Box::new(Literal::list(values, ty, and)));
        }
        Ok(Box::new(ExpressionList::new(items, ty, and)))
    }

    /// Resolve the text of an expression slot.
    pub(crate) fn parse_nested(&mut self, text: &str, expected: PatternType) -> Result<Box<dyn Expression>, ParseError> {
        self.nested(text, |p| {
            if expected.single && expected.ty == TypeId::BOOLEAN {
                p.parse_boolean_expression(text, ConditionalPolicy::MaybeConditional)
            } else {
                p.parse_expression(text, expected)
            }
        })
    }

    pub fn parse_boolean_expression(
        &mut self,
        text: &str,
        policy: ConditionalPolicy,
    ) -> Result<Box<dyn Expression>, ParseError> {
        let text = strip_enclosing_parentheses(text);
        if text.is_empty() {
            return Err(self.report(ParseError::no_match("expression", text)));
        }
        let expected = PatternType::single(TypeId::BOOLEAN);

        if let Some(literal) = self.parse_literal(text, TypeId::BOOLEAN) {
            if policy == ConditionalPolicy::Conditional {
                return Err(self.report(ParseError::semantic(format!(
                    "'{text}' is a constant and cannot be used as a condition"
                ))));
            }
            return Ok(literal);
        }

        if let Some(variable) = self.registry.variables().parse_variable(text, expected) {
            if !variable.is_single() {
                return Err(self.report(ParseError::semantic(format!(
                    "{text} is a list variable and cannot be used as a boolean"
                ))));
            }
            if policy == ConditionalPolicy::Conditional {
                return Err(self.report(ParseError::semantic(format!(
                    "{text} is a variable and cannot be used as a condition"
                ))));
            }
            return Ok(variable);
        }

        self.parse_registered(text, expected, Some(policy))
    }

    fn parse_registered(
        &mut self,
        text: &str,
        expected: PatternType,
        policy: Option<ConditionalPolicy>,
    ) -> Result<Box<dyn Expression>, ParseError> {
        let registry = self.registry;
        let types = registry.types();
        let expressions = registry.expressions();

        let resolved = self.resolve_first(Category::Expression, expressions.len(), |p, index| {
            let info = &expressions[index];
            let returns = info.return_type().ty;
            if policy.is_some() && returns != TypeId::BOOLEAN {
                return None;
            }
            if !types.is_assignable(returns, expected.ty) && !types.converter_exists(returns, expected.ty) {
                return None;
            }
            if p.active.iter().any(|(i, t)| *i == index && t == text) {
                return None;
            }

            p.active.push((index, text.to_string()));
            let checkpoint = p.diagnostics.checkpoint();
            let found = p.match_expression_info(info, text, expected, policy);
            p.active.pop();
            if found.is_none() {
                p.diagnostics.forget_since(checkpoint);
            }
            found
        });

        match resolved {
            Some((index, expression)) => {
                let name = expressions[index].name();
                debug!(descriptor = name, "resolved '{text}' as {}", expression.describe(self.options.debug));
                Ok(expression)
            }
            None => {
                trace!(?expected, "no expression matches '{text}'");
                Err(self.report(ParseError::no_match("expression", text)))
            }
        }
    }

    fn match_expression_info(
        &mut self,
        info: &ExpressionInfo,
        text: &str,
        expected: PatternType,
        policy: Option<ConditionalPolicy>,
    ) -> Option<Box<dyn Expression>> {
        let types = self.registry.types();

        for (pattern_index, pattern) in info.patterns().iter().enumerate() {
            let Some(found) = self.match_pattern(pattern, text) else {
                continue;
            };
            let mut expression = info.create();
            if !self.initialize(expression.as_mut(), found, pattern_index) {
                continue;
            }

            let returns = expression.return_type();
            if !types.is_assignable(returns, expected.ty) {
                match types.converter(returns, expected.ty) {
                    Some(converter) => {
                        expression = Box::new(ConvertedExpression::new(expression, expected.ty, converter));
                    }
                    None => {
                        self.semantic(format!("'{text}' is not {}", with_article(expected.ty)));
                        continue;
                    }
                }
            }

            if expected.single && !expression.is_single() {
                self.semantic(format!("'{text}' can hold several values, but only a single one is expected here"));
                continue;
            }

            match policy {
                Some(ConditionalPolicy::NotConditional) if expression.is_conditional() => {
                    self.semantic(format!("the condition '{text}' cannot be used as a boolean value"));
                    continue;
                }
                Some(ConditionalPolicy::Conditional) if !expression.is_conditional() => {
                    self.semantic(format!("'{text}' is not a condition"));
                    continue;
                }
                _ => {}
            }

            if !self.state.expression_allowed(info.name()) {
                self.semantic(format!("{} cannot be used here", info.name()));
                continue;
            }

            return Some(expression);
        }
        None
    }

    fn match_pattern(&mut self, pattern: &PatternNode, text: &str) -> Option<PatternMatch> {
        let mut ctx = MatchContext::new(self, text);
        let end = ctx.match_full(pattern)?;
        Some(ctx.into_match(end))
    }

    /// Hand a match to `init`. Messages of a failed init become semantic errors.
    fn initialize<E: SyntaxElement + ?Sized>(&mut self, element: &mut E, found: PatternMatch, pattern: usize) -> bool {
        let registry = self.registry;
        let mut ctx = InitContext::new(found, pattern, &mut self.state, registry.types());
        match element.init(&mut ctx) {
            Ok(()) => true,
            Err(err) => {
                if let Some(message) = err.message {
                    self.diagnostics.error(message, ErrorKind::Semantic);
                }
                false
            }
        }
    }

    /// Try each pattern of a statement-level descriptor.
    fn match_syntax<T: SyntaxElement + ?Sized>(&mut self, info: &SyntaxInfo<T>, text: &str) -> Option<Box<T>> {
        for (pattern_index, pattern) in info.patterns().iter().enumerate() {
            let Some(found) = self.match_pattern(pattern, text) else {
                continue;
            };
            let mut element = info.create();
            if self.initialize(element.as_mut(), found, pattern_index) {
                return Some(element);
            }
        }
        None
    }

    /// Match an effect or section header and check the enclosing section
    /// allows it. A disallowed match stays reported as a semantic error.
    fn match_statement<T: SyntaxElement + ?Sized>(&mut self, info: &SyntaxInfo<T>, text: &str) -> Option<Box<T>> {
        let checkpoint = self.diagnostics.checkpoint();
        let Some(element) = self.match_syntax(info, text) else {
            self.diagnostics.forget_since(checkpoint);
            return None;
        };
        if !self.state.statement_allowed(info.name()) {
            self.semantic(format!("{} cannot be used here", info.name()));
            return None;
        }
        Some(element)
    }

    // --- Statements and sections -----------------------------------------------

    pub fn parse_statement(&mut self, text: &str) -> Result<Box<dyn Effect>, ParseError> {
        let text = text.trim();

        if let Some(condition) = strip_prefix_ignore_case(text, "continue if ") {
            if !self.state.statement_allowed(INLINE_CONDITION) {
                return Err(self.report(ParseError::semantic(format!("{INLINE_CONDITION} cannot be used here"))));
            }
            let condition = self.parse_boolean_expression(condition, ConditionalPolicy::Conditional)?;
            self.diagnostics.clear_logs();
            return Ok(Box::new(InlineCondition::new(condition)));
        }

        let registry = self.registry;
        let effects = registry.effects();
        let resolved =
            self.resolve_first(Category::Effect, effects.len(), |p, index| p.match_statement(&effects[index], text));
        match resolved {
            Some((index, effect)) => {
                let name = effects[index].name();
                debug!(descriptor = name, "resolved '{text}' as {}", effect.describe(self.options.debug));
                Ok(effect)
            }
            None => Err(self.report(ParseError::no_match("effect", text))),
        }
    }

    /// Resolve a section header and load its body with the section pushed on
    /// the parser state.
    pub fn parse_section(&mut self, section: &FileSection) -> Result<Element, ParseError> {
        let header = section.header();
        let registry = self.registry;
        let sections = registry.sections();

        let resolved =
            self.resolve_first(Category::Section, sections.len(), |p, index| p.match_statement(&sections[index], header));
        let Some((index, code)) = resolved else {
            return Err(self.report(ParseError::no_match("section", header)));
        };
        let name = sections[index].name();
        debug!(descriptor = name, "resolved section '{header}' as {}", code.describe(self.options.debug));

        self.state.enter_section(name, code.allowed_syntaxes());
        let body = self.load_items(section.elements());
        self.state.leave_section();
        Ok(Element::Section { section: code, body })
    }

    /// Resolve a body element by element. Failed elements are reported (one
    /// diagnostic per line) and skipped.
    pub fn load_items(&mut self, elements: &[FileElement]) -> Vec<Element> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            self.state.begin_element();
            let (result, line) = match element {
                FileElement::Line(line) if line.content.trim().is_empty() => continue,
                FileElement::Line(line) => (self.parse_statement(&line.content).map(Element::Statement), line),
                FileElement::Section(section) => (self.parse_section(section), section.line()),
            };
            self.state.end_element();
            match result {
                Ok(item) => items.push(item),
                Err(err) => trace!(line = line.line, "skipped: {err}"),
            }
            self.diagnostics.finish_line(line);
        }
        items
    }

    // --- Triggers ---------------------------------------------------------------------

    /// Resolve an event header and build its trigger from the body.
    pub fn parse_trigger(&mut self, section: &FileSection) -> Result<Trigger, ParseError> {
        self.state.reset();
        let header = section.header();
        let registry = self.registry;
        let events = registry.events();

        let resolved = self.resolve_first(Category::Event, events.len(), |p, index| {
            let checkpoint = p.diagnostics.checkpoint();
            let event = p.match_syntax(&events[index], header);
            if event.is_none() {
                p.diagnostics.forget_since(checkpoint);
            }
            event
        });
        let Some((index, event)) = resolved else {
            return Err(self.report(ParseError::no_match("event", header)));
        };
        let name = events[index].name();
        debug!(descriptor = name, "resolved trigger '{header}'");

        let body = self.load_items(section.elements());
        let trigger = Trigger::new(name, event, section.line().clone());
        trigger.set_items(TriggerBuilder::flatten(body))?;
        Ok(trigger)
    }

    /// Resolve every trigger of a script, reporting failed headers.
    pub fn load_script(&mut self, sections: &[FileSection]) -> Vec<Trigger> {
        let mut triggers = Vec::with_capacity(sections.len());
        for section in sections {
            match self.parse_trigger(section) {
                Ok(trigger) => triggers.push(trigger),
                Err(err) => trace!(line = section.line().line, "skipped trigger: {err}"),
            }
            self.diagnostics.finish_line(section.line());
        }
        triggers
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn with_article(ty: TypeId) -> String {
    let name = ty.name();
    let article = if name.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
    format!("{article} {name}")
}
