//! Pattern compilation.
//!
//! A pattern is the human-readable surface syntax of a registered element,
//! for example `set %~objects% to %objects%`. Compilation turns it into an
//! immutable [`PatternNode`] tree once, at registration time; the matcher
//! (`matcher.rs`) then walks that tree for every resolution attempt.
//!
//! ## Grammar
//!
//! ```text
//! plain text        Text, matched case-insensitively
//! [ ... ]           Optional
//! ( a | b )         Choice, alternatives tried in declared order
//! N¦alt  N:alt      alternative carrying the integer mark N (default 0)
//! <regex>           Regex, anchored at the cursor
//! %types%           ExpressionSlot, `/`-separated type names
//!   %-...%            plural expressions allowed
//!   %*...% %~...%     literals only / non-literals only
//!   %...@N%           explicit slot index (default: left-to-right ordinal)
//! \x                escapes x
//! a|b (top level)   Choice over the whole pattern
//! ```
//!
//! ## Invariants
//!
//! - Adjacent literal characters are merged into a single `Text` node.
//! - A `( ... )` group always compiles to a `Choice`, even with one branch;
//!   a `[ ... ]` group compiles to an `Optional` of its only branch, or of a
//!   `Choice` when it has several branches or a non-zero mark.

use std::fmt;

use regex::Regex;

use crate::error::PatternError;
use crate::types::{PatternType, TypeRegistry};

bitflags::bitflags! {
    /// Which kinds of expressions an expression slot accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Acceptance: u8 {
        const LITERALS    = 1 << 0;
        const EXPRESSIONS = 1 << 1;
        const BOTH        = Self::LITERALS.bits() | Self::EXPRESSIONS.bits();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternNode {
    Text(String),
    Optional(Box<PatternNode>),
    Choice(Vec<ChoiceAlternative>),
    Regex(RegexPattern),
    Expression(ExpressionSlot),
    Sequence(Vec<PatternNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceAlternative {
    pub node: PatternNode,
    pub mark: i32,
}

impl ChoiceAlternative {
    pub fn new(node: PatternNode, mark: i32) -> Self {
        Self { node, mark }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionSlot {
    pub types: Vec<PatternType>,
    pub plural_allowed: bool,
    pub index: usize,
    pub acceptance: Acceptance,
}

/// A regex fragment of a pattern. Two fragments are equal when their sources are.
#[derive(Clone)]
pub struct RegexPattern {
    source: String,
    regex: Regex,
}

impl RegexPattern {
    pub fn new(source: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|e| PatternError::InvalidRegex { source_text: source.to_string(), message: e.to_string() })?;
        Ok(Self { source: source.to_string(), regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the whole of `text` is matched.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegexPattern").field(&self.source).finish()
    }
}

/// Compile `pattern` against the type names known to `types`.
pub fn compile(pattern: &str, types: &TypeRegistry) -> Result<PatternNode, PatternError> {
    if pattern.trim().is_empty() {
        return Err(PatternError::Empty);
    }
    let mut compiler = Compiler { chars: pattern.char_indices().collect(), len: pattern.len(), pos: 0, ordinal: 0, types };
    let alternatives = compiler.alternatives(None)?;
    Ok(collapse_alternatives(alternatives))
}

// --- Compiler ----------------------------------------------------------------

struct Compiler<'a> {
    chars: Vec<(usize, char)>,
    len: usize,
    pos: usize,
    ordinal: usize,
    types: &'a TypeRegistry,
}

impl Compiler<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    /// Byte offset of the current character.
    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |(i, _)| *i)
    }

    /// Parse `|`-separated alternatives up to `close` (or the end of input
    /// when `close` is `None`). `close` carries the opening char and offset.
    fn alternatives(&mut self, close: Option<(char, char, usize)>) -> Result<Vec<ChoiceAlternative>, PatternError> {
        let mut alternatives = Vec::new();
        loop {
            let mark = self.mark_prefix();
            let node = self.sequence()?;
            alternatives.push(ChoiceAlternative { node, mark });
            match (self.peek(), close) {
                (Some('|'), _) => self.pos += 1,
                (Some(c), Some((_, expected, _))) if c == expected => {
                    self.pos += 1;
                    return Ok(alternatives);
                }
                (Some(c), _) => return Err(PatternError::Unbalanced { close: c, position: self.offset() }),
                (None, Some((open, _, position))) => return Err(PatternError::Unclosed { open, position }),
                (None, None) => return Ok(alternatives),
            }
        }
    }

    /// `N¦` or `N:` at the start of an alternative.
    fn mark_prefix(&mut self) -> i32 {
        let mut end = self.pos;
        if self.chars.get(end).is_some_and(|(_, c)| *c == '-') {
            end += 1;
        }
        let digits_start = end;
        while self.chars.get(end).is_some_and(|(_, c)| c.is_ascii_digit()) {
            end += 1;
        }
        if end == digits_start || !self.chars.get(end).is_some_and(|(_, c)| matches!(c, '¦' | ':')) {
            return 0;
        }
        let digits: String = self.chars[self.pos..end].iter().map(|(_, c)| *c).collect();
        match digits.parse::<i32>() {
            Ok(mark) => {
                self.pos = end + 1;
                mark
            }
            Err(_) => 0,
        }
    }

    fn sequence(&mut self) -> Result<PatternNode, PatternError> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        while let Some(c) = self.peek() {
            match c {
                '|' | ')' | ']' => break,
                '\\' => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or(PatternError::TrailingEscape)?;
                    text.push(escaped);
                    self.pos += 1;
                }
                '[' => {
                    flush_text(&mut text, &mut nodes);
                    let position = self.offset();
                    self.pos += 1;
                    let alternatives = self.alternatives(Some(('[', ']', position)))?;
                    nodes.push(PatternNode::Optional(Box::new(collapse_alternatives(alternatives))));
                }
                '(' => {
                    flush_text(&mut text, &mut nodes);
                    let position = self.offset();
                    self.pos += 1;
                    let alternatives = self.alternatives(Some(('(', ')', position)))?;
                    nodes.push(PatternNode::Choice(alternatives));
                }
                '<' => {
                    flush_text(&mut text, &mut nodes);
                    let source = self.regex_source()?;
                    nodes.push(PatternNode::Regex(RegexPattern::new(&source)?));
                }
                '>' => return Err(PatternError::Unbalanced { close: '>', position: self.offset() }),
                '%' => {
                    flush_text(&mut text, &mut nodes);
                    let slot = self.slot()?;
                    nodes.push(PatternNode::Expression(slot));
                }
                _ => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        flush_text(&mut text, &mut nodes);
        Ok(match nodes.len() {
            1 => nodes.remove(0),
            _ => PatternNode::Sequence(nodes),
        })
    }

    /// Read a `<...>` group, honoring nested angle brackets and escapes.
    fn regex_source(&mut self) -> Result<String, PatternError> {
        let position = self.offset();
        self.pos += 1;
        let mut depth = 1;
        let mut source = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    source.push(c);
                    if let Some(next) = self.peek() {
                        source.push(next);
                        self.pos += 1;
                    }
                }
                '<' => {
                    depth += 1;
                    source.push(c);
                }
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(source);
                    }
                    source.push(c);
                }
                _ => source.push(c),
            }
        }
        Err(PatternError::Unclosed { open: '<', position })
    }

    fn slot(&mut self) -> Result<ExpressionSlot, PatternError> {
        let position = self.offset();
        self.pos += 1;
        let mut content = String::new();
        loop {
            match self.peek() {
                Some('%') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    content.push(c);
                    self.pos += 1;
                }
                None => return Err(PatternError::Unclosed { open: '%', position }),
            }
        }
        let malformed = || PatternError::MalformedSlot { content: content.clone(), position };

        let mut plural_allowed = false;
        let mut acceptance = Acceptance::BOTH;
        let mut rest = content.as_str();
        loop {
            if let Some(r) = rest.strip_prefix('-') {
                plural_allowed = true;
                rest = r;
            } else if let Some(r) = rest.strip_prefix('*') {
                acceptance &= Acceptance::LITERALS;
                rest = r;
            } else if let Some(r) = rest.strip_prefix('~') {
                acceptance &= Acceptance::EXPRESSIONS;
                rest = r;
            } else {
                break;
            }
        }
        if acceptance.is_empty() {
            return Err(malformed());
        }

        let (names, index) = match rest.split_once('@') {
            Some((names, index)) => (names, Some(index.trim().parse::<usize>().map_err(|_| malformed())?)),
            None => (rest, None),
        };
        if names.trim().is_empty() {
            return Err(malformed());
        }
        let types = names
            .split('/')
            .map(|name| {
                self.types.pattern_type(name).ok_or_else(|| PatternError::UnknownType { name: name.trim().to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ordinal = self.ordinal;
        self.ordinal += 1;
        Ok(ExpressionSlot { types, plural_allowed, index: index.unwrap_or(ordinal), acceptance })
    }
}

fn flush_text(text: &mut String, nodes: &mut Vec<PatternNode>) {
    if !text.is_empty() {
        nodes.push(PatternNode::Text(std::mem::take(text)));
    }
}

fn collapse_alternatives(mut alternatives: Vec<ChoiceAlternative>) -> PatternNode {
    if alternatives.len() == 1 && alternatives[0].mark == 0 {
        alternatives.remove(0).node
    } else {
        PatternNode::Choice(alternatives)
    }
}
