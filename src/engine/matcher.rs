//! Pattern matching.
//!
//! Matching walks a compiled [`PatternNode`] tree against candidate text with
//! explicit continuations. Only expression slots and regex fragments retry
//! shorter ends when the rest of the pattern fails. Optional groups and
//! choices are matched on their own and commit to their first local success.
//!
//! ```text
//! walk(node, pos, next)
//!   Text       ── literal at pos ─────────────────────▶ resume(end, next)
//!   Optional   ── walk(child, pos, Group) or pos ─────▶ resume(end, next)
//!   Choice     ── first alt with walk(alt, pos, Group) ▶ resume(end, next)
//!   Regex      ── for end (longest first): regex == text[pos..end]
//!   Expression ── for end (longest first): resolve text[pos..end] ── resume
//!   Sequence   ── resume(pos, children ++ next)
//! ```
//!
//! ## Invariants
//!
//! - A failing branch restores captures, regex captures and the mark to their
//!   state on entry.
//! - Expression slots are resolved through the owning [`SyntaxParser`], one
//!   nesting level down, so type-directed resolution applies recursively.
//! - Matching never panics on any input.

use super::pattern::{Acceptance, ExpressionSlot, PatternNode};
use super::resolver::SyntaxParser;
use crate::lang::Expression;
use crate::types::PatternType;

/// Result of a successful match.
#[derive(Debug)]
pub struct PatternMatch {
    /// Resolved slot expressions with their slot index, in match order.
    pub captures: Vec<(usize, Box<dyn Expression>)>,
    /// Text matched by each regex fragment, in match order.
    pub regex_matches: Vec<String>,
    /// Bitwise OR of the marks of every chosen alternative.
    pub mark: i32,
    pub end: usize,
}

/// The rest of the pattern still to be matched after the current node.
enum Cont<'a> {
    Done,
    /// End of an optional group or choice alternative; accepts any position.
    Group,
    Then(&'a [PatternNode], &'a Cont<'a>),
}

/// Up to `limit` nodes still to be matched, in order.
fn upcoming<'a>(mut cont: &'a Cont<'a>, limit: usize) -> Vec<&'a PatternNode> {
    let mut nodes = Vec::with_capacity(limit);
    loop {
        match cont {
            Cont::Done | Cont::Group => return nodes,
            Cont::Then(rest, tail) => {
                for node in rest.iter() {
                    if nodes.len() == limit {
                        return nodes;
                    }
                    nodes.push(node);
                }
                cont = tail;
            }
        }
    }
}

fn ends_inside_group(mut cont: &Cont<'_>) -> bool {
    loop {
        match cont {
            Cont::Done => return false,
            Cont::Group => return true,
            Cont::Then(_, tail) => cont = tail,
        }
    }
}

/// Texts a node necessarily starts with, one per way of matching it.
fn leading_texts(node: &PatternNode) -> Option<Vec<String>> {
    match node {
        PatternNode::Text(text) => Some(vec![text.clone()]),
        PatternNode::Choice(alternatives) => {
            let mut texts = Vec::new();
            for alternative in alternatives {
                texts.extend(leading_texts(&alternative.node)?);
            }
            Some(texts)
        }
        PatternNode::Sequence(children) => leading_texts(children.first()?),
        _ => None,
    }
}

/// Literal prefixes one of which must match right after a slot. A
/// whitespace-only literal is joined with whatever literal follows it.
fn required_prefixes(nodes: &[&PatternNode]) -> Option<Vec<String>> {
    let (first, rest) = nodes.split_first()?;
    let heads = leading_texts(first)?;
    if !heads.iter().all(|h| h.trim().is_empty()) {
        return Some(heads);
    }
    match required_prefixes(rest) {
        Some(tails) => Some(heads.iter().flat_map(|h| tails.iter().map(move |t| format!("{h}{t}"))).collect()),
        None => Some(heads),
    }
}

type Checkpoint = (usize, usize, i32);

pub struct MatchContext<'a, 'r> {
    parser: &'a mut SyntaxParser<'r>,
    input: &'a str,
    captures: Vec<(usize, Box<dyn Expression>)>,
    regex_matches: Vec<String>,
    mark: i32,
    full: bool,
}

impl<'a, 'r> MatchContext<'a, 'r> {
    pub fn new(parser: &'a mut SyntaxParser<'r>, input: &'a str) -> Self {
        Self { parser, input, captures: Vec::new(), regex_matches: Vec::new(), mark: 0, full: false }
    }

    /// Match `node` from `start`, accepting any end position.
    pub fn match_at(&mut self, node: &PatternNode, start: usize) -> Option<usize> {
        if start > self.input.len() || !self.input.is_char_boundary(start) {
            return None;
        }
        self.full = false;
        self.walk(node, start, &Cont::Done)
    }

    /// Match `node` against the whole input.
    pub fn match_full(&mut self, node: &PatternNode) -> Option<usize> {
        self.full = true;
        self.walk(node, 0, &Cont::Done)
    }

    pub fn mark(&self) -> i32 {
        self.mark
    }

    pub fn captures(&self) -> &[(usize, Box<dyn Expression>)] {
        &self.captures
    }

    pub fn regex_matches(&self) -> &[String] {
        &self.regex_matches
    }

    pub fn into_match(self, end: usize) -> PatternMatch {
        PatternMatch { captures: self.captures, regex_matches: self.regex_matches, mark: self.mark, end }
    }

    fn save(&self) -> Checkpoint {
        (self.captures.len(), self.regex_matches.len(), self.mark)
    }

    fn restore(&mut self, (captures, regex_matches, mark): Checkpoint) {
        self.captures.truncate(captures);
        self.regex_matches.truncate(regex_matches);
        self.mark = mark;
    }

    fn resume(&mut self, pos: usize, cont: &Cont<'_>) -> Option<usize> {
        match cont {
            Cont::Done => (!self.full || pos == self.input.len()).then_some(pos),
            Cont::Group => Some(pos),
            Cont::Then(nodes, tail) => match nodes.split_first() {
                None => self.resume(pos, tail),
                Some((first, rest)) => self.walk(first, pos, &Cont::Then(rest, tail)),
            },
        }
    }

    /// Continue after a group that matched up to `end`, with no retry of the
    /// group itself.
    fn committed(&mut self, saved: Checkpoint, end: usize, next: &Cont<'_>) -> Option<usize> {
        let found = self.resume(end, next);
        if found.is_none() {
            self.restore(saved);
        }
        found
    }

    fn walk(&mut self, node: &PatternNode, pos: usize, next: &Cont<'_>) -> Option<usize> {
        match node {
            PatternNode::Text(text) => {
                let end = match_text(self.input, pos, text)?;
                self.resume(end, next)
            }
            PatternNode::Optional(child) => {
                let saved = self.save();
                let end = match self.walk(child, pos, &Cont::Group) {
                    Some(end) => end,
                    None => {
                        self.restore(saved);
                        pos
                    }
                };
                self.committed(saved, end, next)
            }
            PatternNode::Choice(alternatives) => {
                for alternative in alternatives {
                    let saved = self.save();
                    self.mark |= alternative.mark;
                    if let Some(end) = self.walk(&alternative.node, pos, &Cont::Group) {
                        return self.committed(saved, end, next);
                    }
                    self.restore(saved);
                }
                None
            }
            PatternNode::Regex(regex) => {
                let input = self.input;
                let ends: Vec<usize> = (pos..=input.len()).rev().filter(|&i| input.is_char_boundary(i)).collect();
                for end in ends {
                    let candidate = &input[pos..end];
                    // Trailing whitespace belongs to the following literal.
                    if candidate.ends_with(char::is_whitespace) || !regex.matches(candidate) {
                        continue;
                    }
                    let saved = self.save();
                    self.regex_matches.push(candidate.to_string());
                    if let Some(found) = self.resume(end, next) {
                        return Some(found);
                    }
                    self.restore(saved);
                }
                None
            }
            PatternNode::Expression(slot) => {
                for end in self.slot_ends(pos, next) {
                    let fragment = self.input[pos..end].trim();
                    if fragment.is_empty() {
                        continue;
                    }
                    let Some(expression) = self.resolve_slot(slot, fragment) else {
                        continue;
                    };
                    let saved = self.save();
                    self.captures.push((slot.index, expression));
                    if let Some(found) = self.resume(end, next) {
                        return Some(found);
                    }
                    self.restore(saved);
                }
                None
            }
            PatternNode::Sequence(children) => self.resume(pos, &Cont::Then(children, next)),
        }
    }

    /// Candidate end positions for a slot starting at `pos`, longest first.
    ///
    /// When the slot is followed by literal text only the positions where that
    /// text matches are candidates; otherwise word boundaries and the end.
    fn slot_ends(&self, pos: usize, next: &Cont<'_>) -> Vec<usize> {
        let input = self.input;
        let boundaries = (pos + 1..=input.len()).rev().filter(|&i| input.is_char_boundary(i));
        let following = upcoming(next, 3);
        if let Some(prefixes) = required_prefixes(&following) {
            return boundaries.filter(|&i| prefixes.iter().any(|p| match_text(input, i, p).is_some())).collect();
        }
        if following.is_empty() && self.full && !ends_inside_group(next) {
            return if input.len() > pos { vec![input.len()] } else { Vec::new() };
        }
        boundaries.filter(|&i| i == input.len() || at_whitespace_boundary(input, i)).collect()
    }

    fn resolve_slot(&mut self, slot: &ExpressionSlot, fragment: &str) -> Option<Box<dyn Expression>> {
        for ty in &slot.types {
            let expected = PatternType { ty: ty.ty, single: ty.single && !slot.plural_allowed };
            let Ok(expression) = self.parser.parse_nested(fragment, expected) else {
                continue;
            };
            let wanted = if expression.is_literal() { Acceptance::LITERALS } else { Acceptance::EXPRESSIONS };
            if slot.acceptance.contains(wanted) {
                return Some(expression);
            }
            tracing::trace!(fragment, "slot rejected {} by acceptance {:?}", expression.describe(false), slot.acceptance);
        }
        None
    }
}

fn at_whitespace_boundary(input: &str, i: usize) -> bool {
    input[i..].starts_with(char::is_whitespace) || input[..i].ends_with(char::is_whitespace)
}

/// Match a pattern literal at `start`, returning the end position.
///
/// Letters compare case-insensitively. Whitespace in the literal matches a
/// run of input whitespace, or nothing at the start or end of the input or
/// right after whitespace.
pub(crate) fn match_text(input: &str, start: usize, literal: &str) -> Option<usize> {
    let mut pos = start;
    for expected in literal.chars() {
        if expected.is_whitespace() {
            let rest = &input[pos..];
            let skipped = rest.len() - rest.trim_start().len();
            if skipped == 0 && !(pos == 0 || pos == input.len() || input[..pos].ends_with(char::is_whitespace)) {
                return None;
            }
            pos += skipped;
        } else {
            let actual = input[pos..].chars().next()?;
            if actual != expected && !actual.to_lowercase().eq(expected.to_lowercase()) {
                return None;
            }
            pos += actual.len_utf8();
        }
    }
    Some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ParserOptions;
    use crate::engine::{SyntaxRegistry, compile};
    use proptest::prelude::*;

    fn match_prefix(pattern: &str, input: &str) -> Option<(usize, i32)> {
        let registry = SyntaxRegistry::default();
        let node = compile(pattern, registry.types()).unwrap();
        let mut parser = SyntaxParser::new(&registry, ParserOptions::default());
        let mut ctx = MatchContext::new(&mut parser, input);
        ctx.match_at(&node, 0).map(|end| (end, ctx.mark()))
    }

    fn match_whole(pattern: &str, input: &str) -> Option<PatternMatch> {
        let registry = SyntaxRegistry::default();
        let node = compile(pattern, registry.types()).unwrap();
        let mut parser = SyntaxParser::new(&registry, ParserOptions::default());
        let mut ctx = MatchContext::new(&mut parser, input);
        let end = ctx.match_full(&node)?;
        Some(ctx.into_match(end))
    }

    #[test]
    fn plain_text_match_length() {
        assert_eq!(match_prefix("pattern", "pattern"), Some((7, 0)));
        assert_eq!(match_prefix("pattern", "PATTERN matters"), Some((7, 0)));
        assert_eq!(match_prefix("pattern", "patter"), None);
    }

    #[test]
    fn every_choice_matches() {
        for input in ["you must choose", "you must this", "you must or this"] {
            assert_eq!(match_prefix("you must (choose|this|or this)", input).map(|(end, _)| end), Some(input.len()));
        }
    }

    #[test]
    fn marks_of_chosen_alternatives() {
        assert_eq!(match_prefix("I choose (1¦this|2¦that)", "I choose this"), Some((13, 1)));
        assert_eq!(match_prefix("I choose (1¦this|2¦that)", "I choose that"), Some((13, 2)));
        assert_eq!(match_prefix("(first mark|1:second mark)", "second mark").map(|(_, m)| m), Some(1));
        assert_eq!(match_prefix("(first mark|1:second mark)", "first mark").map(|(_, m)| m), Some(0));
        // Marks of successive choices combine.
        assert_eq!(match_prefix("(a|1:b) (c|2:d)", "b d").map(|(_, m)| m), Some(3));
    }

    #[test]
    fn failed_branches_do_not_leak_marks() {
        // `1:x y` fails on its second word, so its mark must not survive.
        assert_eq!(match_prefix("(1:x y|x z)", "x z").map(|(_, m)| m), Some(0));
    }

    #[test]
    fn groups_commit_to_their_first_local_match() {
        // The optional `a` consumes the only word, leaving nothing for the literal.
        assert!(match_whole("[a] a", "a").is_none());
        assert!(match_whole("[a] a", "a a").is_some());
        // `a` wins the choice, so `a b` is never tried.
        assert!(match_prefix("(a|1:a b) c", "a b c").is_none());
        assert_eq!(match_prefix("(1:a b|a) c", "a b c"), Some((5, 1)));
        assert_eq!(match_prefix("(1:a b|a) c", "a c"), Some((3, 0)));
    }

    #[test]
    fn slots_inside_groups_end_with_the_group() {
        let found = match_whole("[%number%] apples", "3 apples").unwrap();
        assert_eq!(found.captures[0].1.describe(false), "3");
        assert!(match_whole("[%number%] apples", "apples").is_some());
    }

    #[test]
    fn optional_groups_do_not_need_double_spaces() {
        assert!(match_whole("stop [the] trigger", "stop trigger").is_some());
        assert!(match_whole("stop [the] trigger", "stop the trigger").is_some());
        assert!(match_whole("[the] length", "length").is_some());
        assert!(match_whole("stop [the] trigger", "stoptrigger").is_none());
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert!(match_whole("wait a bit", "wait   a \t bit").is_some());
    }

    #[test]
    fn regex_fragments_backtrack_and_record_text() {
        let found = match_whole("say <.+> loudly", "say hello world loudly").unwrap();
        assert_eq!(found.regex_matches, vec!["hello world".to_string()]);
        assert!(found.captures.is_empty());
        assert!(match_whole("<[0-9]+>x", "12x").is_some());
        assert!(match_whole("<[0-9]+>", "12x").is_none());
    }

    #[test]
    fn slots_capture_literals_in_slot_order() {
        let found = match_whole("add %number% to %number%", "add 1.5 to 2").unwrap();
        let indices: Vec<usize> = found.captures.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(found.captures[0].1.describe(false), "1.5");
        assert_eq!(found.captures[1].1.describe(false), "2");
    }

    #[test]
    fn slot_acceptance_is_enforced() {
        assert!(match_whole("set %~objects% to %objects%", "set {x} to 5").is_some());
        assert!(match_whole("set %~objects% to %objects%", "set 4 to 5").is_none());
        assert!(match_whole("case %*objects%", "case {x}").is_none());
        assert!(match_whole("case %*objects%", "case 1, 2 or 3").is_some());
    }

    #[test]
    fn text_is_case_insensitive_beyond_ascii() {
        assert!(match_whole("ÉTÉ", "été").is_some());
    }

    const VOCABULARY: &[&str] =
        &["you", "must", "choose", "this", "or", "the", "red", "green", "big", "box", "a", "an", "apple", "go", "to"];
    const PATTERNS: &[&str] = &[
        "you must (choose|this|or this)",
        "[the] (red|green) [big] box",
        "a[n] (apple|box)",
        "go [to] (the|a) box",
        "(1:red|2:green) [the] <b[a-z]+>",
    ];

    proptest! {
        #[test]
        fn matched_prefix_matches_on_its_own(
            pattern in prop::sample::select(PATTERNS),
            words in prop::collection::vec(prop::sample::select(VOCABULARY), 0..8),
        ) {
            let text = words.join(" ");
            if let Some((end, _)) = match_prefix(pattern, &text) {
                let prefix = &text[..end];
                let whole = match_whole(pattern, prefix);
                prop_assert_eq!(whole.map(|m| m.end), Some(end));
            }
        }
    }
}
