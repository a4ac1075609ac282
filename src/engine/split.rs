//! Text splitting helpers: enclosing parentheses and list literals.
//!
//! Both helpers only look at the top nesting level: separators inside
//! parentheses, variable braces or string quotes never count.

/// Index of the `)` closing the `(` at `open`, skipping quotes and braces.
pub(crate) fn closing_parenthesis(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut braces = 0usize;
    let mut quoted = false;
    for (i, c) in text[open..].char_indices() {
        match c {
            '"' => quoted = !quoted,
            _ if quoted => {}
            '{' => braces += 1,
            '}' => braces = braces.saturating_sub(1),
            _ if braces > 0 => {}
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip one layer of parentheses when they enclose the whole text.
pub(crate) fn strip_enclosing_parentheses(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with('(') && closing_parenthesis(text, 0) == Some(text.len() - 1) {
        text[1..text.len() - 1].trim()
    } else {
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    Comma,
    And,
    Or,
    Nor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListSplit<'a> {
    pub elements: Vec<&'a str>,
    pub separators: Vec<Separator>,
}

impl ListSplit<'_> {
    /// A list is an OR-list iff it has an `or` and no `and`/`nor`.
    pub fn is_and_list(&self) -> bool {
        let has_or = self.separators.contains(&Separator::Or);
        let has_and = self.separators.iter().any(|s| matches!(s, Separator::And | Separator::Nor));
        !has_or || has_and
    }
}

/// Split `text` on top-level `,`, `and`, `or` and `nor`.
///
/// Returns `None` when an element would be empty (`1,,2`, a trailing comma).
/// A comma directly followed by a word separator (`a, b, and c`) counts once.
pub(crate) fn split_list(text: &str) -> Option<ListSplit<'_>> {
    let mut elements = Vec::new();
    let mut separators = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    let mut skip_until = 0;

    for (i, c) in text.char_indices() {
        if i < skip_until {
            continue;
        }
        match c {
            '"' => quoted = !quoted,
            _ if quoted => {}
            '(' | '{' => depth += 1,
            ')' | '}' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            ',' => {
                push_element(&mut elements, &mut separators, &text[start..i], Separator::Comma)?;
                start = i + 1;
            }
            c if c.is_whitespace() => {
                let Some(caps) = regex!(r"(?i)^\s+(and|or|nor)\s+").captures(&text[i..]) else {
                    continue;
                };
                let separator = match caps[1].to_ascii_lowercase().as_str() {
                    "and" => Separator::And,
                    "or" => Separator::Or,
                    _ => Separator::Nor,
                };
                let element = &text[start..i];
                if element.trim().is_empty() && separators.last() == Some(&Separator::Comma) {
                    // Oxford comma: the word replaces the comma before it.
                    separators.pop();
                    separators.push(separator);
                } else {
                    push_element(&mut elements, &mut separators, element, separator)?;
                }
                let end = i + caps.get(0).map_or(0, |m| m.end());
                start = end;
                skip_until = end;
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if last.is_empty() {
        return if separators.is_empty() { Some(ListSplit { elements, separators }) } else { None };
    }
    elements.push(last);
    Some(ListSplit { elements, separators })
}

fn push_element<'a>(
    elements: &mut Vec<&'a str>,
    separators: &mut Vec<Separator>,
    element: &'a str,
    separator: Separator,
) -> Option<()> {
    let element = element.trim();
    if element.is_empty() {
        return None;
    }
    elements.push(element);
    separators.push(separator);
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_only_fully_enclosing_parentheses() {
        assert_eq!(strip_enclosing_parentheses(" (1 + 2) "), "1 + 2");
        assert_eq!(strip_enclosing_parentheses("(a) and (b)"), "(a) and (b)");
        assert_eq!(strip_enclosing_parentheses("((x))"), "(x)");
        assert_eq!(strip_enclosing_parentheses("(\")\")"), "\")\"");
        assert_eq!(strip_enclosing_parentheses("(open"), "(open");
    }

    #[test]
    fn splits_top_level_separators() {
        let split = split_list("1, 2 and 3").unwrap();
        assert_eq!(split.elements, vec!["1", "2", "3"]);
        assert_eq!(split.separators, vec![Separator::Comma, Separator::And]);
        assert!(split.is_and_list());

        let split = split_list("\"a, b\" or (c and d) or {x and y}").unwrap();
        assert_eq!(split.elements, vec!["\"a, b\"", "(c and d)", "{x and y}"]);
        assert!(!split.is_and_list());
    }

    #[test]
    fn list_kind_rules() {
        let cases: Vec<(bool, &str)> = vec![
            (true, "a, b"),
            (false, "a, b or c"),
            (true, "a or b and c"),
            (true, "a nor b"),
            (false, "a OR b"),
        ];
        for (and, input) in cases {
            assert_eq!(split_list(input).unwrap().is_and_list(), and, "input: {input}");
        }
    }

    #[test]
    fn oxford_comma_counts_once() {
        let split = split_list("a, b, and c").unwrap();
        assert_eq!(split.elements, vec!["a", "b", "c"]);
        assert_eq!(split.separators, vec![Separator::Comma, Separator::And]);
    }

    #[test]
    fn empty_elements_are_rejected() {
        assert_eq!(split_list("1,,2"), None);
        assert_eq!(split_list("1, 2,"), None);
        assert_eq!(split_list("single").unwrap().elements, vec!["single"]);
        assert_eq!(split_list("band orchestra").unwrap().elements, vec!["band orchestra"]);
    }
}
