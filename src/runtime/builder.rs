//! Flattening resolved element trees into item arrays.

use super::trigger::{Scope, ScopeId, ScopeSpan, TriggerBody, TriggerItem};
use crate::lang::{CodeSection, Effect};

/// A resolved body element, before flattening.
#[derive(Debug)]
pub enum Element {
    Statement(Box<dyn Effect>),
    Section { section: Box<dyn CodeSection>, body: Vec<Element> },
}

pub struct TriggerBuilder;

impl TriggerBuilder {
    /// Flatten `elements` depth-first. Each section becomes
    /// `ScopeStart(id)`, its flattened body, `ScopeEnd(id)`, with its span
    /// recorded in the scope arena under `id`.
    pub fn flatten(elements: Vec<Element>) -> TriggerBody {
        let mut items = Vec::new();
        let mut scopes: Vec<Scope> = Vec::new();
        let mut stack: Vec<(std::vec::IntoIter<Element>, Option<ScopeId>)> = vec![(elements.into_iter(), None)];

        loop {
            let Some((iter, scope)) = stack.last_mut() else {
                break;
            };
            let scope = *scope;
            match iter.next() {
                Some(Element::Statement(effect)) => items.push(TriggerItem::Statement(effect)),
                Some(Element::Section { section, body }) => {
                    let id = ScopeId(scopes.len());
                    let start = items.len();
                    items.push(TriggerItem::ScopeStart(id));
                    scopes.push(Scope { section, span: ScopeSpan { id, start, end: start } });
                    stack.push((body.into_iter(), Some(id)));
                }
                None => {
                    if let Some(id) = scope {
                        scopes[id.0].span.end = items.len();
                        items.push(TriggerItem::ScopeEnd(id));
                    }
                    stack.pop();
                }
            }
        }

        TriggerBody { items, scopes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InitError, RuntimeError};
    use crate::lang::{InitContext, SyntaxElement, TriggerContext};
    use crate::runtime::ExecutorState;

    struct Noop(&'static str);

    impl SyntaxElement for Noop {
        fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
            Ok(())
        }

        fn describe(&self, _debug: bool) -> String {
            self.0.to_string()
        }
    }

    impl Effect for Noop {
        fn execute(&self, _ctx: &mut TriggerContext, _state: &mut ExecutorState) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    impl CodeSection for Noop {
        fn enter(&self, _: &mut TriggerContext, _: &mut ExecutorState, _: ScopeSpan) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    fn statement(name: &'static str) -> Element {
        Element::Statement(Box::new(Noop(name)))
    }

    fn section(name: &'static str, body: Vec<Element>) -> Element {
        Element::Section { section: Box::new(Noop(name)), body }
    }

    fn shape(body: &TriggerBody) -> Vec<String> {
        body.items
            .iter()
            .map(|item| match item {
                TriggerItem::Statement(e) => e.describe(false),
                TriggerItem::ScopeStart(id) => format!("start {}", id.0),
                TriggerItem::ScopeEnd(id) => format!("end {}", id.0),
            })
            .collect()
    }

    #[test]
    fn nested_sections_are_bracketed_by_markers() {
        let body = TriggerBuilder::flatten(vec![
            statement("a"),
            section("outer", vec![statement("b"), section("inner", vec![statement("c")]), statement("d")]),
            section("empty", vec![]),
        ]);
        assert_eq!(
            shape(&body),
            vec!["a", "start 0", "b", "start 1", "c", "end 1", "d", "end 0", "start 2", "end 2"]
        );
        let spans: Vec<(usize, usize)> = body.scopes.iter().map(|s| (s.span.start, s.span.end)).collect();
        assert_eq!(spans, vec![(1, 7), (3, 5), (8, 9)]);
        assert_eq!(body.scope(ScopeId(1)).map(|s| s.section.describe(false)), Some("inner".to_string()));
    }
}
