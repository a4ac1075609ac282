//! Parse-time state: enclosing sections, restrictions and conditional chains.

/// Identifies an `if` / `else if` / `else` chain within a firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u32);

/// Names of the statements (and optionally expressions) a section allows in
/// its body. Literals and variables are always allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxRestriction {
    allowed: Vec<&'static str>,
    restrict_expressions: bool,
}

impl SyntaxRestriction {
    pub fn only(names: &[&'static str]) -> Self {
        Self { allowed: names.to_vec(), restrict_expressions: false }
    }

    /// Also restrict registered expressions to the allowed names.
    pub fn restricting_expressions(mut self) -> Self {
        self.restrict_expressions = true;
        self
    }

    pub fn allows(&self, name: &str) -> bool {
        self.allowed.iter().any(|n| *n == name)
    }
}

#[derive(Debug, Clone, Default)]
struct Frame {
    section: Option<&'static str>,
    restriction: Option<SyntaxRestriction>,
    chain: Option<ChainId>,
    chain_touched: bool,
    /// A default branch was placed directly in this section.
    has_default: bool,
}

/// Stack of the sections enclosing the element being resolved.
///
/// The bottom frame is the trigger body itself and is never popped.
#[derive(Debug, Clone)]
pub struct ParserState {
    frames: Vec<Frame>,
    next_chain: u32,
}

impl Default for ParserState {
    fn default() -> Self {
        Self { frames: vec![Frame::default()], next_chain: 0 }
    }
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    fn top(&self) -> &Frame {
        // The root frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn enter_section(&mut self, name: &'static str, restriction: Option<SyntaxRestriction>) {
        self.frames.push(Frame { section: Some(name), restriction, ..Frame::default() });
    }

    pub fn leave_section(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Innermost enclosing section.
    pub fn current_section(&self) -> Option<&'static str> {
        self.top().section
    }

    /// Whether any enclosing section has the given descriptor name.
    pub fn is_inside(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.section == Some(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Statements are checked against the innermost restriction only.
    pub fn statement_allowed(&self, name: &str) -> bool {
        self.top().restriction.as_ref().is_none_or(|r| r.allows(name))
    }

    pub fn expression_allowed(&self, name: &str) -> bool {
        self.top().restriction.as_ref().is_none_or(|r| !r.restrict_expressions || r.allows(name))
    }

    /// Start a new conditional chain at the current level.
    pub fn open_chain(&mut self) -> ChainId {
        let id = ChainId(self.next_chain);
        self.next_chain += 1;
        let frame = self.top_mut();
        frame.chain = Some(id);
        frame.chain_touched = true;
        id
    }

    /// Extend the chain opened by the previous sibling, if any.
    pub fn continue_chain(&mut self) -> Option<ChainId> {
        let frame = self.top_mut();
        frame.chain_touched = true;
        frame.chain
    }

    /// End the chain opened by the previous sibling, if any.
    pub fn close_chain(&mut self) -> Option<ChainId> {
        let frame = self.top_mut();
        frame.chain_touched = true;
        frame.chain.take()
    }

    /// Whether the innermost section already holds a default branch.
    pub fn has_default(&self) -> bool {
        self.top().has_default
    }

    pub fn set_default(&mut self) {
        self.top_mut().has_default = true;
    }

    pub(crate) fn begin_element(&mut self) {
        self.top_mut().chain_touched = false;
    }

    /// A sibling that neither opened nor continued a chain breaks it.
    pub(crate) fn end_element(&mut self) {
        let frame = self.top_mut();
        if !frame.chain_touched {
            frame.chain = None;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.frames.truncate(1);
        self.frames[0] = Frame::default();
    }
}
