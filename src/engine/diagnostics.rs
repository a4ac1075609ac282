//! Diagnostic sink.
//!
//! Resolution produces a lot of candidate noise: every descriptor that does
//! not match a line would otherwise report an error. The sink therefore keeps
//! errors *pending* at a recursion level and only reports one of them per
//! source line, once the line is done.
//!
//! ```text
//! error(msg, kind) ── pending[level] ─┬─ forget()/clear_logs()  (dropped)
//!                                     ├─ callback()              (semantic ones lifted one level)
//!                                     └─ finish_line(line)       (highest priority one reported)
//! ```
//!
//! Priority: `Semantic` beats `NoMatch`; ties go to the earliest entry.

use tracing::debug;

use crate::script::SourceLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// Nothing matched.
    NoMatch,
    /// Something matched but could not be used.
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub kind: ErrorKind,
    pub line: Option<SourceLine>,
}

#[derive(Debug, Clone)]
struct Pending {
    level: usize,
    message: String,
    kind: ErrorKind,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    level: usize,
    pending: Vec<Pending>,
    reported: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>, kind: ErrorKind) {
        let message = message.into();
        tracing::trace!(level = self.level, ?kind, "{message}");
        self.pending.push(Pending { level: self.level, message, kind });
    }

    /// Drop the most recent pending error of the current level.
    pub fn forget(&mut self) {
        if let Some(at) = self.pending.iter().rposition(|p| p.level == self.level) {
            self.pending.remove(at);
        }
    }

    /// Drop every pending error of the current level and below it.
    pub fn clear_logs(&mut self) {
        let level = self.level;
        self.pending.retain(|p| p.level < level);
    }

    /// Enter a nested resolution attempt.
    pub fn recurse(&mut self) {
        self.level += 1;
    }

    /// Leave a nested attempt. `NoMatch` noise from inside is dropped; semantic
    /// errors move up to the enclosing level.
    pub fn callback(&mut self) {
        let level = self.level;
        let parent = level.saturating_sub(1);
        self.pending.retain(|p| p.level < level || p.kind == ErrorKind::Semantic);
        for pending in self.pending.iter_mut().filter(|p| p.level >= level) {
            pending.level = parent;
        }
        self.level = parent;
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.pending.len()
    }

    /// Forget the `NoMatch` errors logged since `checkpoint`, typically by a
    /// candidate that just failed. Its semantic errors stay pending.
    pub(crate) fn forget_since(&mut self, checkpoint: usize) {
        let mut index = 0;
        self.pending.retain(|p| {
            let keep = index < checkpoint || p.kind == ErrorKind::Semantic;
            index += 1;
            keep
        });
    }

    /// Messages currently pending, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|p| p.message.as_str())
    }

    /// Report the highest-priority pending error against `line` and clear the
    /// pending set.
    pub fn finish_line(&mut self, line: &SourceLine) -> Option<&Diagnostic> {
        let mut best: Option<&Pending> = None;
        for pending in &self.pending {
            if best.is_none_or(|b| pending.kind > b.kind) {
                best = Some(pending);
            }
        }
        let diagnostic =
            best.map(|p| Diagnostic { message: p.message.clone(), kind: p.kind, line: Some(line.clone()) });
        self.pending.clear();
        let diagnostic = diagnostic?;
        debug!(line = line.line, source = %line.source, "{}", diagnostic.message);
        self.reported.push(diagnostic);
        self.reported.last()
    }

    pub fn reported(&self) -> &[Diagnostic] {
        &self.reported
    }

    pub fn take_reported(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> SourceLine {
        SourceLine::new("test.sk", 3, "print nothing")
    }

    #[test]
    fn semantic_errors_win_over_no_match() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("No expression matching 'x' was found", ErrorKind::NoMatch);
        diagnostics.error("number was expected", ErrorKind::Semantic);
        diagnostics.error("another semantic error", ErrorKind::Semantic);
        let reported = diagnostics.finish_line(&line()).unwrap();
        assert_eq!(reported.message, "number was expected");
        assert_eq!(reported.line.as_ref().map(|l| l.line), Some(3));
        assert_eq!(diagnostics.pending().count(), 0);
    }

    #[test]
    fn callback_drops_nested_noise_but_lifts_semantic_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.recurse();
        diagnostics.error("inner no match", ErrorKind::NoMatch);
        diagnostics.error("inner semantic", ErrorKind::Semantic);
        diagnostics.callback();
        assert_eq!(diagnostics.level(), 0);
        assert_eq!(diagnostics.pending().collect::<Vec<_>>(), vec!["inner semantic"]);
        diagnostics.clear_logs();
        assert_eq!(diagnostics.finish_line(&line()), None);
    }

    #[test]
    fn forget_removes_latest_entry_of_current_level() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("first", ErrorKind::NoMatch);
        diagnostics.error("second", ErrorKind::NoMatch);
        diagnostics.forget();
        assert_eq!(diagnostics.pending().collect::<Vec<_>>(), vec!["first"]);

        let checkpoint = diagnostics.checkpoint();
        diagnostics.error("candidate noise", ErrorKind::NoMatch);
        diagnostics.error("candidate semantic", ErrorKind::Semantic);
        diagnostics.forget_since(checkpoint);
        assert_eq!(diagnostics.pending().collect::<Vec<_>>(), vec!["first", "candidate semantic"]);
    }
}
