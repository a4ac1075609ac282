use crate::engine::{Diagnostic, SyntaxParser, SyntaxRegistry};
use crate::error::{PatternError, RuntimeError};
use crate::lang::TriggerContext;
use crate::runtime::{TaskId, TickScheduler, Trigger, TriggerExecutor};
use crate::script::FileSection;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

static DEFAULT_REGISTRY: Lazy<Result<SyntaxRegistry, PatternError>> = Lazy::new(SyntaxRegistry::with_builtins);

/// Options that affect resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Capacity of each recency list. `0` disables recency ordering.
    pub recent_capacity: usize,
    /// Maximum nesting of expression slots and list elements.
    pub max_depth: usize,
    /// Use the verbose `describe` form in log messages.
    pub debug: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { recent_capacity: 16, max_depth: 32, debug: false }
    }
}

/// Result from [`load_script`] and [`load`].
#[derive(Debug)]
pub struct LoadResult {
    /// Triggers that resolved, in script order.
    pub triggers: Vec<Arc<Trigger>>,
    /// One entry per line that failed to resolve.
    pub diagnostics: Vec<Diagnostic>,
    /// Total time spent resolving.
    pub elapsed: Duration,
}

impl LoadResult {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Resolve `script` against `registry`.
///
/// Lines that fail are reported in [`LoadResult::diagnostics`] and skipped;
/// the rest of the script still loads.
pub fn load_script(registry: &SyntaxRegistry, script: &[FileSection], options: &ParserOptions) -> LoadResult {
    let started = Instant::now();
    let mut parser = SyntaxParser::new(registry, options.clone());
    let triggers = parser.load_script(script).into_iter().map(Arc::new).collect::<Vec<_>>();
    let diagnostics = parser.diagnostics_mut().take_reported();
    let elapsed = started.elapsed();
    debug!(triggers = triggers.len(), errors = diagnostics.len(), ?elapsed, "script loaded");
    LoadResult { triggers, diagnostics, elapsed }
}

/// Resolve `script` against the bundled syntax library with default options.
///
/// # Example
/// ```
/// use parlance::{FileElement, FileSection, SourceLine, load};
///
/// let script = vec![FileSection::new(
///     SourceLine::new("demo.sk", 1, "on load:"),
///     vec![FileElement::Line(SourceLine::new("demo.sk", 2, "print \"hello\""))],
/// )];
/// let out = load(&script).unwrap();
/// assert_eq!(out.triggers.len(), 1);
/// assert!(out.is_clean());
/// ```
pub fn load(script: &[FileSection]) -> Result<LoadResult, PatternError> {
    let registry = DEFAULT_REGISTRY.as_ref().map_err(Clone::clone)?;
    Ok(load_script(registry, script, &ParserOptions::default()))
}

/// Queue a firing of every trigger whose event accepts `ctx`.
pub fn fire(
    triggers: &[Arc<Trigger>],
    ctx: &TriggerContext,
    scheduler: &mut TickScheduler,
) -> Result<Vec<TaskId>, RuntimeError> {
    let mut spawned = Vec::new();
    for trigger in triggers {
        if trigger.matches(ctx)? {
            spawned.push(scheduler.spawn(TriggerExecutor::new(Arc::clone(trigger), ctx.clone())));
        }
    }
    Ok(spawned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ErrorKind;
    use crate::script::{FileElement, SourceLine};

    fn section(line: usize, header: &str, body: Vec<FileElement>) -> FileSection {
        FileSection::new(SourceLine::new("api.sk", line, format!("{header}:")), body)
    }

    fn line(line: usize, content: &str) -> FileElement {
        FileElement::Line(SourceLine::new("api.sk", line, content))
    }

    #[test]
    fn failed_lines_do_not_stop_the_load() {
        let script = vec![
            section(1, "on load", vec![line(2, "print \"a\""), line(3, "print"), line(4, "print \"b\"")]),
            section(5, "on sunrise", vec![line(6, "print \"c\"")]),
        ];
        let out = load(&script).unwrap();
        assert_eq!(out.triggers.len(), 1);
        let lines: Vec<(usize, ErrorKind)> =
            out.diagnostics.iter().map(|d| (d.line.as_ref().map_or(0, |l| l.line), d.kind)).collect();
        assert_eq!(lines, vec![(3, ErrorKind::NoMatch), (5, ErrorKind::NoMatch)]);
        assert_eq!(out.diagnostics[1].message, "No event matching 'on sunrise' was found");
        assert_eq!(out.triggers[0].body().unwrap().len(), 2);
    }

    #[test]
    fn fire_spawns_matching_triggers_only() {
        let script = vec![
            section(1, "on load", vec![line(2, "print \"loaded\"")]),
            section(3, "on command \"hello\"", vec![line(4, "print \"hi\"")]),
        ];
        let out = load(&script).unwrap();
        assert!(out.is_clean(), "{:?}", out.diagnostics);

        let mut scheduler = TickScheduler::default();
        let ids = fire(&out.triggers, &TriggerContext::new("load"), &mut scheduler).unwrap();
        assert_eq!(ids.len(), 1);
        let done = scheduler.poll();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].executor.context().output(), &["loaded".to_string()]);
    }

    #[test]
    fn default_options() {
        let options = ParserOptions::default();
        assert_eq!(options.recent_capacity, 16);
        assert_eq!(options.max_depth, 32);
        assert!(!options.debug);
    }
}
