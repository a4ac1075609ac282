//! Per-firing runtime context.

use std::collections::HashMap;

use chrono::Duration;

use super::state::ChainId;
use crate::runtime::ScopeId;
use crate::value::Value;

/// Innermost `loop N times` bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFrame {
    pub scope: ScopeId,
    pub iteration: i64,
    pub times: i64,
}

/// Innermost `switch` bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchFrame {
    pub scope: ScopeId,
    pub value: Option<Value>,
    pub matched: bool,
    /// Index of the switch's scope end.
    pub end: usize,
}

/// State owned by one firing of a trigger: the event that fired it, local
/// variables, printed output and section bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct TriggerContext {
    event: String,
    arguments: Vec<Value>,
    variables: HashMap<String, Vec<Value>>,
    output: Vec<String>,
    chains: HashMap<ChainId, bool>,
    loops: Vec<LoopFrame>,
    switches: Vec<SwitchFrame>,
    wait: Option<Duration>,
}

impl TriggerContext {
    pub fn new(event: impl Into<String>) -> Self {
        Self { event: event.into(), ..Self::default() }
    }

    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    // --- Variables -----------------------------------------------------------

    pub fn variable(&self, name: &str) -> &[Value] {
        self.variables.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Setting an empty list deletes the variable.
    pub fn set_variable(&mut self, name: &str, values: Vec<Value>) {
        if values.is_empty() {
            self.variables.remove(name);
        } else {
            self.variables.insert(name.to_string(), values);
        }
    }

    // --- Output --------------------------------------------------------------

    pub fn print(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    // --- Section bookkeeping -------------------------------------------------

    pub fn branch_taken(&self, chain: ChainId) -> bool {
        self.chains.get(&chain).copied().unwrap_or(false)
    }

    pub fn set_branch_taken(&mut self, chain: ChainId, taken: bool) {
        self.chains.insert(chain, taken);
    }

    pub fn current_loop(&self) -> Option<&LoopFrame> {
        self.loops.last()
    }

    pub fn current_loop_mut(&mut self) -> Option<&mut LoopFrame> {
        self.loops.last_mut()
    }

    pub fn push_loop(&mut self, frame: LoopFrame) {
        self.loops.push(frame);
    }

    pub fn pop_loop(&mut self) -> Option<LoopFrame> {
        self.loops.pop()
    }

    pub fn current_switch(&self) -> Option<&SwitchFrame> {
        self.switches.last()
    }

    pub fn current_switch_mut(&mut self) -> Option<&mut SwitchFrame> {
        self.switches.last_mut()
    }

    pub fn push_switch(&mut self, frame: SwitchFrame) {
        self.switches.push(frame);
    }

    pub fn pop_switch(&mut self) -> Option<SwitchFrame> {
        self.switches.pop()
    }

    // --- Waiting -------------------------------------------------------------

    /// Record how long a suspended firing wants to sleep.
    pub fn set_wait(&mut self, duration: Duration) {
        self.wait = Some(duration);
    }

    pub fn take_wait(&mut self) -> Option<Duration> {
        self.wait.take()
    }
}
