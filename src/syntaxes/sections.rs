//! Control-flow sections.
//!
//! Sections direct the executor through their scope span:
//!
//! ```text
//!   ScopeStart ── enter: skip_scope() ─────────────────────┐  body skipped
//!   ...body...                                             │
//!   ScopeEnd   ── leave: repeat_scope() ── back to start   │  loops
//!   next item  ◀───────────────────────────────────────────┘
//! ```
//!
//! `if` / `else if` / `else` share a [`ChainId`] allocated while parsing; at
//! runtime the context records whether a branch of the chain was taken.

use super::{bound, describe_bound};
use crate::engine::SyntaxRegistry;
use crate::error::{InitError, PatternError, RuntimeError};
use crate::lang::{
    ChainId, CodeSection, Expression, InitContext, LoopFrame, SwitchFrame, SyntaxElement, SyntaxRestriction,
    TriggerContext,
};
use crate::runtime::{ExecutorState, ScopeSpan};
use crate::value::{Relation, compare};

pub(super) fn register(registry: &mut SyntaxRegistry) -> Result<(), PatternError> {
    registry.register_section("if", &["if %boolean%"], || Box::new(IfSection::default()))?;
    registry.register_section("else if", &["else if %boolean%"], || Box::new(ElseIfSection::default()))?;
    registry.register_section("else", &["else"], || Box::new(ElseSection::default()))?;
    registry.register_section("while", &["while %boolean%"], || Box::new(WhileSection::default()))?;
    registry.register_section("loop", &["loop %integer% time[s]"], || Box::new(LoopSection::default()))?;
    registry.register_section("switch", &["switch %object%"], || Box::new(SwitchSection::default()))?;
    registry.register_section("case", &["(case|when) %*objects%", "([by] default|otherwise)"], || {
        Box::new(CaseSection::default())
    })?;
    Ok(())
}

fn chain_of(chain: Option<ChainId>) -> Result<ChainId, RuntimeError> {
    chain.ok_or_else(|| RuntimeError::ContractViolation("conditional section used before init".into()))
}

// --- Conditionals -------------------------------------------------------------

#[derive(Debug, Default)]
pub struct IfSection {
    condition: Option<Box<dyn Expression>>,
    chain: Option<ChainId>,
}

impl SyntaxElement for IfSection {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.condition = Some(ctx.take(0)?);
        self.chain = Some(ctx.state_mut().open_chain());
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("if {}", describe_bound(&self.condition, debug))
    }
}

impl CodeSection for IfSection {
    fn enter(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        let taken = bound(&self.condition, "if")?.check(ctx)?;
        ctx.set_branch_taken(chain_of(self.chain)?, taken);
        if !taken {
            state.skip_scope(span)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ElseIfSection {
    condition: Option<Box<dyn Expression>>,
    chain: Option<ChainId>,
}

impl SyntaxElement for ElseIfSection {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        let Some(chain) = ctx.state_mut().continue_chain() else {
            return Err(InitError::new("'else if' has to be placed just after another 'if' or 'else if' section"));
        };
        self.condition = Some(ctx.take(0)?);
        self.chain = Some(chain);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("else if {}", describe_bound(&self.condition, debug))
    }
}

impl CodeSection for ElseIfSection {
    fn enter(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        let chain = chain_of(self.chain)?;
        if ctx.branch_taken(chain) {
            state.skip_scope(span)?;
        } else if bound(&self.condition, "else if")?.check(ctx)? {
            ctx.set_branch_taken(chain, true);
        } else {
            state.skip_scope(span)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ElseSection {
    chain: Option<ChainId>,
}

impl SyntaxElement for ElseSection {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        let Some(chain) = ctx.state_mut().close_chain() else {
            return Err(InitError::new("'else' has to be placed just after an 'if' or 'else if' section"));
        };
        self.chain = Some(chain);
        Ok(())
    }

    fn describe(&self, _debug: bool) -> String {
        "else".into()
    }
}

impl CodeSection for ElseSection {
    fn enter(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        if ctx.branch_taken(chain_of(self.chain)?) {
            state.skip_scope(span)?;
        }
        Ok(())
    }
}

// --- Loops --------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct WhileSection {
    condition: Option<Box<dyn Expression>>,
}

impl SyntaxElement for WhileSection {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.condition = Some(ctx.take(0)?);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("while {}", describe_bound(&self.condition, debug))
    }
}

impl CodeSection for WhileSection {
    fn enter(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        if !bound(&self.condition, "while")?.check(ctx)? {
            state.skip_scope(span)?;
        }
        Ok(())
    }

    fn leave(&self, _ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        state.repeat_scope(span)?;
        Ok(())
    }
}

/// `loop N times`; `loop-number` reads the current iteration.
#[derive(Debug, Default)]
pub struct LoopSection {
    times: Option<Box<dyn Expression>>,
}

impl SyntaxElement for LoopSection {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.times = Some(ctx.take(0)?);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("loop {} times", describe_bound(&self.times, debug))
    }
}

impl CodeSection for LoopSection {
    fn enter(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        let repeated = match ctx.current_loop_mut() {
            Some(frame) if frame.scope == span.id => {
                frame.iteration += 1;
                Some(*frame)
            }
            _ => None,
        };
        let frame = match repeated {
            Some(frame) => frame,
            None => {
                let times = bound(&self.times, "loop")?.get_one(ctx)?.and_then(|v| v.as_i64()).unwrap_or(0);
                let frame = LoopFrame { scope: span.id, iteration: 1, times };
                ctx.push_loop(frame);
                frame
            }
        };
        if frame.iteration > frame.times {
            ctx.pop_loop();
            state.skip_scope(span)?;
        }
        Ok(())
    }

    fn leave(&self, _ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        state.repeat_scope(span)?;
        Ok(())
    }
}

// --- Switch -------------------------------------------------------------------

/// `switch <value>`: runs the first `case` whose values contain the value.
/// Only `case` sections may appear in its body.
#[derive(Debug, Default)]
pub struct SwitchSection {
    subject: Option<Box<dyn Expression>>,
}

impl SyntaxElement for SwitchSection {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.subject = Some(ctx.take(0)?);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("switch {}", describe_bound(&self.subject, debug))
    }
}

impl CodeSection for SwitchSection {
    fn enter(&self, ctx: &mut TriggerContext, _state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        let value = bound(&self.subject, "switch")?.get_one(ctx)?;
        ctx.push_switch(SwitchFrame { scope: span.id, value, matched: false, end: span.end });
        Ok(())
    }

    fn leave(&self, ctx: &mut TriggerContext, _state: &mut ExecutorState, _span: ScopeSpan) -> Result<(), RuntimeError> {
        ctx.pop_switch();
        Ok(())
    }

    fn allowed_syntaxes(&self) -> Option<SyntaxRestriction> {
        Some(SyntaxRestriction::only(&["case"]))
    }
}

/// `case 1, 2 or 3` / `default`. A case that ran continues at the end of its
/// switch. The default comes last and runs when no case matched.
#[derive(Debug, Default)]
pub struct CaseSection {
    /// `None` for the default case.
    values: Option<Box<dyn Expression>>,
}

impl SyntaxElement for CaseSection {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        if ctx.state().current_section() != Some("switch") {
            return Err(InitError::new("case can only be used directly inside a switch"));
        }
        if ctx.matched_pattern() != 0 {
            if ctx.state().has_default() {
                return Err(InitError::new("a switch can only have one default case"));
            }
            ctx.state_mut().set_default();
            return Ok(());
        }
        let values = ctx.take(0)?;
        if !values.is_single() && values.is_and_list() {
            return Err(InitError::new(format!("only 'or'-lists may be used, found '{}'", values.describe(false))));
        }
        if ctx.state().has_default() {
            return Err(InitError::new("a case cannot be placed after the default case"));
        }
        self.values = Some(values);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        match &self.values {
            Some(values) => format!("case {}", values.describe(debug)),
            None => "default".into(),
        }
    }
}

impl CodeSection for CaseSection {
    fn enter(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, span: ScopeSpan) -> Result<(), RuntimeError> {
        let Some(frame) = ctx.current_switch() else {
            return Err(RuntimeError::ContractViolation("case walked outside of a switch".into()));
        };
        let hit = match (&self.values, &frame.value) {
            (None, _) => !frame.matched,
            (Some(values), Some(subject)) => {
                values.get_all(ctx)?.iter().any(|v| compare(subject, v).is(Relation::Equal))
            }
            (Some(_), None) => false,
        };
        if hit {
            if let Some(frame) = ctx.current_switch_mut() {
                frame.matched = true;
            }
        } else {
            state.skip_scope(span)?;
        }
        Ok(())
    }

    fn leave(&self, ctx: &mut TriggerContext, state: &mut ExecutorState, _span: ScopeSpan) -> Result<(), RuntimeError> {
        if let Some(frame) = ctx.current_switch() {
            state.goto(frame.end)?;
        }
        Ok(())
    }
}
