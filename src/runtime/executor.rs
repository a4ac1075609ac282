//! Trigger execution.
//!
//! The executor walks a trigger's flat item array with an explicit cursor
//! instead of recursing through a tree, so any item can move the cursor,
//! suspend the firing or end it, and a suspended firing can be resumed later
//! (possibly on another thread) without any native stack to restore.
//!
//! ```text
//!            run()                     interrupt() during a walk
//! NotStarted ─────▶ Running ───────────────────────────────▶ Suspended
//!                    │  ▲                                       │
//!                    │  └───────────── resume() ────────────────┘
//!                    │ last item walked / exit()
//!                    ▼
//!                 Finished
//! ```
//!
//! ## Cursor rules
//!
//! - After an item is walked, a pending `jump(offset)` moves the cursor by
//!   `offset` and the cursor then advances by one: the next item is the one
//!   `offset + 1` positions after the walked one.
//! - A pending interrupt is checked after the offset is applied; the firing
//!   resumes at the item following the adjusted cursor.
//! - A jump requested outside a walk (before `run`, or while suspended) is
//!   applied to the saved cursor before the next item is walked.
//! - Running off the end finishes the firing. A cursor below zero or past the
//!   end is an error.

use std::sync::Arc;

use tracing::{trace, warn};

use super::trigger::{ScopeSpan, Trigger, TriggerBody, TriggerItem};
use crate::error::{ExecutorError, RuntimeError};
use crate::lang::TriggerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorStatus {
    Suspended,
    Finished,
}

/// Cursor and flags of one firing, handed to every item walk.
#[derive(Debug, Clone, Default)]
pub struct ExecutorState {
    cursor: usize,
    started: bool,
    finished: bool,
    walking: bool,
    exited: bool,
    adjust: bool,
    offset: isize,
    interrupted: bool,
}

impl ExecutorState {
    /// Index of the item being walked (or, outside a walk, the next one).
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Move the cursor by `offset` once the current walk returns. Offsets
    /// requested during the same walk add up.
    pub fn jump(&mut self, offset: isize) -> Result<(), ExecutorError> {
        if self.finished {
            return Err(ExecutorError::AlreadyFinished);
        }
        self.adjust = true;
        self.offset += offset;
        Ok(())
    }

    /// Suspend the firing once the current walk returns.
    pub fn interrupt(&mut self) -> Result<(), ExecutorError> {
        if self.finished {
            return Err(ExecutorError::AlreadyFinished);
        }
        if !self.walking {
            return Err(ExecutorError::NotWalking);
        }
        self.adjust = true;
        self.interrupted = true;
        Ok(())
    }

    /// Finish the firing; no further item is walked.
    pub fn exit(&mut self) -> Result<(), ExecutorError> {
        if !self.started {
            return Err(ExecutorError::NotStarted);
        }
        if self.exited {
            return Err(ExecutorError::ExitTwice);
        }
        if self.finished {
            return Err(ExecutorError::AlreadyFinished);
        }
        self.exited = true;
        self.finished = true;
        self.adjust = true;
        self.interrupted = true;
        Ok(())
    }

    /// Make `index` the next item to be walked.
    pub fn goto(&mut self, index: usize) -> Result<(), ExecutorError> {
        let offset = index as isize - self.cursor as isize - 1;
        self.jump(offset)
    }

    /// Continue after the scope's end marker.
    pub fn skip_scope(&mut self, span: ScopeSpan) -> Result<(), ExecutorError> {
        self.goto(span.end + 1)
    }

    /// Continue at the scope's end marker, so its `leave` runs.
    pub fn enter_end(&mut self, span: ScopeSpan) -> Result<(), ExecutorError> {
        self.goto(span.end)
    }

    /// Continue at the scope's start marker, so its `enter` runs again.
    pub fn repeat_scope(&mut self, span: ScopeSpan) -> Result<(), ExecutorError> {
        self.goto(span.start)
    }
}

/// One firing of a trigger.
#[derive(Debug)]
pub struct TriggerExecutor {
    trigger: Arc<Trigger>,
    ctx: TriggerContext,
    state: ExecutorState,
}

impl TriggerExecutor {
    pub fn new(trigger: Arc<Trigger>, ctx: TriggerContext) -> Self {
        Self { trigger, ctx, state: ExecutorState::default() }
    }

    pub fn trigger(&self) -> &Arc<Trigger> {
        &self.trigger
    }

    pub fn context(&self) -> &TriggerContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut TriggerContext {
        &mut self.ctx
    }

    pub fn into_context(self) -> TriggerContext {
        self.ctx
    }

    pub fn state(&self) -> &ExecutorState {
        &self.state
    }

    pub fn is_started(&self) -> bool {
        self.state.started
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    pub fn run(&mut self) -> Result<ExecutorStatus, RuntimeError> {
        if self.state.started {
            return Err(ExecutorError::AlreadyStarted.into());
        }
        let trigger = Arc::clone(&self.trigger);
        let body = trigger.body()?;
        self.state.started = true;
        trace!(trigger = trigger.name(), items = body.len(), "run");
        self.drive(body)
    }

    pub fn resume(&mut self) -> Result<ExecutorStatus, RuntimeError> {
        if !self.state.started {
            return Err(ExecutorError::NotStarted.into());
        }
        if self.state.finished {
            return Err(ExecutorError::AlreadyFinished.into());
        }
        let trigger = Arc::clone(&self.trigger);
        let body = trigger.body()?;
        trace!(trigger = trigger.name(), cursor = self.state.cursor, "resume");
        self.drive(body)
    }

    /// Request a cursor adjustment from outside a walk.
    pub fn jump(&mut self, offset: isize) -> Result<(), ExecutorError> {
        self.state.jump(offset)
    }

    /// End the firing from outside a walk.
    pub fn exit(&mut self) -> Result<(), ExecutorError> {
        self.state.exit()
    }

    fn drive(&mut self, body: &TriggerBody) -> Result<ExecutorStatus, RuntimeError> {
        let len = body.len();
        let mut i = self.state.cursor as isize;
        if self.state.adjust {
            self.state.adjust = false;
            self.state.interrupted = false;
            i += std::mem::take(&mut self.state.offset);
        }

        loop {
            if self.state.finished {
                return Ok(ExecutorStatus::Finished);
            }
            if i == len as isize {
                self.state.cursor = len;
                self.state.finished = true;
                trace!(trigger = self.trigger.name(), "finished");
                return Ok(ExecutorStatus::Finished);
            }
            let index = self.checked_index(i, len)?;
            self.state.cursor = index;

            self.state.walking = true;
            let walked = walk(body, index, &mut self.ctx, &mut self.state);
            self.state.walking = false;
            if let Err(err) = walked {
                self.state.finished = true;
                warn!(trigger = self.trigger.name(), index, "walk failed: {err}");
                return Err(err);
            }
            if self.state.finished {
                trace!(trigger = self.trigger.name(), index, "exited");
                return Ok(ExecutorStatus::Finished);
            }

            if self.state.adjust {
                self.state.adjust = false;
                i += std::mem::take(&mut self.state.offset);
                if std::mem::take(&mut self.state.interrupted) {
                    let next = self.checked_index(i + 1, len)?;
                    self.state.cursor = next;
                    trace!(trigger = self.trigger.name(), index, next, "suspended");
                    return Ok(ExecutorStatus::Suspended);
                }
            }
            i += 1;
        }
    }

    fn checked_index(&mut self, i: isize, len: usize) -> Result<usize, ExecutorError> {
        if i < 0 || i > len as isize {
            self.state.finished = true;
            return Err(ExecutorError::OutOfBounds { index: i, len });
        }
        Ok(i as usize)
    }
}

fn walk(
    body: &TriggerBody,
    index: usize,
    ctx: &mut TriggerContext,
    state: &mut ExecutorState,
) -> Result<(), RuntimeError> {
    match &body.items[index] {
        TriggerItem::Statement(effect) => effect.execute(ctx, state),
        TriggerItem::ScopeStart(id) => {
            let scope = body.scope(*id).ok_or_else(|| missing_scope(id.0))?;
            scope.section.enter(ctx, state, scope.span)
        }
        TriggerItem::ScopeEnd(id) => {
            let scope = body.scope(*id).ok_or_else(|| missing_scope(id.0))?;
            scope.section.leave(ctx, state, scope.span)
        }
    }
}

fn missing_scope(id: usize) -> RuntimeError {
    RuntimeError::ContractViolation(format!("scope #{id} is not in the trigger's arena"))
}
