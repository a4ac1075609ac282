use tracing::trace;

use super::{bound, describe_bound};
use crate::engine::SyntaxRegistry;
use crate::error::{InitError, PatternError, RuntimeError};
use crate::lang::{Effect, Expression, InitContext, SyntaxElement, TriggerContext, join_list};
use crate::runtime::ExecutorState;
use crate::value::Value;

pub(super) fn register(registry: &mut SyntaxRegistry) -> Result<(), PatternError> {
    registry.register_effect("print", &["print %objects%"], || Box::new(PrintEffect::default()))?;
    registry.register_effect("set", &["set %objects% to %objects%"], || Box::new(SetEffect::default()))?;
    registry.register_effect("wait", &["wait [for] %timespan%"], || Box::new(WaitEffect::default()))?;
    registry.register_effect("stop", &["(stop|exit) [[the] trigger]"], || Box::new(StopEffect))?;
    Ok(())
}

/// Appends its values to the firing's output, as one line.
#[derive(Debug, Default)]
pub struct PrintEffect {
    message: Option<Box<dyn Expression>>,
}

impl SyntaxElement for PrintEffect {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.message = Some(ctx.take(0)?);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("print {}", describe_bound(&self.message, debug))
    }
}

impl Effect for PrintEffect {
    fn execute(&self, ctx: &mut TriggerContext, _state: &mut ExecutorState) -> Result<(), RuntimeError> {
        let message = bound(&self.message, "print")?;
        let values: Vec<String> = message.get_all(ctx)?.iter().map(Value::to_string).collect();
        ctx.print(join_list(&values, message.is_and_list()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SetEffect {
    target: Option<Box<dyn Expression>>,
    value: Option<Box<dyn Expression>>,
}

impl SyntaxElement for SetEffect {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        let target = ctx.take(0)?;
        if !target.accepts_change() {
            return Err(InitError::new(format!("{} cannot be set to anything", target.describe(false))));
        }
        let value = ctx.take(1)?;
        if target.is_single() && !value.is_single() {
            return Err(InitError::new(format!(
                "{} can only be set to one value, not {}",
                target.describe(false),
                value.describe(false)
            )));
        }
        self.target = Some(target);
        self.value = Some(value);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("set {} to {}", describe_bound(&self.target, debug), describe_bound(&self.value, debug))
    }
}

impl Effect for SetEffect {
    fn execute(&self, ctx: &mut TriggerContext, _state: &mut ExecutorState) -> Result<(), RuntimeError> {
        let values = bound(&self.value, "set")?.get_all(ctx)?;
        bound(&self.target, "set")?.set_all(ctx, values)
    }
}

/// Suspends the firing; the scheduler resumes it once the timespan is over.
#[derive(Debug, Default)]
pub struct WaitEffect {
    duration: Option<Box<dyn Expression>>,
}

impl SyntaxElement for WaitEffect {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        self.duration = Some(ctx.take(0)?);
        Ok(())
    }

    fn describe(&self, debug: bool) -> String {
        format!("wait {}", describe_bound(&self.duration, debug))
    }
}

impl Effect for WaitEffect {
    fn execute(&self, ctx: &mut TriggerContext, state: &mut ExecutorState) -> Result<(), RuntimeError> {
        if let Some(Value::Timespan(duration)) = bound(&self.duration, "wait")?.get_one(ctx)? {
            trace!(ms = duration.num_milliseconds(), "wait");
            ctx.set_wait(duration);
            state.interrupt()?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StopEffect;

impl SyntaxElement for StopEffect {
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        Ok(())
    }

    fn describe(&self, _debug: bool) -> String {
        "stop".into()
    }
}

impl Effect for StopEffect {
    fn execute(&self, _ctx: &mut TriggerContext, state: &mut ExecutorState) -> Result<(), RuntimeError> {
        state.exit()?;
        Ok(())
    }
}
