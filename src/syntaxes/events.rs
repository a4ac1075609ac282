use crate::engine::SyntaxRegistry;
use crate::error::{InitError, PatternError, RuntimeError};
use crate::lang::{Event, InitContext, SyntaxElement, TriggerContext};
use crate::value::Value;

pub(super) fn register(registry: &mut SyntaxRegistry) -> Result<(), PatternError> {
    registry.register_event("load", &["[on] load"], || Box::new(LoadEvent))?;
    registry.register_event("command", &["[on] command %*string%"], || Box::new(CommandEvent::default()))?;
    Ok(())
}

/// Fired once a script has been loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadEvent;

impl SyntaxElement for LoadEvent {
    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        Ok(())
    }

    fn describe(&self, _debug: bool) -> String {
        "on load".into()
    }
}

impl Event for LoadEvent {
    fn check(&self, ctx: &TriggerContext) -> Result<bool, RuntimeError> {
        Ok(ctx.event() == "load")
    }
}

/// `on command "name"`: fired with the command name as first argument.
#[derive(Debug, Default, Clone)]
pub struct CommandEvent {
    command: String,
}

impl SyntaxElement for CommandEvent {
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), InitError> {
        let name = ctx.take(0)?;
        let Some(Value::Text(command)) = name.literal_values().and_then(|v| v.first()) else {
            return Err(InitError::new(format!("{} is not a command name", name.describe(false))));
        };
        self.command = command.clone();
        Ok(())
    }

    fn describe(&self, _debug: bool) -> String {
        format!("on command \"{}\"", self.command)
    }
}

impl Event for CommandEvent {
    fn check(&self, ctx: &TriggerContext) -> Result<bool, RuntimeError> {
        let invoked = ctx.arguments().first().and_then(Value::as_str);
        Ok(ctx.event() == "command" && invoked.is_some_and(|name| name.eq_ignore_ascii_case(&self.command)))
    }
}
