//! Trigger runtime.
//!
//! Resolved element trees are flattened once into an item array and then
//! walked by an executor per firing:
//!
//! ```text
//! Vec<Element> ── TriggerBuilder::flatten ──▶ TriggerBody (items + scope arena)
//!   (builder.rs)                                   │   set once on the Trigger
//!                                                  v
//!                              TriggerExecutor::run / resume (executor.rs)
//!                                - walk items with a cursor
//!                                - jump / interrupt / exit
//!                                                  │ Suspended
//!                                                  v
//!                              TickScheduler (scheduler.rs)
//!                                - parks firings until their wait is over
//! ```
//!
//! - `trigger.rs`: [`Trigger`], [`TriggerBody`] and the scope markers.
//! - `builder.rs`: [`Element`] trees and [`TriggerBuilder`].
//! - `executor.rs`: [`TriggerExecutor`] and the [`ExecutorState`] that items
//!   use to direct the cursor.
//! - `scheduler.rs`: [`TickScheduler`], a deterministic tick clock.

#[path = "runtime/builder.rs"]
mod builder;
#[path = "runtime/executor.rs"]
mod executor;
#[path = "runtime/scheduler.rs"]
mod scheduler;
#[path = "runtime/trigger.rs"]
mod trigger;

#[allow(unused_imports)]
pub use builder::{Element, TriggerBuilder};
#[allow(unused_imports)]
pub use executor::{ExecutorState, ExecutorStatus, TriggerExecutor};
#[allow(unused_imports)]
pub use scheduler::{Completion, TaskId, TickScheduler};
#[allow(unused_imports)]
pub use trigger::{Scope, ScopeId, ScopeSpan, Trigger, TriggerBody, TriggerItem};
