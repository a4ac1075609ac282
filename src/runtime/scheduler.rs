//! Tick-driven scheduling of suspended firings.
//!
//! A firing that suspends itself (for instance through `wait 2 seconds`)
//! leaves the requested delay in its context. The scheduler parks it until
//! that much simulated time has passed, then resumes it. Time only moves when
//! [`TickScheduler::advance`] is called, which keeps scripts deterministic
//! under test.

use std::collections::BTreeMap;

use chrono::Duration;
use tracing::debug;

use super::executor::{ExecutorStatus, TriggerExecutor};
use crate::error::RuntimeError;
use crate::types::TICK_MILLIS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// A firing that ran to its end (or failed).
#[derive(Debug)]
pub struct Completion {
    pub id: TaskId,
    pub executor: TriggerExecutor,
    pub result: Result<(), RuntimeError>,
}

#[derive(Debug)]
struct Parked {
    due: Duration,
    executor: TriggerExecutor,
}

#[derive(Debug)]
pub struct TickScheduler {
    tick: Duration,
    elapsed: Duration,
    next_id: u64,
    parked: BTreeMap<TaskId, Parked>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(Duration::milliseconds(TICK_MILLIS))
    }
}

impl TickScheduler {
    pub fn new(tick: Duration) -> Self {
        Self { tick, elapsed: Duration::zero(), next_id: 0, parked: BTreeMap::new() }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Simulated time since the scheduler was created.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of parked firings.
    pub fn pending(&self) -> usize {
        self.parked.len()
    }

    /// Queue a firing; it starts on the next [`poll`](Self::poll).
    pub fn spawn(&mut self, executor: TriggerExecutor) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.parked.insert(id, Parked { due: self.elapsed, executor });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> Option<TriggerExecutor> {
        self.parked.remove(&id).map(|p| p.executor)
    }

    /// Move time forward by `ticks` and run whatever became due. Simulated
    /// time saturates instead of overflowing.
    pub fn advance(&mut self, ticks: u32) -> Vec<Completion> {
        self.elapsed = saturating_add(self.elapsed, ticks_to_duration(self.tick, ticks));
        self.poll()
    }

    /// Run every firing due at the current time. A firing that suspends with
    /// no delay is due again immediately but waits for the next poll.
    pub fn poll(&mut self) -> Vec<Completion> {
        let due: Vec<TaskId> = self.parked.iter().filter(|(_, p)| p.due <= self.elapsed).map(|(id, _)| *id).collect();
        let mut done = Vec::new();

        for id in due {
            let Some(Parked { mut executor, .. }) = self.parked.remove(&id) else {
                continue;
            };
            let status = if executor.is_started() { executor.resume() } else { executor.run() };
            match status {
                Ok(ExecutorStatus::Suspended) => {
                    let delay = executor.context_mut().take_wait().unwrap_or_else(Duration::zero);
                    debug!(task = id.0, delay_ms = delay.num_milliseconds(), "parked");
                    self.parked.insert(id, Parked { due: saturating_add(self.elapsed, delay), executor });
                }
                Ok(ExecutorStatus::Finished) => done.push(Completion { id, executor, result: Ok(()) }),
                Err(err) => done.push(Completion { id, executor, result: Err(err) }),
            }
        }

        done
    }
}

fn saturating_add(a: Duration, b: Duration) -> Duration {
    a.checked_add(&b).unwrap_or(Duration::MAX)
}

/// `tick * ticks`, split in halves so each factor fits an `i32`.
fn ticks_to_duration(tick: Duration, ticks: u32) -> Duration {
    let half = i32::try_from(ticks / 2).unwrap_or(i32::MAX);
    let odd = if ticks % 2 == 1 { tick } else { Duration::zero() };
    tick.checked_mul(half)
        .and_then(|d| d.checked_mul(2))
        .and_then(|d| d.checked_add(&odd))
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_converts_ticks_to_time() {
        let mut scheduler = TickScheduler::default();
        assert!(scheduler.advance(3).is_empty());
        assert_eq!(scheduler.elapsed(), Duration::milliseconds(150));
    }

    #[test]
    fn time_never_runs_backwards() {
        let mut scheduler = TickScheduler::default();
        scheduler.advance(u32::MAX);
        assert_eq!(scheduler.elapsed(), Duration::milliseconds(TICK_MILLIS * i64::from(u32::MAX)));

        let mut scheduler = TickScheduler::new(Duration::MAX / 2);
        scheduler.advance(3);
        assert_eq!(scheduler.elapsed(), Duration::MAX);
        scheduler.advance(1);
        assert_eq!(scheduler.elapsed(), Duration::MAX);
    }
}
