//! Cooperative timers.
//!
//! Tasks never block: each run returns whether it is finished or wants to be
//! polled again after some delay.

use parking_lot::Mutex;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    Done,
    RunAgainIn(Duration),
}

pub type ScheduledTask = Box<dyn FnMut() -> TaskControl + Send + 'static>;

pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: ScheduledTask);
}

struct Pending {
    due: Duration,
    seq: u64,
    task: ScheduledTask,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    seq: u64,
    queue: BinaryHeap<Reverse<Pending>>,
}

/// Virtual-clock scheduler. Time only moves when [`ManualScheduler::advance`] is called,
/// which makes it usable both in tests and by hosts that tick from their own event loop.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Move the clock forward, running every task that falls due on the way.
    /// Returns the number of task runs.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut runs = 0;

        loop {
            // The lock is released before running so tasks can schedule more work.
            let next = {
                let mut state = self.state.lock();
                let due = state.queue.peek().map(|Reverse(p)| p.due);
                match due {
                    Some(due) if due <= target => {
                        state.now = due;
                        state.queue.pop().map(|Reverse(p)| p)
                    }
                    _ => None,
                }
            };

            let Some(mut pending) = next else { break };
            runs += 1;
            match (pending.task)() {
                TaskControl::Done => {}
                TaskControl::RunAgainIn(delay) => {
                    let mut state = self.state.lock();
                    pending.due = state.now + delay;
                    state.seq += 1;
                    pending.seq = state.seq;
                    state.queue.push(Reverse(pending));
                }
            }
        }

        self.state.lock().now = target;
        trace!(runs, "manual scheduler advanced");
        runs
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        let mut state = self.state.lock();
        state.seq += 1;
        let pending = Pending {
            due: state.now + delay,
            seq: state.seq,
            task,
        };
        state.queue.push(Reverse(pending));
    }
}

/// Runs tasks on a tokio runtime, sleeping between polls.
///
/// Tasks fire dispatches, so the handle should drive the host's update
/// thread: a current-thread runtime, or a `LocalSet` on it. On a
/// multi-thread runtime a fired task overlaps UI writes and their
/// suppression guards.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime of the calling task.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, mut task: ScheduledTask) {
        self.handle.spawn(async move {
            let mut delay = delay;
            loop {
                tokio::time::sleep(delay).await;
                match task() {
                    TaskControl::Done => break,
                    TaskControl::RunAgainIn(next) => delay = next,
                }
            }
        });
    }
}
