//! Schedulers
//!
//!     The engine never sleeps. After processing a token it asks a [`Scheduler`] to call
//!     back after the token's delay, and it keeps the returned [`TimerId`] so that the
//!     step can be cancelled. Whoever owns the scheduler delivers fired ids back to
//!     [`Playback::fire`](super::Playback::fire).
//!
//!     [`VirtualScheduler`] keeps a simulated clock for tests and for computing reveal
//!     times without waiting. [`TokioScheduler`] spawns one sleep task per step and sends
//!     the id over a channel when it elapses.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

pub trait Scheduler {
    fn schedule_after(&mut self, delay: Duration) -> TimerId;
    /// Cancelling an unknown or already fired id is a no-op.
    fn cancel(&mut self, id: TimerId);
}

/// Convert a delay in milliseconds. Negative and NaN delays are zero, infinite ones
/// never elapse in practice.
pub fn millis(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
}

/// A scheduler over a simulated clock.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Duration,
    next_id: u64,
    pending: BTreeSet<(Duration, TimerId)>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.first().map(|(due, _)| *due)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<TimerId> {
        match self.pending.first() {
            Some((due, _)) if *due <= until => self.pop_next(),
            _ => None,
        }
    }

    /// Pop the earliest timer regardless of its due time.
    pub fn pop_next(&mut self) -> Option<TimerId> {
        let (due, id) = self.pending.pop_first()?;
        self.now = self.now.max(due);
        Some(id)
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, instant: Duration) {
        self.now = self.now.max(instant);
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_after(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert((self.now.saturating_add(delay), id));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|(_, pending)| *pending != id);
    }
}

/// A scheduler backed by tokio timers. Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    sender: UnboundedSender<TimerId>,
}

impl TokioScheduler {
    /// Create the scheduler and the receiving end that fired ids arrive on.
    pub fn new() -> (Self, UnboundedReceiver<TimerId>) {
        let (sender, receiver) = unbounded_channel();
        let scheduler = Self {
            next_id: 0,
            tasks: HashMap::new(),
            sender,
        };
        (scheduler, receiver)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&mut self, delay: Duration) -> TimerId {
        self.tasks.retain(|_, task| !task.is_finished());

        let id = TimerId(self.next_id);
        self.next_id += 1;
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone once playback is dropped
            let _ = sender.send(id);
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}
