#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timer scheduling shared by the Game Space engines.
//!
//! Both game cores are single-threaded and advance time exclusively through
//! an explicit `Tick { dt }` command. This crate provides the [`TimerQueue`]
//! they use to turn elapsed time into discrete deadlines: a game schedules a
//! delay, stores the returned [`TimerToken`], and reacts when
//! [`TimerQueue::advance`] reports that token as fired. Cancelling the token
//! (on reset, for example) guarantees a stale timer can never mutate a fresh
//! game state. The queue never invokes callbacks on its own; callers decide
//! what a fired token means.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Handle identifying one scheduled timer.
///
/// Tokens are unique for the lifetime of their [`TimerQueue`] and are never
/// reused, so holding a token after it fired or was cancelled is harmless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Creates a token from its raw numeric identity.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric identity of the token.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug)]
struct TimerEntry {
    token: TimerToken,
    deadline: Duration,
}

/// Deterministic single-threaded timer scheduler.
///
/// The queue keeps a monotonic clock that only moves when
/// [`advance`](Self::advance) is called. Timers fire in deadline order; two
/// timers sharing a deadline fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_token: u64,
    entries: Vec<TimerEntry>,
}

impl TimerQueue {
    /// Creates an empty queue with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a timer that fires once `delay` has elapsed from the
    /// current clock reading.
    ///
    /// A zero `delay` fires on the next [`advance`](Self::advance) call,
    /// including an advance of zero duration.
    pub fn schedule(&mut self, delay: Duration) -> TimerToken {
        let token = TimerToken::new(self.next_token);
        self.next_token = self.next_token.saturating_add(1);
        self.entries.push(TimerEntry {
            token,
            deadline: self.now.saturating_add(delay),
        });
        token
    }

    /// Cancels a pending timer.
    ///
    /// Returns `true` when the token was still pending; `false` when it had
    /// already fired, was cancelled earlier, or belongs to another queue.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.token != token);
        self.entries.len() != before
    }

    /// Moves the clock forward by `dt` and appends every timer whose
    /// deadline has been reached to `fired`, in firing order.
    pub fn advance(&mut self, dt: Duration, fired: &mut Vec<TimerToken>) {
        self.now = self.now.saturating_add(dt);
        let now = self.now;
        let mut due = Vec::new();
        self.entries.retain(|entry| {
            if entry.deadline <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.token.cmp(&b.token)));
        fired.extend(due.into_iter().map(|entry| entry.token));
    }

    /// Returns whether the token is still waiting to fire.
    #[must_use]
    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.entries.iter().any(|entry| entry.token == token)
    }

    /// Returns the current clock reading.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Returns the number of timers waiting to fire.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Drops every pending timer without firing it. The clock keeps its
    /// reading and token identities are never reused.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
