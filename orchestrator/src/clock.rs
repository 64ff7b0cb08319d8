//! Time as seen by the orchestrator: its two suspension points, the settle delay and the cadence
//! wait, both go through a [`Clock`].

use std::{
    cell::RefCell,
    future::{self, Future},
    rc::Rc,
    time::Duration,
};

use tokio::time::{self, Instant};

pub trait Clock {
    /// The time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Suspends the caller for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// A clock backed by the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        time::sleep(duration)
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// A clock that only moves when told to. Sleeping advances it instantly by the requested amount
/// and records the request.
///
/// Clones share the same time, so a test can keep a handle to the clock it gives away.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Rc<RefCell<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.state.borrow_mut().now += duration;
    }

    /// Every duration slept so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.borrow().sleeps.clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        let mut state = self.state.borrow_mut();
        state.now += duration;
        state.sleeps.push(duration);
        future::ready(())
    }
}
