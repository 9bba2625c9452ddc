// In-flight call tracking for shutdown: a cancellation flag plus a count of
// outstanding operations. `shutdown` flips the flag and waits for the count
// to drain; calls that arrive afterwards are refused.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct State {
    cancelled: bool,
    in_flight: usize,
}

#[derive(Debug, Default)]
pub struct Tracker {
    state: Mutex<State>,
    drained: Condvar,
}

/// Registration of one in-flight call; released on drop.
#[derive(Debug)]
pub struct Guard<'a> {
    tracker: &'a Tracker,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> Result<Guard<'_>> {
        let mut state = self.state.lock();
        if state.cancelled {
            return Err(Error::Closed);
        }
        state.in_flight += 1;
        Ok(Guard { tracker: self })
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Cancels and blocks until every registered call has finished.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        while state.in_flight > 0 {
            self.drained.wait(&mut state);
        }
    }
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        let mut state = self.tracker.state.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.tracker.drained.notify_all();
        }
    }
}
