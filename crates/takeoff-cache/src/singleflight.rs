//! Single-flight de-duplication of concurrent cache fills.
//!
//! The first caller for a key becomes the leader and runs the computation;
//! later callers for the same key block on a condvar until the leader
//! publishes its outcome, then share it. The leader holds a guard whose
//! `Drop` publishes an abort outcome, so a leader that panics or bails out
//! early never strands its followers.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

// Lock poisoning only happens when a holder panicked; the flight table and
// flight states stay consistent across each critical section, so recovering
// the inner value is sound.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Flight
// ---------------------------------------------------------------------------

enum FlightState {
    Pending,
    Done(Result<Arc<Vec<u8>>, String>),
}

struct Flight {
    state: Mutex<FlightState>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Pending),
            done: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<Arc<Vec<u8>>, String> {
        let mut state = lock_unpoisoned(&self.state);
        loop {
            match &*state {
                FlightState::Done(outcome) => return outcome.clone(),
                FlightState::Pending => {
                    state = self
                        .done
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn publish(&self, outcome: Result<Arc<Vec<u8>>, String>) {
        let mut state = lock_unpoisoned(&self.state);
        if matches!(*state, FlightState::Pending) {
            *state = FlightState::Done(outcome);
            self.done.notify_all();
        }
    }
}

// ---------------------------------------------------------------------------
// FlightGroup
// ---------------------------------------------------------------------------

/// Registry of in-flight computations keyed by fingerprint.
pub(crate) struct FlightGroup {
    flights: Mutex<HashMap<String, Arc<Flight>>>,
}

/// Outcome of joining a flight.
pub(crate) enum Join<'a> {
    /// This caller runs the computation and must resolve the guard.
    Leader(FlightGuard<'a>),
    /// Another caller ran the computation; this is its shared outcome.
    Follower(Result<Arc<Vec<u8>>, String>),
}

impl FlightGroup {
    pub(crate) fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the flight for `key`, becoming leader if none is in progress.
    /// Followers block until the leader publishes.
    pub(crate) fn join(&self, key: &str) -> Join<'_> {
        let flight = {
            let mut flights = lock_unpoisoned(&self.flights);
            match flights.get(key) {
                Some(flight) => Arc::clone(flight),
                None => {
                    let flight = Arc::new(Flight::new());
                    flights.insert(key.to_string(), Arc::clone(&flight));
                    return Join::Leader(FlightGuard {
                        group: self,
                        key: key.to_string(),
                        flight,
                        resolved: false,
                    });
                }
            }
        };
        Join::Follower(flight.wait())
    }

    fn retire(&self, key: &str) {
        lock_unpoisoned(&self.flights).remove(key);
    }
}

// ---------------------------------------------------------------------------
// FlightGuard
// ---------------------------------------------------------------------------

/// Leader's handle on a flight. Dropping without calling [`complete`]
/// publishes an abort error to any waiting followers.
///
/// [`complete`]: FlightGuard::complete
pub(crate) struct FlightGuard<'a> {
    group: &'a FlightGroup,
    key: String,
    flight: Arc<Flight>,
    resolved: bool,
}

impl FlightGuard<'_> {
    /// Publishes the computation's outcome and retires the flight, so the
    /// next request for this key starts fresh.
    pub(crate) fn complete(mut self, outcome: Result<Arc<Vec<u8>>, String>) {
        self.resolved = true;
        self.group.retire(&self.key);
        self.flight.publish(outcome);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.group.retire(&self.key);
            self.flight
                .publish(Err("computation aborted before completion".to_string()));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
