//! Single-flight coordination for cache misses.
//!
//! The first caller to miss on a key becomes the leader and resolves the
//! value; callers arriving while the leader works wait for its result
//! instead of resolving again.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use hoard_core::{HoardError, Result};
use parking_lot::{Condvar, Mutex};

/// One in-progress resolution.
pub(crate) struct Flight<T> {
    result: Mutex<Option<Result<T>>>,
    ready: Condvar,
}

impl<T: Clone> Flight<T> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Blocks until the leader publishes, then returns a copy of its result.
    pub(crate) fn wait(&self) -> Result<T> {
        let mut slot = self.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    fn publish(&self, result: Result<T>) {
        *self.result.lock() = Some(result);
        self.ready.notify_all();
    }
}

/// What a caller has to do after joining a flight.
pub(crate) enum Role<'a, K: Eq + Hash + Clone, T: Clone> {
    /// Resolve the value and complete the guard.
    Leader(FlightGuard<'a, K, T>),
    /// Wait for the leader.
    Follower(Arc<Flight<T>>),
}

/// In-flight resolutions keyed by identity.
pub(crate) struct Flights<K, T> {
    inflight: Mutex<HashMap<K, Arc<Flight<T>>>>,
}

impl<K: Eq + Hash + Clone, T: Clone> Flights<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the flight for `key`, starting one if none is in progress.
    pub(crate) fn join(&self, key: &K) -> Role<'_, K, T> {
        let mut inflight = self.inflight.lock();
        if let Some(flight) = inflight.get(key) {
            return Role::Follower(Arc::clone(flight));
        }

        let flight = Arc::new(Flight::new());
        inflight.insert(key.clone(), Arc::clone(&flight));
        Role::Leader(FlightGuard {
            flights: self,
            key: key.clone(),
            flight,
            completed: false,
        })
    }

    /// Number of keys currently being resolved.
    pub(crate) fn len(&self) -> usize {
        self.inflight.lock().len()
    }
}

/// Held by the leader of a flight.
///
/// Completing publishes the result to every follower and retires the
/// flight. Dropping an uncompleted guard (the resolver panicked) publishes
/// an `Internal` error so followers never wait forever.
pub(crate) struct FlightGuard<'a, K: Eq + Hash + Clone, T: Clone> {
    flights: &'a Flights<K, T>,
    key: K,
    flight: Arc<Flight<T>>,
    completed: bool,
}

impl<K: Eq + Hash + Clone, T: Clone> FlightGuard<'_, K, T> {
    /// Publishes `result` and hands it back to the leader.
    pub(crate) fn complete(mut self, result: Result<T>) -> Result<T> {
        self.retire(result.clone());
        self.completed = true;
        result
    }

    fn retire(&self, result: Result<T>) {
        self.flight.publish(result);
        self.flights.inflight.lock().remove(&self.key);
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Drop for FlightGuard<'_, K, T> {
    fn drop(&mut self) {
        if !self.completed {
            self.retire(Err(HoardError::internal(
                "load abandoned before it completed",
            )));
        }
    }
}
