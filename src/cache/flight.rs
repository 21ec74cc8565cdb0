//! Singleflight Coordinator
//!
//! Collapses concurrent computations of the same key into one. The first
//! caller for a cold key becomes the leader and runs the producer; callers
//! arriving while it runs park on a watch channel until the leader publishes
//! its outcome.
//!
//! The in-flight map has its own lock, separate from the store lock, so
//! parked followers never hold the data-plane lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{CacheError, ProducerError, Result};

/// What the leader publishes to its followers.
pub(crate) type Outcome<V> = std::result::Result<Arc<V>, ProducerError>;

type Slot<V> = Option<Outcome<V>>;

struct Flight<V> {
    id: u64,
    outcome: watch::Receiver<Slot<V>>,
}

// == Flights ==
/// Registry of in-flight computations keyed by cache key.
pub(crate) struct Flights<V> {
    inflight: Mutex<HashMap<String, Flight<V>>>,
    next_id: AtomicU64,
}

/// Outcome of trying to join a computation.
pub(crate) enum Role<'a, V> {
    /// The value turned up in the cache while registering
    Cached(Arc<V>),
    /// This caller runs the producer
    Leader(FlightLeader<'a, V>),
    /// Another caller is already running the producer
    Follower(FlightFollower<V>),
}

impl<V> Flights<V> {
    pub(crate) fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Joins the computation for `key`, becoming leader if none is running.
    ///
    /// `recheck` runs under the in-flight lock before a new leader registers;
    /// returning a value there avoids recomputing a key that a previous
    /// leader populated between the caller's miss and this call.
    pub(crate) fn join<F>(&self, key: &str, recheck: F) -> Role<'_, V>
    where
        F: FnOnce() -> Option<Arc<V>>,
    {
        let mut inflight = self.inflight.lock();

        if let Some(flight) = inflight.get(key) {
            debug!(key, "joining in-flight computation");
            return Role::Follower(FlightFollower {
                key: key.to_string(),
                outcome: flight.outcome.clone(),
            });
        }

        if let Some(value) = recheck() {
            return Role::Cached(value);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        inflight.insert(key.to_string(), Flight { id, outcome: rx });
        debug!(key, "leading computation");

        Role::Leader(FlightLeader {
            flights: self,
            key: key.to_string(),
            id,
            tx,
        })
    }

    /// Number of computations currently running.
    pub(crate) fn len(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Unregisters flight `id` for `key`, leaving a newer flight alone.
    fn release(&self, key: &str, id: u64) {
        let mut inflight = self.inflight.lock();
        if inflight.get(key).is_some_and(|flight| flight.id == id) {
            inflight.remove(key);
        }
    }
}

// == Leader ==
/// Handle held by the caller running the producer.
///
/// Dropping it without calling [`FlightLeader::finish`] unregisters the
/// flight and wakes followers with [`CacheError::Cancelled`].
pub(crate) struct FlightLeader<'a, V> {
    flights: &'a Flights<V>,
    key: String,
    id: u64,
    tx: watch::Sender<Slot<V>>,
}

impl<V> FlightLeader<'_, V> {
    /// Unregisters the flight, then hands `outcome` to every follower.
    pub(crate) fn finish(self, outcome: Outcome<V>) {
        self.flights.release(&self.key, self.id);
        // Err only means nobody was waiting.
        let _ = self.tx.send(Some(outcome));
    }
}

impl<V> Drop for FlightLeader<'_, V> {
    fn drop(&mut self) {
        self.flights.release(&self.key, self.id);
    }
}

// == Follower ==
/// Handle held by a caller waiting on someone else's computation.
pub(crate) struct FlightFollower<V> {
    key: String,
    outcome: watch::Receiver<Slot<V>>,
}

impl<V> FlightFollower<V> {
    /// Parks until the leader publishes, or until `timeout` passes.
    ///
    /// Timing out detaches only this follower; the leader keeps running.
    pub(crate) async fn wait(mut self, timeout: Option<Duration>) -> Result<Arc<V>> {
        let published = {
            let ready = self.outcome.wait_for(Option::is_some);
            let waited = match timeout {
                Some(limit) => match tokio::time::timeout(limit, ready).await {
                    Ok(waited) => waited,
                    Err(_) => {
                        return Err(CacheError::Timeout {
                            key: self.key,
                            waited_ms: limit.as_millis() as u64,
                        })
                    }
                },
                None => ready.await,
            };
            match waited {
                Ok(slot) => (*slot).clone(),
                Err(_) => None,
            }
        };

        match published {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(CacheError::Producer(err)),
            None => Err(CacheError::Cancelled(self.key)),
        }
    }
}
