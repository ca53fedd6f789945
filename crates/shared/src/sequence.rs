use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

/// Locks a mutex, taking the data back out of a poisoned lock.
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identifies one started fetch for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    slot: String,
    generation: u64,
}

impl FetchTicket {
    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Orders fetches per slot so a slow, earlier request can never overwrite
/// the result of a later one.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    generations: HashMap<String, u64>,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch, superseding every earlier ticket for the slot.
    pub fn begin(&mut self, slot: &str) -> FetchTicket {
        let generation = self.generations.entry(slot.to_string()).or_insert(0);
        *generation += 1;
        FetchTicket {
            slot: slot.to_string(),
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.generations.get(&ticket.slot) == Some(&ticket.generation)
    }

    /// True when `ticket` may commit its result. Superseded tickets are
    /// logged and must be dropped by the caller.
    pub fn complete(&self, ticket: &FetchTicket) -> bool {
        let current = self.is_current(ticket);
        if !current {
            debug!(
                "Discarding superseded {} response (generation {})",
                ticket.slot, ticket.generation
            );
        }
        current
    }

    /// Supersedes outstanding tickets without starting a new fetch.
    pub fn invalidate(&mut self, slot: &str) {
        *self.generations.entry(slot.to_string()).or_insert(0) += 1;
    }
}

/// At most one fetch in flight per resource key.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another fetch for `key` is still running.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightGuard> {
        let mut keys = lock_or_recover(&self.keys);
        if !keys.insert(key.to_string()) {
            debug!("Fetch for {} already in flight", key);
            return None;
        }
        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        lock_or_recover(&self.keys).contains(key)
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock_or_recover(&self.keys).remove(&self.key);
    }
}
