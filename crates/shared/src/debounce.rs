use std::time::{Duration, Instant};

/// Delay between the last keystroke and the search being applied.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Handle for one pushed value. Only the latest token can ever settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceToken(u64);

#[derive(Debug)]
struct Pending<T> {
    token: DebounceToken,
    value: T,
    due: Instant,
}

/// Collapses bursts of input into the last value.
///
/// Time is passed in by the caller so the debouncer itself never sleeps;
/// the caller waits out `delay()` and then calls `settle`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    counter: u64,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            counter: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces whatever was pending; earlier tokens are dead from here on.
    pub fn push(&mut self, value: T, now: Instant) -> DebounceToken {
        self.counter += 1;
        let token = DebounceToken(self.counter);
        self.pending = Some(Pending {
            token,
            value,
            due: now + self.delay,
        });
        token
    }

    /// Hands the value out if `token` is still the latest and its delay
    /// has passed.
    pub fn settle(&mut self, token: DebounceToken, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if pending.token == token && now >= pending.due => {
                self.pending.take().map(|pending| pending.value)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}
