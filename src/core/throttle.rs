//! Purpose: Enforce a minimum wall-clock interval between outbound call starts.
//! Exports: `Throttle`.
//! Role: Global gate shared by every operation on a client; nothing bypasses it.
//! Invariants: Check, wait, and record happen inside one critical section.
//! Invariants: Spacing is measured start-to-start, not end-to-start.
//! Invariants: `acquire` cannot fail; it can only delay the caller.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until `min_interval` has elapsed since the previously recorded
    /// call start, then records a new start. Holding the lock across the
    /// sleep is what serializes concurrent callers: the second caller waits
    /// its full interval measured from the start the first one recorded.
    pub fn acquire(&self) {
        let mut last_start = self
            .last_start
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        if let Some(previous) = *last_start {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::trace!(wait_ms = wait.as_millis() as u64, "throttle waiting");
                thread::sleep(wait);
            }
        }
        *last_start = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::Throttle;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn first_acquire_does_not_wait() {
        let throttle = Throttle::new(Duration::from_secs(5));
        let start = Instant::now();
        throttle.acquire();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn back_to_back_acquires_are_spaced() {
        let interval = Duration::from_millis(40);
        let throttle = Throttle::new(interval);
        throttle.acquire();
        let first = Instant::now();
        throttle.acquire();
        assert!(first.elapsed() >= interval);
    }

    #[test]
    fn zero_interval_never_blocks() {
        let throttle = Throttle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            throttle.acquire();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn concurrent_acquires_serialize() {
        let interval = Duration::from_millis(30);
        let throttle = Arc::new(Throttle::new(interval));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                thread::spawn(move || throttle.acquire())
            })
            .collect();
        for handle in handles {
            handle.join().expect("acquire thread");
        }

        // Three starts need at least two full intervals between them.
        assert!(start.elapsed() >= interval * 2);
    }
}
