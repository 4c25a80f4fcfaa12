//! Concurrency Counter (spec §3, §4.4, §4.5): a mutex-guarded stream count
//! with an optional admission cap. `cap == 0` means unlimited.

use std::sync::Mutex;

pub struct ConcurrencyCounter {
    cap: usize,
    count: Mutex<usize>,
}

impl ConcurrencyCounter {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            count: Mutex::new(0),
        }
    }

    /// Attempt to admit one stream. Returns `true` and increments if under
    /// the cap (or the cap is disabled); returns `false` without mutating
    /// state otherwise.
    pub fn try_admit(&self) -> bool {
        if self.cap == 0 {
            let mut count = self.count.lock().unwrap();
            *count += 1;
            return true;
        }
        let mut count = self.count.lock().unwrap();
        if *count >= self.cap {
            return false;
        }
        *count += 1;
        true
    }

    pub fn release(&self) {
        let mut count = self.count.lock().unwrap();
        *count = count.saturating_sub(1);
    }

    pub fn current(&self) -> usize {
        *self.count.lock().unwrap()
    }

    /// Used by the R-side Local Dialer's advisory pacing (spec §4.5,
    /// Open Question 3): true once the cap would block a new `AcceptStream`.
    pub fn at_cap(&self) -> bool {
        self.cap > 0 && self.current() >= self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_when_cap_zero() {
        let c = ConcurrencyCounter::new(0);
        for _ in 0..1000 {
            assert!(c.try_admit());
        }
        assert!(!c.at_cap());
    }

    #[test]
    fn rejects_at_cap() {
        let c = ConcurrencyCounter::new(2);
        assert!(c.try_admit());
        assert!(c.try_admit());
        assert!(!c.try_admit());
        c.release();
        assert!(c.try_admit());
    }
}
