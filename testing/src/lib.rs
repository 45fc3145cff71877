//! # NFTicket Testing
//!
//! Test doubles for the NFTicket marketplace engine.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - An in-memory ledger with failure injection ([`InMemoryLedger`])
//!
//! ## Example
//!
//! ```ignore
//! use nfticket_testing::{InMemoryLedger, ManualClock, test_clock};
//!
//! #[tokio::test]
//! async fn cooldown_elapses() {
//!     let clock = Arc::new(ManualClock::starting_at(test_clock().now()));
//!     let ledger = Arc::new(InMemoryLedger::new());
//!     let engine = MarketEngine::new(MarketEnvironment::new(clock.clone(), ledger), owner);
//!
//!     clock.advance(chrono::Duration::hours(24));
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use nfticket_core::environment::Clock;

pub mod ledger;

/// Mock clocks for deterministic tests.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{PoisonError, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use nfticket_testing::mocks::FixedClock;
    /// use nfticket_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test moves it.
    ///
    /// Cooldowns and event dates are exercised by advancing this clock between
    /// engine calls.
    ///
    /// # Example
    ///
    /// ```
    /// use nfticket_testing::mocks::ManualClock;
    /// use nfticket_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::starting_at(start);
    /// clock.advance(Duration::hours(24));
    /// assert_eq!(clock.now(), start + Duration::hours(24));
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`.
        #[must_use]
        pub const fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Move the clock forward (or backward, for a negative duration).
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// The instant every default test clock starts at (2025-01-01 00:00:00 UTC).
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600)
    }
}

// Re-export commonly used items
pub use ledger::InMemoryLedger;
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::starting_at(test_epoch());
        assert_eq!(clock.now(), test_epoch());

        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), test_epoch() + Duration::seconds(90));

        clock.set(test_epoch());
        assert_eq!(clock.now(), test_epoch());
    }
}
