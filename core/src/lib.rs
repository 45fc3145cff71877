//! # NFTicket Core
//!
//! Ledger abstractions shared by the NFTicket marketplace engine.
//!
//! The marketplace engine is a rule evaluator. It never owns durable state:
//! every state transition it accepts is encoded as a batch of records and
//! submitted to an external, append-only, consensus-ordered ledger (in
//! production a blockchain; in tests an in-memory log). This crate defines
//! the seam between the two.
//!
//! ## Core Concepts
//!
//! - **Record**: an immutable fact produced by the engine ([`record::LedgerRecord`])
//! - **Transaction**: an all-or-nothing batch of records submitted by one caller
//! - **Height**: the number of transactions the ledger has committed
//! - **Ledger**: the backing store that totally orders transactions ([`ledger::Ledger`])
//! - **Clock**: the source of "now" ([`environment::Clock`])
//!
//! ## Example
//!
//! ```ignore
//! use nfticket_core::ledger::{Ledger, Height, Transaction};
//!
//! async fn submit<L: Ledger>(ledger: &L, tx: Transaction) {
//!     let height = ledger.height().await?;
//!     let receipt = ledger.submit(height, tx).await?;
//!     assert_eq!(receipt.height, height.next());
//! }
//! ```

pub use chrono::{DateTime, Utc};

pub mod ledger;
pub mod record;

/// Environment module - capabilities injected into the engine
///
/// The engine never reads ambient global state. Time comes from a [`Clock`],
/// the caller identity is an explicit argument, and storage is a
/// [`Ledger`](crate::ledger::Ledger) handle.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use nfticket_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time from the operating system.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
