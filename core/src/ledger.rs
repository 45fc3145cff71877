//! Ledger trait and related types.
//!
//! The ledger is the engine's only storage: an append-only log of
//! transactions, each an all-or-nothing batch of [`SerializedRecord`]s.
//! The ledger provides the total order; the engine provides the rules.
//!
//! # Optimistic Concurrency
//!
//! Every submission names the [`Height`] the submitter decided against. If
//! another transaction was committed in the meantime the ledger rejects the
//! submission with [`LedgerError::HeightConflict`] and nothing is written.
//!
//! # Implementations
//!
//! - `InMemoryLedger` (in `nfticket-testing`): fast, deterministic tests with
//!   failure injection
//! - chain adapters live outside this workspace

use crate::record::SerializedRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`Ledger`] methods.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 'a>>;

/// Number of transactions committed to a ledger.
///
/// A fresh ledger is at [`Height::GENESIS`]. Committing one transaction moves
/// it to `height.next()`.
///
/// # Examples
///
/// ```
/// use nfticket_core::ledger::Height;
///
/// let genesis = Height::GENESIS;
/// assert_eq!(genesis.next(), Height::new(1));
/// assert_eq!(Height::new(5).value(), 5);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height(u64);

impl Height {
    /// Height of an empty ledger.
    pub const GENESIS: Self = Self(0);

    /// Create a height from a raw transaction count.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw transaction count.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Height after one more commit.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A batch of records submitted by one caller.
///
/// The ledger either commits every record of a transaction or none of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identity of the submitter (wallet address).
    pub submitter: String,
    /// Engine time at which the transaction was decided.
    pub submitted_at: DateTime<Utc>,
    /// Records in application order.
    pub records: Vec<SerializedRecord>,
}

impl Transaction {
    /// Create a new transaction.
    #[must_use]
    pub fn new(
        submitter: impl Into<String>,
        submitted_at: DateTime<Utc>,
        records: Vec<SerializedRecord>,
    ) -> Self {
        Self {
            submitter: submitter.into(),
            submitted_at,
            records,
        }
    }

    /// Whether any record in this transaction has the given type name.
    #[must_use]
    pub fn contains(&self, record_type: &str) -> bool {
        self.records.iter().any(|r| r.record_type == record_type)
    }
}

/// A transaction together with the height it was committed at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedTransaction {
    /// Height of the ledger after this transaction (1-based).
    pub height: Height,
    /// The committed transaction.
    pub transaction: Transaction,
}

/// Confirmation returned by a successful submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Height of the ledger after the commit.
    pub height: Height,
    /// Number of records committed.
    pub record_count: usize,
}

/// Errors reported by a ledger backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Another transaction was committed after the submitter read state.
    #[error("Height conflict: expected {expected}, ledger is at {actual}")]
    HeightConflict {
        /// The height the submitter decided against.
        expected: Height,
        /// The ledger's current height.
        actual: Height,
    },

    /// The backend refused the transaction (for example a value transfer failed).
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// The external append-only store the engine submits transactions to.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the engine can
/// hold an `Arc<dyn Ledger>`.
pub trait Ledger: Send + Sync {
    /// Atomically commit a transaction if the ledger is still at `expected`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::HeightConflict`]: the ledger moved past `expected`
    /// - [`LedgerError::Rejected`]: the backend refused the transaction
    /// - [`LedgerError::Unavailable`]: the backend could not be reached
    fn submit(&self, expected: Height, transaction: Transaction) -> LedgerFuture<'_, Receipt>;

    /// Current height.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the backend cannot be reached.
    fn height(&self) -> LedgerFuture<'_, Height>;

    /// Load committed transactions with a height strictly greater than `after`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the backend cannot be reached.
    fn load(&self, after: Height) -> LedgerFuture<'_, Vec<CommittedTransaction>>;
}
