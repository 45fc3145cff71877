//! In-memory ledger for tests.
//!
//! Commits are serialized by a single mutex, giving the same total order a
//! consensus ledger would. Failures can be injected to exercise the engine's
//! all-or-nothing guarantees.

use nfticket_core::ledger::{
    CommittedTransaction, Height, Ledger, LedgerError, LedgerFuture, Receipt, Transaction,
};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    committed: Vec<CommittedTransaction>,
    reject_next: Option<String>,
    reject_record_type: Option<String>,
    offline: bool,
}

/// Append-only ledger held in memory.
///
/// # Failure Injection
///
/// - [`reject_next`](Self::reject_next): refuse the next submission only
/// - [`reject_record_type`](Self::reject_record_type): refuse every submission
///   containing a record of the given type (e.g. a failing value transfer)
/// - [`set_offline`](Self::set_offline): make every call fail as unavailable
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: Mutex<Inner>,
}

impl InMemoryLedger {
    /// Create an empty ledger at [`Height::GENESIS`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next submitted transaction with `reason`.
    pub async fn reject_next(&self, reason: impl Into<String>) {
        self.inner.lock().await.reject_next = Some(reason.into());
    }

    /// Refuse any transaction that contains a record of `record_type`.
    pub async fn reject_record_type(&self, record_type: impl Into<String>) {
        self.inner.lock().await.reject_record_type = Some(record_type.into());
    }

    /// Stop refusing transactions by record type.
    pub async fn clear_rejections(&self) {
        let mut inner = self.inner.lock().await;
        inner.reject_next = None;
        inner.reject_record_type = None;
    }

    /// Toggle availability.
    pub async fn set_offline(&self, offline: bool) {
        self.inner.lock().await.offline = offline;
    }

    /// Snapshot of every committed transaction, oldest first.
    pub async fn committed(&self) -> Vec<CommittedTransaction> {
        self.inner.lock().await.committed.clone()
    }

    /// Commit a transaction without a height check, as an external writer would.
    pub async fn force_commit(&self, transaction: Transaction) -> Height {
        let mut inner = self.inner.lock().await;
        let height = current_height(&inner).next();
        inner.committed.push(CommittedTransaction {
            height,
            transaction,
        });
        height
    }
}

fn current_height(inner: &Inner) -> Height {
    inner.committed.last().map_or(Height::GENESIS, |c| c.height)
}

impl Ledger for InMemoryLedger {
    fn submit(&self, expected: Height, transaction: Transaction) -> LedgerFuture<'_, Receipt> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner.offline {
                return Err(LedgerError::Unavailable("ledger offline".to_string()));
            }

            let actual = current_height(&inner);
            if actual != expected {
                tracing::debug!(%expected, %actual, "Rejecting stale submission");
                return Err(LedgerError::HeightConflict { expected, actual });
            }

            if let Some(reason) = inner.reject_next.take() {
                return Err(LedgerError::Rejected(reason));
            }

            if let Some(record_type) = &inner.reject_record_type {
                if transaction.contains(record_type) {
                    return Err(LedgerError::Rejected(format!(
                        "{record_type} could not be settled"
                    )));
                }
            }

            let height = actual.next();
            let record_count = transaction.records.len();
            inner.committed.push(CommittedTransaction {
                height,
                transaction,
            });
            tracing::trace!(%height, record_count, "Committed transaction");

            Ok(Receipt {
                height,
                record_count,
            })
        })
    }

    fn height(&self) -> LedgerFuture<'_, Height> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            if inner.offline {
                return Err(LedgerError::Unavailable("ledger offline".to_string()));
            }
            Ok(current_height(&inner))
        })
    }

    fn load(&self, after: Height) -> LedgerFuture<'_, Vec<CommittedTransaction>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            if inner.offline {
                return Err(LedgerError::Unavailable("ledger offline".to_string()));
            }
            Ok(inner
                .committed
                .iter()
                .filter(|c| c.height > after)
                .cloned()
                .collect())
        })
    }
}
