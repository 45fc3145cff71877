//! Per-transaction capabilities.

use crate::types::Identity;
use chrono::{DateTime, Utc};

/// Who is submitting the transaction and when it is being decided.
///
/// Built by the engine from the explicit caller argument and its injected
/// clock; components never read ambient time or identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxContext {
    /// Submitter of the transaction
    pub caller: Identity,
    /// Decision time
    pub now: DateTime<Utc>,
}

impl TxContext {
    /// Create a context.
    #[must_use]
    pub const fn new(caller: Identity, now: DateTime<Utc>) -> Self {
        Self { caller, now }
    }
}
