//! Ledger records: the immutable facts the engine submits for commitment.
//!
//! Records are serialized with `bincode`. Each record type carries a stable,
//! versioned name (`"TicketMinted.v1"`) so that replaying a ledger written by an
//! older engine can route bytes to the right decoder.
//!
//! # Example
//!
//! ```
//! use nfticket_core::record::{LedgerRecord, SerializedRecord};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! enum CounterRecord {
//!     Incremented { by: u64 },
//! }
//!
//! impl LedgerRecord for CounterRecord {
//!     fn record_type(&self) -> &'static str {
//!         match self {
//!             CounterRecord::Incremented { .. } => "Incremented.v1",
//!         }
//!     }
//! }
//!
//! let record = CounterRecord::Incremented { by: 2 };
//! let serialized = SerializedRecord::from_record(&record).unwrap();
//! assert_eq!(serialized.record_type, "Incremented.v1");
//! assert_eq!(CounterRecord::from_bytes(&serialized.data).unwrap(), record);
//! ```

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Why a record could not be encoded or decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// bincode refused the record
    #[error("Cannot encode record: {0}")]
    Encode(String),

    /// Stored bytes are not a valid record of the expected schema
    #[error("Cannot decode record: {0}")]
    Decode(String),

    /// The bytes decoded, but into a different record type than the one stored
    #[error("Record stored as {stored} decoded as {decoded}")]
    TypeMismatch {
        /// Type name kept alongside the bytes
        stored: String,
        /// Type name reported by the decoded value
        decoded: &'static str,
    },
}

/// A fact the marketplace commits to the ledger.
///
/// State is a fold over committed records, so every variant must stay
/// decodable for as long as ledgers written with it exist. Bump the version
/// suffix of [`record_type`](Self::record_type) instead of changing a
/// variant's shape.
pub trait LedgerRecord: Send + Sync + 'static {
    /// Versioned type name stored next to the bytes, e.g. `"TicketSold.v1"`.
    fn record_type(&self) -> &'static str;

    /// bincode encoding of the record.
    ///
    /// # Errors
    ///
    /// [`RecordError::Encode`] if bincode cannot encode the value.
    fn to_bytes(&self) -> Result<Vec<u8>, RecordError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| RecordError::Encode(e.to_string()))
    }

    /// Inverse of [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// [`RecordError::Decode`] for truncated or foreign bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| RecordError::Decode(e.to_string()))
    }
}

/// A record in its stored form: type name plus encoded bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRecord {
    /// The record type identifier (e.g. `"TicketMinted.v1"`).
    pub record_type: String,

    /// The bincode-encoded record.
    pub data: Vec<u8>,
}

impl SerializedRecord {
    /// Create a serialized record from raw parts.
    #[must_use]
    pub const fn new(record_type: String, data: Vec<u8>) -> Self {
        Self { record_type, data }
    }

    /// Encode a [`LedgerRecord`] under its type name.
    ///
    /// # Errors
    ///
    /// [`RecordError::Encode`] if bincode cannot encode the value.
    pub fn from_record<R: LedgerRecord + Serialize>(record: &R) -> Result<Self, RecordError> {
        Ok(Self {
            record_type: record.record_type().to_string(),
            data: record.to_bytes()?,
        })
    }

    /// Decode as `R`, then check the value agrees with the stored type name.
    ///
    /// # Errors
    ///
    /// [`RecordError::Decode`] for bad bytes, [`RecordError::TypeMismatch`]
    /// when the bytes decode into a different variant than the name says.
    pub fn decode<R: LedgerRecord + DeserializeOwned>(&self) -> Result<R, RecordError> {
        let record = R::from_bytes(&self.data)?;
        let decoded = record.record_type();
        if decoded != self.record_type {
            return Err(RecordError::TypeMismatch {
                stored: self.record_type.clone(),
                decoded,
            });
        }
        Ok(record)
    }
}

impl fmt::Display for SerializedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.record_type, self.data.len())
    }
}
