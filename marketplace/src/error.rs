//! Error types for marketplace operations.

use crate::types::{Amount, EventId, Identity, TokenId};
use chrono::Duration;
use nfticket_core::ledger::LedgerError;
use nfticket_core::record::RecordError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// The kind of record a lookup failed to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    /// An event
    Event,
    /// A ticket token
    Ticket,
    /// A resale listing
    Listing,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Event => "Event",
            Self::Ticket => "Ticket",
            Self::Listing => "Listing",
        };
        f.write_str(name)
    }
}

/// The role a caller needed but did not hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Organizer of the event in question
    Organizer,
    /// Current owner of the ticket
    TicketOwner,
    /// Seller of the listing
    Seller,
    /// Platform owner
    PlatformOwner,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Organizer => "event organizer",
            Self::TicketOwner => "ticket owner",
            Self::Seller => "listing seller",
            Self::PlatformOwner => "platform owner",
        };
        f.write_str(name)
    }
}

/// Every way a marketplace operation can fail.
///
/// Errors are returned to the immediate caller with enough structure to act on
/// (the remaining cooldown, the maximum allowed price, the expected payment).
/// A failed operation never leaves partial state behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketError {
    // ═══════════════════════════════════════════════════════════
    // Input and Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// Bad input shape or range.
    #[error("Invalid input: {reason}")]
    Validation {
        /// What was wrong
        reason: String,
    },

    /// Unknown id.
    #[error("{entity} {id} does not exist")]
    NotFound {
        /// Kind of record
        entity: Entity,
        /// The id that was looked up
        id: u64,
    },

    /// Caller lacks the required role.
    #[error("{caller} is not the {required}")]
    Unauthorized {
        /// Who called
        caller: Identity,
        /// Role that was required
        required: Role,
    },

    // ═══════════════════════════════════════════════════════════
    // Minting Preconditions
    // ═══════════════════════════════════════════════════════════

    /// The event has been deactivated; no tickets can be minted.
    #[error("Event {0} is not active")]
    EventInactive(EventId),

    /// Every ticket for the event has been minted.
    #[error("Event {event_id} is sold out ({max_tickets} tickets)")]
    SoldOut {
        /// The event
        event_id: EventId,
        /// Its capacity
        max_tickets: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // State Machine Violations
    // ═══════════════════════════════════════════════════════════

    /// The ticket has already been checked in.
    #[error("Ticket {0} has already been used")]
    AlreadyUsed(TokenId),

    /// The event was already deactivated.
    #[error("Event {0} is already inactive")]
    AlreadyInactive(EventId),

    /// The ticket already has an active listing.
    #[error("Ticket {0} is already listed")]
    AlreadyListed(TokenId),

    /// The ticket has no active listing.
    #[error("Ticket {0} is not listed for sale")]
    NotListed(TokenId),

    // ═══════════════════════════════════════════════════════════
    // Resale Economics
    // ═══════════════════════════════════════════════════════════

    /// The ticket changed hands too recently to be listed.
    #[error("Transfer cooldown in effect, time left: {}", format_time_left(.remaining))]
    Cooldown {
        /// The ticket
        token_id: TokenId,
        /// How long until it may be listed
        remaining: Duration,
    },

    /// The asking price exceeds the resale cap.
    #[error("Price {price} exceeds the resale cap of {max_price}")]
    PriceCap {
        /// Requested price
        price: Amount,
        /// Highest price allowed for this ticket
        max_price: Amount,
    },

    /// The payment does not match the quoted amount exactly.
    #[error("Payment mismatch: expected {expected}, received {received}")]
    PaymentMismatch {
        /// Quoted amount
        expected: Amount,
        /// Amount sent
        received: Amount,
    },

    /// The buyer is the seller of the listing.
    #[error("Cannot buy your own listing for ticket {0}")]
    SelfPurchase(TokenId),

    // ═══════════════════════════════════════════════════════════
    // Backend Errors
    // ═══════════════════════════════════════════════════════════

    /// The ledger refused or could not commit the transaction.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A record could not be encoded or decoded.
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// Coarse classification of [`MarketError`] used on the wire and in metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// [`MarketError::Validation`]
    Validation,
    /// [`MarketError::NotFound`]
    NotFound,
    /// [`MarketError::Unauthorized`]
    Authorization,
    /// [`MarketError::EventInactive`]
    Inactive,
    /// [`MarketError::SoldOut`]
    Capacity,
    /// [`MarketError::AlreadyUsed`]
    AlreadyUsed,
    /// [`MarketError::AlreadyInactive`]
    AlreadyInactive,
    /// [`MarketError::AlreadyListed`]
    AlreadyListed,
    /// [`MarketError::NotListed`]
    NotListed,
    /// [`MarketError::Cooldown`]
    Cooldown,
    /// [`MarketError::PriceCap`]
    PriceCap,
    /// [`MarketError::PaymentMismatch`]
    PaymentMismatch,
    /// [`MarketError::SelfPurchase`]
    SelfPurchase,
    /// [`MarketError::Ledger`] or [`MarketError::Record`]
    Backend,
}

impl ErrorKind {
    /// Stable label for metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Authorization => "authorization",
            Self::Inactive => "inactive",
            Self::Capacity => "capacity",
            Self::AlreadyUsed => "already_used",
            Self::AlreadyInactive => "already_inactive",
            Self::AlreadyListed => "already_listed",
            Self::NotListed => "not_listed",
            Self::Cooldown => "cooldown",
            Self::PriceCap => "price_cap",
            Self::PaymentMismatch => "payment_mismatch",
            Self::SelfPurchase => "self_purchase",
            Self::Backend => "backend",
        }
    }
}

impl MarketError {
    /// Shorthand for [`MarketError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// The error's kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::EventInactive(_) => ErrorKind::Inactive,
            Self::SoldOut { .. } => ErrorKind::Capacity,
            Self::AlreadyUsed(_) => ErrorKind::AlreadyUsed,
            Self::AlreadyInactive(_) => ErrorKind::AlreadyInactive,
            Self::AlreadyListed(_) => ErrorKind::AlreadyListed,
            Self::NotListed(_) => ErrorKind::NotListed,
            Self::Cooldown { .. } => ErrorKind::Cooldown,
            Self::PriceCap { .. } => ErrorKind::PriceCap,
            Self::PaymentMismatch { .. } => ErrorKind::PaymentMismatch,
            Self::SelfPurchase(_) => ErrorKind::SelfPurchase,
            Self::Ledger(_) | Self::Record(_) => ErrorKind::Backend,
        }
    }

    /// Returns `true` if the caller can fix this by changing the request.
    ///
    /// # Examples
    ///
    /// ```
    /// # use nfticket_marketplace::error::MarketError;
    /// # use nfticket_marketplace::types::TokenId;
    /// assert!(MarketError::SelfPurchase(TokenId::new(1)).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Ledger(_) | Self::Record(_))
    }
}

/// Human-readable remaining time, e.g. `"3h 12m 0s"`, `"4m 2s"`, `"9s"`.
///
/// Negative durations read as `"0s"`.
#[must_use]
pub fn format_time_left(remaining: &Duration) -> String {
    let seconds = remaining.num_seconds().max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_left_formats_like_the_ui() {
        assert_eq!(format_time_left(&Duration::seconds(3 * 3600 + 12 * 60)), "3h 12m 0s");
        assert_eq!(format_time_left(&Duration::seconds(242)), "4m 2s");
        assert_eq!(format_time_left(&Duration::seconds(9)), "9s");
        assert_eq!(format_time_left(&Duration::seconds(-5)), "0s");
    }

    #[test]
    fn cooldown_message_carries_remaining_time() {
        let error = MarketError::Cooldown {
            token_id: TokenId::new(1),
            remaining: Duration::minutes(192),
        };
        assert_eq!(
            error.to_string(),
            "Transfer cooldown in effect, time left: 3h 12m 0s"
        );
        assert_eq!(error.kind(), ErrorKind::Cooldown);
    }

    #[test]
    fn backend_errors_are_not_user_errors() {
        let error = MarketError::from(LedgerError::Rejected("transfer failed".to_string()));
        assert_eq!(error.kind(), ErrorKind::Backend);
        assert!(!error.is_user_error());
        assert!(MarketError::validation("empty title").is_user_error());
    }

    #[test]
    fn not_found_names_the_entity() {
        let error = MarketError::NotFound {
            entity: Entity::Ticket,
            id: 42,
        };
        assert_eq!(error.to_string(), "Ticket 42 does not exist");
    }
}
