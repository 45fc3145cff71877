//! Records committed to the ledger.
//!
//! Each successful operation produces one transaction of these records. They
//! are the source of truth: engine state is a projection of the committed
//! record sequence and can be rebuilt from it at any time.

use crate::types::{Amount, Event, EventId, Identity, Listing, ListingId, Ticket, TokenId};
use chrono::{DateTime, Utc};
use nfticket_core::record::LedgerRecord;
use serde::{Deserialize, Serialize};

/// Stable record type names, as stored on the ledger.
pub mod record_types {
    /// [`MarketRecord::EventCreated`](super::MarketRecord::EventCreated)
    pub const EVENT_CREATED: &str = "EventCreated.v1";
    /// [`MarketRecord::EventDeactivated`](super::MarketRecord::EventDeactivated)
    pub const EVENT_DEACTIVATED: &str = "EventDeactivated.v1";
    /// [`MarketRecord::OrganizerVerified`](super::MarketRecord::OrganizerVerified)
    pub const ORGANIZER_VERIFIED: &str = "OrganizerVerified.v1";
    /// [`MarketRecord::TicketMinted`](super::MarketRecord::TicketMinted)
    pub const TICKET_MINTED: &str = "TicketMinted.v1";
    /// [`MarketRecord::TicketUsed`](super::MarketRecord::TicketUsed)
    pub const TICKET_USED: &str = "TicketUsed.v1";
    /// [`MarketRecord::TicketListed`](super::MarketRecord::TicketListed)
    pub const TICKET_LISTED: &str = "TicketListed.v1";
    /// [`MarketRecord::ListingCancelled`](super::MarketRecord::ListingCancelled)
    pub const LISTING_CANCELLED: &str = "ListingCancelled.v1";
    /// [`MarketRecord::TicketSold`](super::MarketRecord::TicketSold)
    pub const TICKET_SOLD: &str = "TicketSold.v1";
    /// [`MarketRecord::FundsTransferred`](super::MarketRecord::FundsTransferred)
    pub const FUNDS_TRANSFERRED: &str = "FundsTransferred.v1";
    /// [`MarketRecord::FundsWithdrawn`](super::MarketRecord::FundsWithdrawn)
    pub const FUNDS_WITHDRAWN: &str = "FundsWithdrawn.v1";
}

/// Why value moved during a resale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutKind {
    /// Organizer's cut
    Royalty,
    /// Remainder to the seller
    SaleProceeds,
}

/// A committed fact about the marketplace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketRecord {
    /// An organizer created an event.
    EventCreated {
        /// The event as created (sold = 0, active)
        event: Event,
    },

    /// The organizer deactivated an event.
    EventDeactivated {
        /// The event
        event_id: EventId,
        /// When
        deactivated_at: DateTime<Utc>,
    },

    /// The platform owner verified an organizer.
    OrganizerVerified {
        /// The organizer
        organizer: Identity,
        /// When
        verified_at: DateTime<Utc>,
    },

    /// A ticket was minted against an event; the payment went to escrow.
    TicketMinted {
        /// The new ticket
        ticket: Ticket,
        /// Payment accepted (equals the event's ticket price)
        payment: Amount,
    },

    /// The organizer checked a ticket in.
    TicketUsed {
        /// The ticket
        token_id: TokenId,
        /// Its event
        event_id: EventId,
        /// When
        used_at: DateTime<Utc>,
    },

    /// The owner listed a ticket for resale.
    TicketListed {
        /// The new listing
        listing: Listing,
    },

    /// The seller withdrew a listing.
    ListingCancelled {
        /// The listing
        listing_id: ListingId,
        /// Its ticket
        token_id: TokenId,
        /// When
        cancelled_at: DateTime<Utc>,
    },

    /// A listing was bought; ownership moved to the buyer.
    TicketSold {
        /// The listing
        listing_id: ListingId,
        /// Its ticket
        token_id: TokenId,
        /// Previous owner
        seller: Identity,
        /// New owner
        buyer: Identity,
        /// Sale price
        price: Amount,
        /// When (re-arms the transfer cooldown)
        sold_at: DateTime<Utc>,
    },

    /// Value credited to an account as part of a resale.
    FundsTransferred {
        /// Recipient
        to: Identity,
        /// Amount credited
        amount: Amount,
        /// Royalty or seller proceeds
        kind: PayoutKind,
        /// The ticket sold
        token_id: TokenId,
    },

    /// The platform owner withdrew the primary-sale escrow.
    FundsWithdrawn {
        /// Recipient (platform owner)
        to: Identity,
        /// Amount moved out of escrow
        amount: Amount,
        /// When
        withdrawn_at: DateTime<Utc>,
    },
}

impl LedgerRecord for MarketRecord {
    fn record_type(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => record_types::EVENT_CREATED,
            Self::EventDeactivated { .. } => record_types::EVENT_DEACTIVATED,
            Self::OrganizerVerified { .. } => record_types::ORGANIZER_VERIFIED,
            Self::TicketMinted { .. } => record_types::TICKET_MINTED,
            Self::TicketUsed { .. } => record_types::TICKET_USED,
            Self::TicketListed { .. } => record_types::TICKET_LISTED,
            Self::ListingCancelled { .. } => record_types::LISTING_CANCELLED,
            Self::TicketSold { .. } => record_types::TICKET_SOLD,
            Self::FundsTransferred { .. } => record_types::FUNDS_TRANSFERRED,
            Self::FundsWithdrawn { .. } => record_types::FUNDS_WITHDRAWN,
        }
    }
}
