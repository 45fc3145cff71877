//! Projected marketplace state.

use crate::discovery::PointLookup;
use crate::error::Result;
use crate::listings::ListingBook;
use crate::records::MarketRecord;
use crate::registry::EventRegistry;
use crate::tickets::TicketLedger;
use crate::treasury::Treasury;
use crate::types::{Event, EventId, Identity, Listing, TokenId};

/// Everything the engine knows, folded from committed records.
#[derive(Clone, Debug)]
pub struct MarketState {
    /// Events and verified organizers
    pub registry: EventRegistry,
    /// Tickets and ownership
    pub tickets: TicketLedger,
    /// Resale listings
    pub listings: ListingBook,
    /// Escrow and balances
    pub treasury: Treasury,
}

impl MarketState {
    /// Empty state for a platform owned by `owner`.
    #[must_use]
    pub fn new(owner: Identity) -> Self {
        Self {
            registry: EventRegistry::new(),
            tickets: TicketLedger::new(),
            listings: ListingBook::new(),
            treasury: Treasury::new(owner),
        }
    }

    /// Folds one committed record into every component.
    ///
    /// # Errors
    ///
    /// Returns the first component error. Records are only ever produced by
    /// decisions against this same state, so an error here means the state
    /// and the ledger have diverged.
    pub fn apply(&mut self, record: &MarketRecord) -> Result<()> {
        self.registry.apply(record)?;
        self.tickets.apply(record)?;
        self.listings.apply(record)?;
        self.treasury.apply(record)
    }

    /// Folds every record of one committed transaction, all or nothing.
    ///
    /// The records are applied to a staged copy that replaces `self` only
    /// once every record has applied.
    ///
    /// # Errors
    ///
    /// Returns the first record error; `self` is left as it was.
    pub fn apply_all<'a>(&mut self, records: impl IntoIterator<Item = &'a MarketRecord>) -> Result<()> {
        let mut staged = self.clone();
        for record in records {
            staged.apply(record)?;
        }
        *self = staged;
        Ok(())
    }
}

impl PointLookup for MarketState {
    fn event(&self, event_id: EventId) -> Option<&Event> {
        self.registry.find(event_id)
    }

    fn active_listing_for(&self, token_id: TokenId) -> Option<&Listing> {
        self.listings.active_listing(token_id)
    }
}
