//! Listing book: resale listings and the purchase decision.
//!
//! Per token the lifecycle is `NoListing -> Listed -> {Sold, Cancelled}`; a
//! closed listing is never reopened, re-listing creates a new [`ListingId`].

use crate::context::TxContext;
use crate::error::{Entity, MarketError, Result, Role};
use crate::policy::{MarketPolicy, RoyaltySplit};
use crate::records::{MarketRecord, PayoutKind};
use crate::registry::EventRegistry;
use crate::tickets::TicketLedger;
use crate::types::{Amount, Identity, Listing, ListingId, ListingStatus, TokenId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// A decided purchase, ready to be committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sale {
    /// The listing being bought
    pub listing_id: ListingId,
    /// Its ticket
    pub token_id: TokenId,
    /// Current owner
    pub seller: Identity,
    /// New owner
    pub buyer: Identity,
    /// Organizer of the ticket's event (royalty recipient)
    pub organizer: Identity,
    /// Sale price
    pub price: Amount,
    /// Royalty and seller proceeds
    pub split: RoyaltySplit,
}

impl Sale {
    /// The records that commit this sale: ownership change plus both payouts.
    #[must_use]
    pub fn records(&self, sold_at: DateTime<Utc>) -> [MarketRecord; 3] {
        [
            MarketRecord::TicketSold {
                listing_id: self.listing_id,
                token_id: self.token_id,
                seller: self.seller.clone(),
                buyer: self.buyer.clone(),
                price: self.price,
                sold_at,
            },
            MarketRecord::FundsTransferred {
                to: self.organizer.clone(),
                amount: self.split.royalty,
                kind: PayoutKind::Royalty,
                token_id: self.token_id,
            },
            MarketRecord::FundsTransferred {
                to: self.seller.clone(),
                amount: self.split.seller_proceeds,
                kind: PayoutKind::SaleProceeds,
                token_id: self.token_id,
            },
        ]
    }
}

/// All listings ever created, with at most one active listing per token.
#[derive(Clone, Debug)]
pub struct ListingBook {
    listings: BTreeMap<ListingId, Listing>,
    active_by_token: HashMap<TokenId, ListingId>,
    next_listing_id: ListingId,
}

impl Default for ListingBook {
    fn default() -> Self {
        Self {
            listings: BTreeMap::new(),
            active_by_token: HashMap::new(),
            next_listing_id: ListingId::new(1),
        }
    }
}

impl ListingBook {
    /// Creates an empty listing book
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides a `list` request and builds the listing it would open.
    ///
    /// Checks, in order: zero price, unknown ticket, caller not the owner,
    /// cooldown, resale cap, existing active listing.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`], [`MarketError::NotFound`],
    /// [`MarketError::Unauthorized`], [`MarketError::Cooldown`],
    /// [`MarketError::PriceCap`] or [`MarketError::AlreadyListed`].
    pub fn new_listing(
        &self,
        tickets: &TicketLedger,
        policy: &MarketPolicy,
        token_id: TokenId,
        price: Amount,
        ctx: &TxContext,
    ) -> Result<Listing> {
        if price.is_zero() {
            return Err(MarketError::validation("Listing price must be greater than zero"));
        }

        let ticket = tickets.get_ticket(token_id)?;
        if ticket.owner != ctx.caller {
            return Err(MarketError::Unauthorized {
                caller: ctx.caller.clone(),
                required: Role::TicketOwner,
            });
        }

        if let Some(remaining) = tickets.cooldown_remaining(token_id, policy, ctx.now)? {
            return Err(MarketError::Cooldown { token_id, remaining });
        }

        let max_price = policy.max_resale_price(ticket.original_price)?;
        if price > max_price {
            return Err(MarketError::PriceCap { price, max_price });
        }

        if self.active_by_token.contains_key(&token_id) {
            return Err(MarketError::AlreadyListed(token_id));
        }

        Ok(Listing {
            listing_id: self.next_listing_id,
            token_id,
            seller: ctx.caller.clone(),
            price,
            status: ListingStatus::Listed,
            listed_at: ctx.now,
            closed_at: None,
        })
    }

    /// Checks that `caller` may cancel the token's active listing.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotListed`] if the token has no active listing
    /// - [`MarketError::Unauthorized`] unless the caller is the seller
    pub fn check_cancel(&self, token_id: TokenId, caller: &Identity) -> Result<&Listing> {
        let listing = self.require_active(token_id)?;
        if &listing.seller != caller {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                required: Role::Seller,
            });
        }
        Ok(listing)
    }

    /// Decides a purchase of the token's active listing.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotListed`] if the token has no active listing
    /// - [`MarketError::PaymentMismatch`] unless `payment` equals the price exactly
    /// - [`MarketError::SelfPurchase`] if the buyer is the seller
    pub fn prepare_sale(
        &self,
        tickets: &TicketLedger,
        events: &EventRegistry,
        policy: &MarketPolicy,
        token_id: TokenId,
        payment: Amount,
        ctx: &TxContext,
    ) -> Result<Sale> {
        let listing = self.require_active(token_id)?;

        if payment != listing.price {
            return Err(MarketError::PaymentMismatch {
                expected: listing.price,
                received: payment,
            });
        }

        if listing.seller == ctx.caller {
            return Err(MarketError::SelfPurchase(token_id));
        }

        let ticket = tickets.get_ticket(token_id)?;
        let event = events.get_event(ticket.event_id)?;
        let split = policy.split(listing.price)?;

        Ok(Sale {
            listing_id: listing.listing_id,
            token_id,
            seller: listing.seller.clone(),
            buyer: ctx.caller.clone(),
            organizer: event.organizer.clone(),
            price: listing.price,
            split,
        })
    }

    /// Active listings ordered by listing id.
    #[must_use]
    pub fn active_listings(&self) -> Vec<Listing> {
        let mut ids: Vec<ListingId> = self.active_by_token.values().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.listings.get(&id).cloned())
            .collect()
    }

    /// The token's active listing, if any.
    #[must_use]
    pub fn active_listing(&self, token_id: TokenId) -> Option<&Listing> {
        self.active_by_token
            .get(&token_id)
            .and_then(|id| self.listings.get(id))
    }

    /// Looks up a listing in any state.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if no listing has this id.
    pub fn get_listing(&self, listing_id: ListingId) -> Result<&Listing> {
        self.listings.get(&listing_id).ok_or(MarketError::NotFound {
            entity: Entity::Listing,
            id: listing_id.value(),
        })
    }

    fn require_active(&self, token_id: TokenId) -> Result<&Listing> {
        self.active_listing(token_id)
            .ok_or(MarketError::NotListed(token_id))
    }

    fn close(&mut self, listing_id: ListingId, status: ListingStatus, at: DateTime<Utc>) -> Result<()> {
        let listing = self
            .listings
            .get_mut(&listing_id)
            .ok_or(MarketError::NotFound {
                entity: Entity::Listing,
                id: listing_id.value(),
            })?;
        listing.status = status;
        listing.closed_at = Some(at);
        self.active_by_token.remove(&listing.token_id);
        Ok(())
    }

    /// Applies a committed record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] for records about unknown listings.
    pub fn apply(&mut self, record: &MarketRecord) -> Result<()> {
        match record {
            MarketRecord::TicketListed { listing } => {
                self.active_by_token
                    .insert(listing.token_id, listing.listing_id);
                if listing.listing_id >= self.next_listing_id {
                    self.next_listing_id = listing.listing_id.next();
                }
                self.listings.insert(listing.listing_id, listing.clone());
            },
            MarketRecord::ListingCancelled {
                listing_id,
                cancelled_at,
                ..
            } => self.close(*listing_id, ListingStatus::Cancelled, *cancelled_at)?,
            MarketRecord::TicketSold {
                listing_id, sold_at, ..
            } => self.close(*listing_id, ListingStatus::Sold, *sold_at)?,
            _ => {},
        }
        Ok(())
    }
}
