//! Ticket ledger: minting, ownership, check-in and last-transfer tracking.

use crate::context::TxContext;
use crate::error::{Entity, MarketError, Result, Role};
use crate::policy::MarketPolicy;
use crate::records::MarketRecord;
use crate::registry::EventRegistry;
use crate::types::{Amount, EventId, Identity, Ticket, TokenId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

/// Every minted ticket with its owner index and cooldown anchor.
#[derive(Clone, Debug)]
pub struct TicketLedger {
    tickets: BTreeMap<TokenId, Ticket>,
    by_owner: HashMap<Identity, Vec<TokenId>>,
    last_transfer: HashMap<TokenId, DateTime<Utc>>,
    next_token_id: TokenId,
}

impl Default for TicketLedger {
    fn default() -> Self {
        Self {
            tickets: BTreeMap::new(),
            by_owner: HashMap::new(),
            last_transfer: HashMap::new(),
            next_token_id: TokenId::new(1),
        }
    }
}

impl TicketLedger {
    /// Creates an empty ticket ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next minted ticket will receive.
    #[must_use]
    pub const fn next_token_id(&self) -> TokenId {
        self.next_token_id
    }

    /// Highest token id minted so far (zero when nothing has been minted).
    #[must_use]
    pub const fn last_token_id(&self) -> u64 {
        self.next_token_id.value() - 1
    }

    /// Decides a mint and builds the ticket it would create.
    ///
    /// Checks, in order: blank `token_uri`, unknown event, inactive event,
    /// sold-out event, then `payment != ticket_price`. The caller is the buyer.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`], [`MarketError::NotFound`],
    /// [`MarketError::EventInactive`], [`MarketError::SoldOut`] or
    /// [`MarketError::PaymentMismatch`].
    pub fn new_ticket(
        &self,
        events: &EventRegistry,
        event_id: EventId,
        payment: Amount,
        token_uri: String,
        ctx: &TxContext,
    ) -> Result<Ticket> {
        if token_uri.trim().is_empty() {
            return Err(MarketError::validation("Token URI cannot be empty"));
        }

        let event = events.check_mintable(event_id)?;

        if payment != event.ticket_price {
            return Err(MarketError::PaymentMismatch {
                expected: event.ticket_price,
                received: payment,
            });
        }

        Ok(Ticket {
            token_id: self.next_token_id,
            event_id,
            owner: ctx.caller.clone(),
            is_used: false,
            purchase_time: ctx.now,
            original_price: event.ticket_price,
            token_uri,
        })
    }

    /// Looks up a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if no ticket has this id.
    pub fn get_ticket(&self, token_id: TokenId) -> Result<&Ticket> {
        self.tickets.get(&token_id).ok_or(MarketError::NotFound {
            entity: Entity::Ticket,
            id: token_id.value(),
        })
    }

    /// Point lookup that treats absence as a normal outcome.
    #[must_use]
    pub fn find(&self, token_id: TokenId) -> Option<&Ticket> {
        self.tickets.get(&token_id)
    }

    /// Tickets currently held by `owner`, in acquisition order.
    #[must_use]
    pub fn tickets_by_owner(&self, owner: &Identity) -> Vec<TokenId> {
        self.by_owner.get(owner).cloned().unwrap_or_default()
    }

    /// Checks that `caller` may check the ticket in.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] if the ticket does not exist
    /// - [`MarketError::Unauthorized`] unless the caller organizes the ticket's event
    /// - [`MarketError::AlreadyUsed`] if it was already checked in
    pub fn check_mark_used(
        &self,
        events: &EventRegistry,
        token_id: TokenId,
        caller: &Identity,
    ) -> Result<&Ticket> {
        let ticket = self.get_ticket(token_id)?;
        let event = events.get_event(ticket.event_id)?;
        if &event.organizer != caller {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                required: Role::Organizer,
            });
        }
        if ticket.is_used {
            return Err(MarketError::AlreadyUsed(token_id));
        }
        Ok(ticket)
    }

    /// Moves a ticket to `new_owner` and re-arms its cooldown at `at`.
    ///
    /// Only called while applying a committed sale.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the ticket does not exist.
    pub fn set_owner(&mut self, token_id: TokenId, new_owner: &Identity, at: DateTime<Utc>) -> Result<()> {
        let ticket = self
            .tickets
            .get_mut(&token_id)
            .ok_or(MarketError::NotFound {
                entity: Entity::Ticket,
                id: token_id.value(),
            })?;

        if let Some(held) = self.by_owner.get_mut(&ticket.owner) {
            held.retain(|id| *id != token_id);
        }
        self.by_owner
            .entry(new_owner.clone())
            .or_default()
            .push(token_id);

        ticket.owner = new_owner.clone();
        self.last_transfer.insert(token_id, at);
        Ok(())
    }

    /// When the ticket last changed hands (mint or resale).
    #[must_use]
    pub fn last_transfer_time(&self, token_id: TokenId) -> Option<DateTime<Utc>> {
        self.last_transfer.get(&token_id).copied()
    }

    /// Time left before the ticket may be listed, `None` once the cooldown elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the ticket does not exist.
    pub fn cooldown_remaining(
        &self,
        token_id: TokenId,
        policy: &MarketPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>> {
        self.get_ticket(token_id)?;
        match self.last_transfer_time(token_id) {
            Some(last) => policy.cooldown_remaining(last, now),
            None => Ok(None),
        }
    }

    /// Applies a committed record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] for records about unknown tickets.
    pub fn apply(&mut self, record: &MarketRecord) -> Result<()> {
        match record {
            MarketRecord::TicketMinted { ticket, .. } => {
                self.by_owner
                    .entry(ticket.owner.clone())
                    .or_default()
                    .push(ticket.token_id);
                self.last_transfer
                    .insert(ticket.token_id, ticket.purchase_time);
                if ticket.token_id >= self.next_token_id {
                    self.next_token_id = ticket.token_id.next();
                }
                self.tickets.insert(ticket.token_id, ticket.clone());
            },
            MarketRecord::TicketUsed { token_id, .. } => {
                let ticket = self
                    .tickets
                    .get_mut(token_id)
                    .ok_or(MarketError::NotFound {
                        entity: Entity::Ticket,
                        id: token_id.value(),
                    })?;
                ticket.is_used = true;
            },
            MarketRecord::TicketSold {
                token_id,
                buyer,
                sold_at,
                ..
            } => {
                self.set_owner(*token_id, buyer, *sold_at)?;
            },
            _ => {},
        }
        Ok(())
    }
}
