//! The marketplace engine: one facade over every component.
//!
//! # Write path
//!
//! Writers are serialized by a gate. Each write:
//!
//! 1. decides against committed state under a short read lock, producing
//!    the [`MarketRecord`]s the operation would commit,
//! 2. submits them as one [`Transaction`] with the height it decided against,
//! 3. only after the ledger accepts, applies every record under one write lock.
//!
//! A failure at any step before the commit leaves state untouched, so a
//! rejected transfer during a purchase can never leave the ticket moved
//! without payment.
//!
//! # Read path
//!
//! Reads take the read lock briefly and never wait on ledger I/O.

use crate::config::Config;
use crate::context::TxContext;
use crate::discovery::{DiscoveryScanner, ScanResult};
use crate::error::{ErrorKind, MarketError, Result};
use crate::metrics;
use crate::policy::MarketPolicy;
use crate::records::MarketRecord;
use crate::state::MarketState;
use crate::types::{
    Amount, Event, EventId, EventStatus, Identity, Listing, ListingId, NewEvent, Ticket, TokenId,
};
use crate::verification::{self, Verification};
use chrono::{DateTime, Duration, Utc};
use nfticket_core::environment::Clock;
use nfticket_core::ledger::{Height, Ledger, Transaction};
use nfticket_core::record::SerializedRecord;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Records produced by one operation; a sale produces the most (three).
type Records = SmallVec<[MarketRecord; 3]>;

/// Capabilities injected into the engine.
#[derive(Clone)]
pub struct MarketEnvironment {
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
    /// Where transactions are committed
    pub ledger: Arc<dyn Ledger>,
    /// Resale cap, royalty and cooldown
    pub policy: MarketPolicy,
    /// Discovery probe budget
    pub scanner: DiscoveryScanner,
}

impl MarketEnvironment {
    /// Environment with the default policy and scan ceiling.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            clock,
            ledger,
            policy: MarketPolicy::default(),
            scanner: DiscoveryScanner::default(),
        }
    }

    /// Replace the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: MarketPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the discovery scanner.
    #[must_use]
    pub fn with_scanner(mut self, scanner: DiscoveryScanner) -> Self {
        self.scanner = scanner;
        self
    }
}

/// What a buyer gets back from a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    /// The listing bought
    pub listing_id: ListingId,
    /// The ticket now owned by the buyer
    pub token_id: TokenId,
    /// Price paid
    pub price: Amount,
    /// Credited to the organizer
    pub royalty: Amount,
    /// Credited to the seller
    pub seller_proceeds: Amount,
    /// Royalty recipient
    pub organizer: Identity,
    /// Previous owner
    pub seller: Identity,
    /// New owner
    pub buyer: Identity,
    /// Earliest time the buyer may list the ticket again
    pub cooldown_until: DateTime<Utc>,
}

struct Committed {
    state: MarketState,
    height: Height,
}

/// Ticket lifecycle and resale marketplace engine.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct MarketEngine {
    env: MarketEnvironment,
    committed: RwLock<Committed>,
    writer: Mutex<()>,
}

impl MarketEngine {
    /// Engine over an empty ledger, owned by `platform_owner`.
    #[must_use]
    pub fn new(env: MarketEnvironment, platform_owner: Identity) -> Self {
        Self {
            env,
            committed: RwLock::new(Committed {
                state: MarketState::new(platform_owner),
                height: Height::GENESIS,
            }),
            writer: Mutex::new(()),
        }
    }

    /// Engine configured from [`Config`].
    #[must_use]
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>, ledger: Arc<dyn Ledger>) -> Self {
        let env = MarketEnvironment::new(clock, ledger)
            .with_policy(config.policy)
            .with_scanner(DiscoveryScanner::new(config.discovery.scan_ceiling));
        Self::new(env, config.platform.owner.clone())
    }

    /// Rebuilds an engine by replaying every transaction already on the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read or a record cannot be
    /// decoded or applied.
    #[tracing::instrument(skip(env))]
    pub async fn restore(env: MarketEnvironment, platform_owner: Identity) -> Result<Self> {
        let engine = Self::new(env, platform_owner);
        let applied = engine.sync().await?;
        tracing::info!(transactions = applied, "Marketplace state restored from ledger");
        Ok(engine)
    }

    /// Applies transactions committed to the ledger since the last one this
    /// engine saw. Returns how many were applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read or a record cannot be
    /// decoded or applied.
    pub async fn sync(&self) -> Result<usize> {
        let _writer = self.writer.lock().await;
        let from = self.committed.read().await.height;
        let transactions = self.env.ledger.load(from).await?;

        let mut decoded = Vec::with_capacity(transactions.len());
        for committed in transactions {
            let records = committed
                .transaction
                .records
                .iter()
                .map(SerializedRecord::decode::<MarketRecord>)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            decoded.push((committed.height, records));
        }

        let mut guard = self.committed.write().await;
        let count = decoded.len();
        for (height, records) in decoded {
            if let Err(error) = guard.state.apply_all(&records) {
                tracing::error!(%height, error = %error, "Committed transaction could not be applied");
                return Err(error);
            }
            guard.height = height;
        }
        Ok(count)
    }

    /// The policy in force.
    #[must_use]
    pub const fn policy(&self) -> MarketPolicy {
        self.env.policy
    }

    /// Ledger height of the state this engine serves.
    pub async fn height(&self) -> Height {
        self.committed.read().await.height
    }

    /// Decide, submit, apply.
    async fn commit<T, F>(&self, operation: &'static str, caller: &Identity, decide: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&MarketState, &TxContext) -> Result<(Records, T)> + Send,
    {
        let _writer = self.writer.lock().await;
        let ctx = TxContext::new(caller.clone(), self.env.clock.now());

        let decision = {
            let guard = self.committed.read().await;
            decide(&guard.state, &ctx).map(|(records, output)| (records, output, guard.height))
        };
        let (records, output, height) = match decision {
            Ok(decision) => decision,
            Err(error) => {
                tracing::warn!(operation, caller = %caller, error = %error, "Command rejected");
                metrics::record_rejected(error.kind());
                return Err(error);
            },
        };

        let serialized = records
            .iter()
            .map(SerializedRecord::from_record::<MarketRecord>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let transaction = Transaction::new(caller.as_str(), ctx.now, serialized);

        tracing::debug!(operation, records = records.len(), %height, "Submitting transaction");
        let started = Instant::now();
        let submitted = self.env.ledger.submit(height, transaction).await;
        metrics::record_ledger_submit(started.elapsed().as_secs_f64());

        let receipt = match submitted {
            Ok(receipt) => receipt,
            Err(error) => {
                tracing::error!(operation, caller = %caller, error = %error, "Ledger refused transaction");
                metrics::record_rejected(ErrorKind::Backend);
                return Err(error.into());
            },
        };

        let mut guard = self.committed.write().await;
        if let Err(error) = guard.state.apply_all(&records) {
            tracing::error!(operation, error = %error, "Committed transaction could not be applied");
            return Err(error);
        }
        guard.height = receipt.height;
        drop(guard);

        tracing::info!(operation, caller = %caller, height = %receipt.height, "Transaction committed");
        Ok(output)
    }

    // ═══════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════

    /// Creates an event organized by `caller`.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] for a past date, zero price or capacity,
    /// or a blank text field; backend errors from the ledger.
    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_event(&self, caller: &Identity, draft: NewEvent) -> Result<EventId> {
        let event_id = self
            .commit("create_event", caller, |state, ctx| {
                let event = state.registry.new_event(draft, ctx)?;
                let event_id = event.event_id;
                Ok((smallvec![MarketRecord::EventCreated { event }], event_id))
            })
            .await?;
        metrics::record_event_created();
        Ok(event_id)
    }

    /// Deactivates an event. Terminal: no further minting.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`], [`MarketError::Unauthorized`] unless the
    /// caller organizes the event, [`MarketError::AlreadyInactive`].
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_event(&self, caller: &Identity, event_id: EventId) -> Result<()> {
        self.commit("deactivate_event", caller, |state, ctx| {
            state.registry.check_deactivate(event_id, &ctx.caller)?;
            Ok((
                smallvec![MarketRecord::EventDeactivated {
                    event_id,
                    deactivated_at: ctx.now,
                }],
                (),
            ))
        })
        .await
    }

    /// Looks up an event.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if no event has this id.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event> {
        self.committed
            .read()
            .await
            .state
            .registry
            .get_event(event_id)
            .cloned()
    }

    /// Display status of an event right now.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if no event has this id.
    pub async fn event_status(&self, event_id: EventId) -> Result<EventStatus> {
        let now = self.env.clock.now();
        Ok(self.get_event(event_id).await?.status_at(now))
    }

    /// Events created by `organizer`, in creation order.
    pub async fn events_by_organizer(&self, organizer: &Identity) -> Vec<EventId> {
        self.committed
            .read()
            .await
            .state
            .registry
            .events_by_organizer(organizer)
    }

    /// Marks `organizer` as verified. Platform owner only.
    ///
    /// # Errors
    ///
    /// [`MarketError::Unauthorized`] unless the caller owns the platform;
    /// [`MarketError::Validation`] if already verified.
    #[tracing::instrument(skip(self))]
    pub async fn verify_organizer(&self, caller: &Identity, organizer: &Identity) -> Result<()> {
        self.commit("verify_organizer", caller, |state, ctx| {
            state
                .registry
                .check_verify_organizer(organizer, &ctx.caller, state.treasury.owner())?;
            Ok((
                smallvec![MarketRecord::OrganizerVerified {
                    organizer: organizer.clone(),
                    verified_at: ctx.now,
                }],
                (),
            ))
        })
        .await
    }

    /// Whether the platform owner has verified `organizer`.
    pub async fn is_verified_organizer(&self, organizer: &Identity) -> bool {
        self.committed
            .read()
            .await
            .state
            .registry
            .is_verified_organizer(organizer)
    }

    // ═══════════════════════════════════════════════════════════
    // Tickets
    // ═══════════════════════════════════════════════════════════

    /// Mints a ticket for `caller`, who pays exactly the event's ticket price.
    ///
    /// The payment goes to the platform escrow and the ticket's transfer
    /// cooldown starts now.
    ///
    /// # Errors
    ///
    /// In order: [`MarketError::Validation`] for a blank `token_uri`,
    /// [`MarketError::NotFound`], [`MarketError::EventInactive`],
    /// [`MarketError::SoldOut`], [`MarketError::PaymentMismatch`].
    #[tracing::instrument(skip(self, token_uri), fields(payment = %payment))]
    pub async fn mint(
        &self,
        caller: &Identity,
        event_id: EventId,
        payment: Amount,
        token_uri: impl Into<String> + Send,
    ) -> Result<TokenId> {
        let token_uri = token_uri.into();
        let token_id = self
            .commit("mint", caller, |state, ctx| {
                let ticket = state
                    .tickets
                    .new_ticket(&state.registry, event_id, payment, token_uri, ctx)?;
                let token_id = ticket.token_id;
                Ok((smallvec![MarketRecord::TicketMinted { ticket, payment }], token_id))
            })
            .await?;
        metrics::record_ticket_minted();
        Ok(token_id)
    }

    /// Looks up a ticket.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if no ticket has this id.
    pub async fn get_ticket(&self, token_id: TokenId) -> Result<Ticket> {
        self.committed
            .read()
            .await
            .state
            .tickets
            .get_ticket(token_id)
            .cloned()
    }

    /// Tickets held by `owner`, in acquisition order.
    pub async fn tickets_by_owner(&self, owner: &Identity) -> Vec<TokenId> {
        self.committed.read().await.state.tickets.tickets_by_owner(owner)
    }

    /// Highest token id minted so far (zero if none); the natural bound for
    /// [`scan_listings`](Self::scan_listings).
    pub async fn last_token_id(&self) -> u64 {
        self.committed.read().await.state.tickets.last_token_id()
    }

    /// When the ticket last changed hands.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if no ticket has this id.
    pub async fn last_transfer_time(&self, token_id: TokenId) -> Result<DateTime<Utc>> {
        let guard = self.committed.read().await;
        let ticket = guard.state.tickets.get_ticket(token_id)?;
        Ok(guard
            .state
            .tickets
            .last_transfer_time(token_id)
            .unwrap_or(ticket.purchase_time))
    }

    /// Time left before the ticket may be listed, `None` if it may be listed now.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if no ticket has this id.
    pub async fn cooldown_remaining(&self, token_id: TokenId) -> Result<Option<Duration>> {
        let now = self.env.clock.now();
        self.committed
            .read()
            .await
            .state
            .tickets
            .cooldown_remaining(token_id, &self.env.policy, now)
    }

    /// Checks a ticket in. Organizer of the ticket's event only.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`], [`MarketError::Unauthorized`],
    /// [`MarketError::AlreadyUsed`].
    #[tracing::instrument(skip(self))]
    pub async fn mark_used(&self, caller: &Identity, token_id: TokenId) -> Result<()> {
        self.commit("mark_used", caller, |state, ctx| {
            let ticket = state
                .tickets
                .check_mark_used(&state.registry, token_id, &ctx.caller)?;
            Ok((
                smallvec![MarketRecord::TicketUsed {
                    token_id,
                    event_id: ticket.event_id,
                    used_at: ctx.now,
                }],
                (),
            ))
        })
        .await?;
        metrics::record_ticket_used();
        Ok(())
    }

    /// Classifies a ticket for admission at the current time.
    pub async fn verify(&self, token_id: TokenId) -> Verification {
        let now = self.env.clock.now();
        let guard = self.committed.read().await;
        verification::verify(&guard.state.tickets, &guard.state.registry, token_id, now)
    }

    // ═══════════════════════════════════════════════════════════
    // Resale
    // ═══════════════════════════════════════════════════════════

    /// Lists `caller`'s ticket for resale.
    ///
    /// # Errors
    ///
    /// In order: [`MarketError::Validation`] for a zero price,
    /// [`MarketError::NotFound`], [`MarketError::Unauthorized`] unless the
    /// caller owns the ticket, [`MarketError::Cooldown`],
    /// [`MarketError::PriceCap`], [`MarketError::AlreadyListed`].
    #[tracing::instrument(skip(self), fields(price = %price))]
    pub async fn list(&self, caller: &Identity, token_id: TokenId, price: Amount) -> Result<ListingId> {
        let policy = self.env.policy;
        let listing_id = self
            .commit("list", caller, |state, ctx| {
                let listing = state
                    .listings
                    .new_listing(&state.tickets, &policy, token_id, price, ctx)?;
                let listing_id = listing.listing_id;
                Ok((smallvec![MarketRecord::TicketListed { listing }], listing_id))
            })
            .await?;
        metrics::record_listing_created();
        Ok(listing_id)
    }

    /// Withdraws the ticket's active listing.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotListed`], then [`MarketError::Unauthorized`] unless
    /// the caller is the seller.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_listing(&self, caller: &Identity, token_id: TokenId) -> Result<()> {
        self.commit("cancel_listing", caller, |state, ctx| {
            let listing = state.listings.check_cancel(token_id, &ctx.caller)?;
            Ok((
                smallvec![MarketRecord::ListingCancelled {
                    listing_id: listing.listing_id,
                    token_id,
                    cancelled_at: ctx.now,
                }],
                (),
            ))
        })
        .await?;
        metrics::record_listing_cancelled();
        Ok(())
    }

    /// Buys the ticket's active listing.
    ///
    /// Ownership, listing closure and both payouts commit in one transaction.
    ///
    /// # Errors
    ///
    /// In order: [`MarketError::NotListed`], [`MarketError::PaymentMismatch`]
    /// unless `payment` equals the price, [`MarketError::SelfPurchase`];
    /// backend errors if the ledger refuses the transaction.
    #[tracing::instrument(skip(self), fields(payment = %payment))]
    pub async fn buy(&self, caller: &Identity, token_id: TokenId, payment: Amount) -> Result<SaleReceipt> {
        let policy = self.env.policy;
        let receipt = self
            .commit("buy", caller, |state, ctx| {
                let sale = state.listings.prepare_sale(
                    &state.tickets,
                    &state.registry,
                    &policy,
                    token_id,
                    payment,
                    ctx,
                )?;
                let receipt = SaleReceipt {
                    listing_id: sale.listing_id,
                    token_id,
                    price: sale.price,
                    royalty: sale.split.royalty,
                    seller_proceeds: sale.split.seller_proceeds,
                    organizer: sale.organizer.clone(),
                    seller: sale.seller.clone(),
                    buyer: sale.buyer.clone(),
                    cooldown_until: policy.cooldown_until(ctx.now)?,
                };
                Ok((Records::from_buf(sale.records(ctx.now)), receipt))
            })
            .await?;
        metrics::record_resale(receipt.royalty);
        Ok(receipt)
    }

    /// Active listings ordered by listing id.
    pub async fn active_listings(&self) -> Vec<Listing> {
        self.committed.read().await.state.listings.active_listings()
    }

    /// Looks up a listing in any state.
    ///
    /// # Errors
    ///
    /// [`MarketError::NotFound`] if no listing has this id.
    pub async fn get_listing(&self, listing_id: ListingId) -> Result<Listing> {
        self.committed
            .read()
            .await
            .state
            .listings
            .get_listing(listing_id)
            .cloned()
    }

    /// The ticket's active listing, if any.
    pub async fn active_listing_for(&self, token_id: TokenId) -> Option<Listing> {
        self.committed
            .read()
            .await
            .state
            .listings
            .active_listing(token_id)
            .cloned()
    }

    // ═══════════════════════════════════════════════════════════
    // Discovery
    // ═══════════════════════════════════════════════════════════

    /// Active events with ids in `from..=to`, bounded by the scan ceiling.
    pub async fn scan_events(&self, from: u64, to: u64) -> ScanResult<Event> {
        let guard = self.committed.read().await;
        self.env.scanner.scan_events(&guard.state, from, to)
    }

    /// Active listings for token ids `1..=max_token_id`, bounded by the scan ceiling.
    pub async fn scan_listings(&self, max_token_id: u64) -> ScanResult<Listing> {
        let guard = self.committed.read().await;
        self.env.scanner.scan_listings(&guard.state, max_token_id)
    }

    // ═══════════════════════════════════════════════════════════
    // Treasury
    // ═══════════════════════════════════════════════════════════

    /// Moves the whole escrow to the platform owner's balance.
    ///
    /// # Errors
    ///
    /// [`MarketError::Unauthorized`] unless the caller owns the platform;
    /// [`MarketError::Validation`] if the escrow is empty.
    #[tracing::instrument(skip(self))]
    pub async fn withdraw(&self, caller: &Identity) -> Result<Amount> {
        self.commit("withdraw", caller, |state, ctx| {
            let amount = state.treasury.check_withdraw(&ctx.caller)?;
            Ok((
                smallvec![MarketRecord::FundsWithdrawn {
                    to: ctx.caller.clone(),
                    amount,
                    withdrawn_at: ctx.now,
                }],
                amount,
            ))
        })
        .await
    }

    /// Funds credited to `identity`.
    pub async fn balance_of(&self, identity: &Identity) -> Amount {
        self.committed.read().await.state.treasury.balance_of(identity)
    }

    /// Primary-sale funds awaiting withdrawal.
    pub async fn escrow_balance(&self) -> Amount {
        self.committed.read().await.state.treasury.escrow_balance()
    }

    /// The platform owner.
    pub async fn platform_owner(&self) -> Identity {
        self.committed.read().await.state.treasury.owner().clone()
    }
}

impl std::fmt::Debug for MarketEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketEngine")
            .field("policy", &self.env.policy)
            .field("scanner", &self.env.scanner)
            .finish_non_exhaustive()
    }
}
