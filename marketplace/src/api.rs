//! Request/response form of every engine operation.
//!
//! Requests are JSON objects tagged by `op`:
//!
//! ```json
//! {"op": "buy", "token_id": 1, "payment": "1050000000000000000"}
//! ```
//!
//! Amounts travel as strings of base units.

use crate::engine::{MarketEngine, SaleReceipt};
use crate::discovery::ScanResult;
use crate::error::{ErrorKind, MarketError};
use crate::policy::MarketPolicy;
use crate::types::{
    Amount, Event, EventId, EventStatus, Identity, Listing, ListingId, NewEvent, Ticket, TokenId,
};
use crate::verification::Verification;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// One engine operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// [`MarketEngine::create_event`]
    CreateEvent {
        /// Event details
        event: NewEvent,
    },
    /// [`MarketEngine::get_event`]
    GetEvent {
        /// Event to read
        event_id: EventId,
    },
    /// [`MarketEngine::event_status`]
    EventStatus {
        /// Event to classify
        event_id: EventId,
    },
    /// [`MarketEngine::deactivate_event`]
    DeactivateEvent {
        /// Event to deactivate
        event_id: EventId,
    },
    /// [`MarketEngine::events_by_organizer`]
    EventsByOrganizer {
        /// Organizer
        organizer: Identity,
    },
    /// [`MarketEngine::verify_organizer`]
    VerifyOrganizer {
        /// Organizer to verify
        organizer: Identity,
    },
    /// [`MarketEngine::is_verified_organizer`]
    IsVerifiedOrganizer {
        /// Organizer
        organizer: Identity,
    },
    /// [`MarketEngine::mint`]
    Mint {
        /// Event to buy into
        event_id: EventId,
        /// Amount sent
        payment: Amount,
        /// Token metadata reference
        token_uri: String,
    },
    /// [`MarketEngine::get_ticket`]
    GetTicket {
        /// Ticket to read
        token_id: TokenId,
    },
    /// [`MarketEngine::tickets_by_owner`]
    TicketsByOwner {
        /// Holder
        owner: Identity,
    },
    /// [`MarketEngine::mark_used`]
    MarkUsed {
        /// Ticket to check in
        token_id: TokenId,
    },
    /// [`MarketEngine::cooldown_remaining`]
    CooldownRemaining {
        /// Ticket
        token_id: TokenId,
    },
    /// [`MarketEngine::verify`]
    VerifyTicket {
        /// Ticket presented at the door
        token_id: TokenId,
    },
    /// [`MarketEngine::list`]
    List {
        /// Ticket to sell
        token_id: TokenId,
        /// Asking price
        price: Amount,
    },
    /// [`MarketEngine::cancel_listing`]
    CancelListing {
        /// Ticket whose listing to withdraw
        token_id: TokenId,
    },
    /// [`MarketEngine::buy`]
    Buy {
        /// Ticket to buy
        token_id: TokenId,
        /// Amount sent
        payment: Amount,
    },
    /// [`MarketEngine::active_listings`]
    ActiveListings,
    /// [`MarketEngine::get_listing`]
    GetListing {
        /// Listing to read
        listing_id: ListingId,
    },
    /// [`MarketEngine::scan_events`]
    ScanEvents {
        /// First id probed
        from: u64,
        /// Last id probed
        to: u64,
    },
    /// [`MarketEngine::scan_listings`]
    ScanListings {
        /// Highest token id probed
        max_token_id: u64,
    },
    /// [`MarketEngine::withdraw`]
    Withdraw,
    /// [`MarketEngine::balance_of`]
    BalanceOf {
        /// Account
        identity: Identity,
    },
    /// [`MarketEngine::escrow_balance`]
    EscrowBalance,
    /// [`MarketEngine::policy`]
    Policy,
}

/// Result of a [`Request`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Response {
    /// A new event id
    EventCreated(EventId),
    /// An event
    Event(Event),
    /// An event's display status
    EventStatus(EventStatus),
    /// Event ids
    EventIds(Vec<EventId>),
    /// A new token id
    TicketMinted(TokenId),
    /// A ticket
    Ticket(Ticket),
    /// Token ids
    TokenIds(Vec<TokenId>),
    /// Whole seconds of cooldown left (rounded up), `None` if the ticket can be listed
    Cooldown(Option<i64>),
    /// A verification outcome
    Verification(Verification),
    /// A new listing id
    Listed(ListingId),
    /// A completed purchase
    Sale(SaleReceipt),
    /// A listing
    Listing(Listing),
    /// Listings
    Listings(Vec<Listing>),
    /// An event scan
    EventScan(ScanResult<Event>),
    /// A listing scan
    ListingScan(ScanResult<Listing>),
    /// An amount of money
    Amount(Amount),
    /// A yes/no answer
    Flag(bool),
    /// The policy in force
    Policy(MarketPolicy),
    /// The operation succeeded and returns nothing
    Done,
}

/// Wire form of a [`MarketError`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable class
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

impl From<&MarketError> for ApiError {
    fn from(error: &MarketError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(error: MarketError) -> Self {
        Self::from(&error)
    }
}

/// Seconds in `duration`, rounded up so any remainder still reads as waiting.
fn whole_seconds_up(duration: &Duration) -> i64 {
    let seconds = duration.num_seconds();
    if duration.subsec_nanos() > 0 {
        seconds.saturating_add(1)
    } else {
        seconds
    }
}

impl MarketEngine {
    /// Runs one request on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Whatever the underlying operation returns.
    pub async fn dispatch(&self, caller: &Identity, request: Request) -> Result<Response, MarketError> {
        let response = match request {
            Request::CreateEvent { event } => Response::EventCreated(self.create_event(caller, event).await?),
            Request::GetEvent { event_id } => Response::Event(self.get_event(event_id).await?),
            Request::EventStatus { event_id } => Response::EventStatus(self.event_status(event_id).await?),
            Request::DeactivateEvent { event_id } => {
                self.deactivate_event(caller, event_id).await?;
                Response::Done
            },
            Request::EventsByOrganizer { organizer } => {
                Response::EventIds(self.events_by_organizer(&organizer).await)
            },
            Request::VerifyOrganizer { organizer } => {
                self.verify_organizer(caller, &organizer).await?;
                Response::Done
            },
            Request::IsVerifiedOrganizer { organizer } => {
                Response::Flag(self.is_verified_organizer(&organizer).await)
            },
            Request::Mint {
                event_id,
                payment,
                token_uri,
            } => Response::TicketMinted(self.mint(caller, event_id, payment, token_uri).await?),
            Request::GetTicket { token_id } => Response::Ticket(self.get_ticket(token_id).await?),
            Request::TicketsByOwner { owner } => Response::TokenIds(self.tickets_by_owner(&owner).await),
            Request::MarkUsed { token_id } => {
                self.mark_used(caller, token_id).await?;
                Response::Done
            },
            Request::CooldownRemaining { token_id } => Response::Cooldown(
                self.cooldown_remaining(token_id)
                    .await?
                    .map(|remaining| whole_seconds_up(&remaining)),
            ),
            Request::VerifyTicket { token_id } => Response::Verification(self.verify(token_id).await),
            Request::List { token_id, price } => Response::Listed(self.list(caller, token_id, price).await?),
            Request::CancelListing { token_id } => {
                self.cancel_listing(caller, token_id).await?;
                Response::Done
            },
            Request::Buy { token_id, payment } => Response::Sale(self.buy(caller, token_id, payment).await?),
            Request::ActiveListings => Response::Listings(self.active_listings().await),
            Request::GetListing { listing_id } => Response::Listing(self.get_listing(listing_id).await?),
            Request::ScanEvents { from, to } => Response::EventScan(self.scan_events(from, to).await),
            Request::ScanListings { max_token_id } => {
                Response::ListingScan(self.scan_listings(max_token_id).await)
            },
            Request::Withdraw => Response::Amount(self.withdraw(caller).await?),
            Request::BalanceOf { identity } => Response::Amount(self.balance_of(&identity).await),
            Request::EscrowBalance => Response::Amount(self.escrow_balance().await),
            Request::Policy => Response::Policy(self.policy()),
        };
        Ok(response)
    }

    /// Parses a JSON request and runs it.
    ///
    /// # Errors
    ///
    /// An [`ApiError`] of kind [`ErrorKind::Validation`] for malformed JSON,
    /// otherwise the operation's error in wire form.
    pub async fn dispatch_json(&self, caller: &Identity, request: &str) -> Result<Response, ApiError> {
        let request: Request = serde_json::from_str(request).map_err(|e| ApiError {
            kind: ErrorKind::Validation,
            message: format!("Malformed request: {e}"),
        })?;
        self.dispatch(caller, request).await.map_err(ApiError::from)
    }
}
