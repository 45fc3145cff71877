//! # NFTicket Marketplace
//!
//! Ticket lifecycle and resale marketplace engine for NFT event tickets.
//!
//! Organizers create events with a fixed capacity; buyers mint tickets at
//! the event's price; owners resell tickets under anti-scalping rules; door
//! staff verify and check tickets in.
//!
//! ## Rules
//!
//! - **Resale cap**: a ticket may be listed for at most 110% of the price it
//!   was originally minted at.
//! - **Royalty**: 5% of every resale goes to the event organizer.
//! - **Cooldown**: a ticket cannot be listed within 24 hours of changing hands.
//! - **One use**: a checked-in ticket stays used forever.
//!
//! ## Architecture
//!
//! The engine never owns durable state. Every accepted operation becomes one
//! transaction of [`records::MarketRecord`]s committed to an external
//! [`Ledger`](nfticket_core::ledger::Ledger); the in-memory [`state::MarketState`]
//! is a projection of the committed records and can be rebuilt from the
//! ledger with [`MarketEngine::restore`].
//!
//! ## Example
//!
//! ```ignore
//! let engine = MarketEngine::new(MarketEnvironment::new(clock, ledger), owner);
//!
//! let event_id = engine.create_event(&organizer, new_event).await?;
//! let token_id = engine.mint(&alice, event_id, price, "ipfs://seat-1").await?;
//!
//! // 24 hours later
//! let listing_id = engine.list(&alice, token_id, resale_price).await?;
//! let receipt = engine.buy(&bob, token_id, resale_price).await?;
//! assert_eq!(receipt.buyer, bob);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod context;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod listings;
pub mod metrics;
pub mod policy;
pub mod records;
pub mod registry;
pub mod state;
pub mod tickets;
pub mod treasury;
pub mod types;
pub mod verification;

pub use api::{ApiError, Request, Response};
pub use config::Config;
pub use engine::{MarketEngine, MarketEnvironment, SaleReceipt};
pub use error::{ErrorKind, MarketError, Result};
pub use policy::MarketPolicy;
pub use types::{Amount, Event, EventId, Identity, Listing, ListingId, NewEvent, Ticket, TokenId};
