//! Shared fixtures for marketplace integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use chrono::Duration;
use nfticket_core::environment::Clock;
use nfticket_marketplace::{Amount, EventId, Identity, MarketEngine, MarketEnvironment, NewEvent, TokenId};
use nfticket_testing::{InMemoryLedger, ManualClock, test_epoch};
use std::sync::Arc;

/// Engine wired to a manual clock and an in-memory ledger.
pub struct Market {
    pub engine: MarketEngine,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryLedger>,
}

impl Market {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::starting_at(test_epoch()));
        let ledger = Arc::new(InMemoryLedger::new());
        let env = MarketEnvironment::new(clock.clone(), ledger.clone());
        Self {
            engine: MarketEngine::new(env, platform()),
            clock,
            ledger,
        }
    }

    pub fn env(&self) -> MarketEnvironment {
        MarketEnvironment::new(self.clock.clone(), self.ledger.clone())
    }

    /// Creates an event organized by [`organizer`] one month out.
    pub async fn event(&self, price: Amount, max_tickets: u32) -> EventId {
        self.engine
            .create_event(&organizer(), new_event(self.clock.now() + Duration::days(30), price, max_tickets))
            .await
            .unwrap()
    }

    /// Mints one ticket for `buyer`, paying the exact price.
    pub async fn mint(&self, event_id: EventId, buyer: &Identity) -> TokenId {
        let price = self.engine.get_event(event_id).await.unwrap().ticket_price;
        self.engine
            .mint(buyer, event_id, price, format!("ipfs://{buyer}/{event_id}"))
            .await
            .unwrap()
    }

    pub fn pass(&self, duration: Duration) {
        self.clock.advance(duration);
    }
}

pub fn new_event(date: chrono::DateTime<chrono::Utc>, price: Amount, max_tickets: u32) -> NewEvent {
    NewEvent {
        title: "Summer Music Festival".to_string(),
        description: "Three stages".to_string(),
        location: "Riverside Park".to_string(),
        date,
        ticket_price: price,
        max_tickets,
        metadata_uri: "ipfs://festival".to_string(),
    }
}

pub fn tokens(decimal: &str) -> Amount {
    Amount::parse_decimal(decimal).unwrap()
}

pub fn platform() -> Identity {
    Identity::new("0xplatform")
}

pub fn organizer() -> Identity {
    Identity::new("0xorganizer")
}

pub fn alice() -> Identity {
    Identity::new("0xalice")
}

pub fn bob() -> Identity {
    Identity::new("0xbob")
}

pub fn carol() -> Identity {
    Identity::new("0xcarol")
}
