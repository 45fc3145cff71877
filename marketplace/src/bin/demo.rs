//! NFTicket Marketplace Demo
//!
//! Walks one event through its whole life against an in-memory ledger:
//! - Event creation and primary sale up to capacity
//! - Transfer cooldown, capped resale listing and purchase
//! - Royalty split and escrow withdrawal
//! - Door verification and check-in
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo --features demo
//! ```

use anyhow::Context;
use chrono::Duration;
use nfticket_core::environment::Clock;
use nfticket_marketplace::{Amount, Config, MarketEngine, NewEvent, metrics};
use nfticket_marketplace::types::Identity;
use nfticket_testing::{InMemoryLedger, ManualClock, test_epoch};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env if there is one
    let _ = dotenvy::dotenv();
    let config = Config::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| "info,nfticket_marketplace=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    metrics::register_business_metrics();

    println!("\n🎫 ============================================");
    println!("   NFTicket Marketplace - Live Demo");
    println!("============================================\n");

    let clock = Arc::new(ManualClock::starting_at(test_epoch()));
    let ledger = Arc::new(InMemoryLedger::new());
    let engine = MarketEngine::from_config(&config, clock.clone(), ledger);

    let organizer = Identity::new("0xorganizer");
    let alice = Identity::new("0xalice");
    let bob = Identity::new("0xbob");
    let carol = Identity::new("0xcarol");
    let price = Amount::parse_decimal("1.0")?;

    // Step 1: Create event
    println!("1️⃣  Creating event (2 tickets at {price})...");
    let event_id = engine
        .create_event(
            &organizer,
            NewEvent {
                title: "Summer Music Festival".to_string(),
                description: "Three stages, one night".to_string(),
                location: "Riverside Park".to_string(),
                date: clock.now() + Duration::days(30),
                ticket_price: price,
                max_tickets: 2,
                metadata_uri: "ipfs://festival".to_string(),
            },
        )
        .await?;
    println!("   ✓ Event {event_id} created\n");

    // Step 2: Primary sale
    println!("2️⃣  Minting tickets...");
    let token_id = engine.mint(&alice, event_id, price, "ipfs://seat-1").await?;
    engine.mint(&bob, event_id, price, "ipfs://seat-2").await?;
    println!("   ✓ Tickets minted, escrow holds {}", engine.escrow_balance().await);
    match engine.mint(&carol, event_id, price, "ipfs://seat-3").await {
        Ok(_) => println!("   ✗ Third mint unexpectedly succeeded"),
        Err(e) => println!("   ✓ Third mint rejected: {e}"),
    }
    println!();

    // Step 3: Cooldown
    println!("3️⃣  Listing before the cooldown elapses...");
    let resale = Amount::parse_decimal("1.05")?;
    if let Err(e) = engine.list(&alice, token_id, resale).await {
        println!("   ✓ Rejected: {e}");
    }
    clock.advance(Duration::hours(24));
    println!("   ⏰ 24 hours pass\n");

    // Step 4: Resale
    println!("4️⃣  Reselling ticket {token_id} at {resale}...");
    if let Err(e) = engine.list(&alice, token_id, Amount::parse_decimal("1.11")?).await {
        println!("   ✓ Over-cap listing rejected: {e}");
    }
    let listing_id = engine.list(&alice, token_id, resale).await?;
    println!("   ✓ Listing {listing_id} open");
    let receipt = engine.buy(&carol, token_id, resale).await?;
    println!(
        "   ✓ Sold to {}: royalty {} to {}, proceeds {} to {}",
        receipt.buyer, receipt.royalty, receipt.organizer, receipt.seller_proceeds, receipt.seller
    );
    println!("   ✓ Buyer may relist from {}\n", receipt.cooldown_until);

    // Step 5: Treasury
    println!("5️⃣  Withdrawing escrow...");
    let owner = engine.platform_owner().await;
    let withdrawn = engine.withdraw(&owner).await?;
    println!("   ✓ {withdrawn} moved to {owner}\n");

    // Step 6: Door
    println!("6️⃣  Checking in at the door...");
    let before = engine.verify(token_id).await;
    println!("   Before check-in: {}", before.reason.message());
    engine.mark_used(&organizer, token_id).await?;
    let after = engine.verify(token_id).await;
    println!("   After check-in:  {}", after.reason.message());

    println!("\n✅ Demo complete at ledger height {}", engine.height().await);
    Ok(())
}
