//! Ticket lifecycle tests.
//!
//! Drives one event from creation through primary sale, resale, royalty
//! payout and check-in, checking every balance on the way.
//!
//! Run with: `cargo test --test lifecycle_test`

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Duration;
use common::{Market, alice, bob, carol, new_event, organizer, platform, tokens};
use nfticket_core::environment::Clock;
use nfticket_marketplace::types::{EventStatus, ListingStatus};
use nfticket_marketplace::verification::VerificationReason;
use nfticket_marketplace::{Amount, EventId, ListingId, MarketError, TokenId};

/// Capacity 2 at 1.0: two mints, a rejected third, a 24h wait, a 1.05 resale.
#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let market = Market::new();
    let engine = &market.engine;
    let event_id = market.event(tokens("1.0"), 2).await;
    assert_eq!(event_id, EventId::new(1));

    // Primary sale
    let first = engine.mint(&alice(), event_id, tokens("1.0"), "ipfs://1").await.unwrap();
    let second = engine.mint(&bob(), event_id, tokens("1.0"), "ipfs://2").await.unwrap();
    assert_eq!((first, second), (TokenId::new(1), TokenId::new(2)));

    let third = engine.mint(&carol(), event_id, tokens("1.0"), "ipfs://3").await;
    assert!(matches!(third, Err(MarketError::SoldOut { max_tickets: 2, .. })));
    assert_eq!(engine.get_event(event_id).await.unwrap().sold_tickets, 2);
    assert_eq!(engine.event_status(event_id).await.unwrap(), EventStatus::SoldOut);
    assert_eq!(engine.escrow_balance().await, tokens("2.0"));

    // Resale after the cooldown
    market.pass(Duration::hours(24));
    let listing_id = engine.list(&alice(), first, tokens("1.05")).await.unwrap();
    assert_eq!(listing_id, ListingId::new(1));

    let receipt = engine.buy(&carol(), first, tokens("1.05")).await.unwrap();
    assert_eq!(receipt.royalty, tokens("0.0525"));
    assert_eq!(receipt.seller_proceeds, tokens("0.9975"));
    assert_eq!(receipt.organizer, organizer());
    assert_eq!(receipt.seller, alice());
    assert_eq!(receipt.cooldown_until, market.clock.now() + Duration::hours(24));

    assert_eq!(engine.balance_of(&organizer()).await, tokens("0.0525"));
    assert_eq!(engine.balance_of(&alice()).await, tokens("0.9975"));
    assert_eq!(engine.get_ticket(first).await.unwrap().owner, carol());
    assert_eq!(engine.tickets_by_owner(&carol()).await, vec![first]);
    assert!(engine.tickets_by_owner(&alice()).await.is_empty());
    assert_eq!(
        engine.get_listing(listing_id).await.unwrap().status,
        ListingStatus::Sold
    );
    assert!(engine.active_listings().await.is_empty());

    // Cooldown re-armed for the buyer
    let relist = engine.list(&carol(), first, tokens("1.05")).await;
    assert!(matches!(relist, Err(MarketError::Cooldown { .. })));
    assert_eq!(
        engine.cooldown_remaining(first).await.unwrap(),
        Some(Duration::hours(24))
    );

    // Escrow withdrawal
    let withdrawn = engine.withdraw(&platform()).await.unwrap();
    assert_eq!(withdrawn, tokens("2.0"));
    assert_eq!(engine.escrow_balance().await, Amount::ZERO);
    assert_eq!(engine.balance_of(&platform()).await, tokens("2.0"));
}

#[tokio::test]
async fn test_create_event_rejects_invalid_input() {
    let market = Market::new();
    let now = market.clock.now();

    let past = new_event(now, tokens("1.0"), 10);
    let free = new_event(now + Duration::days(1), Amount::ZERO, 10);
    let empty = new_event(now + Duration::days(1), tokens("1.0"), 0);
    let mut untitled = new_event(now + Duration::days(1), tokens("1.0"), 10);
    untitled.title = String::new();

    for draft in [past, free, empty, untitled] {
        let result = market.engine.create_event(&organizer(), draft).await;
        assert!(matches!(result, Err(MarketError::Validation { .. })));
    }
    assert!(market.engine.events_by_organizer(&organizer()).await.is_empty());
}

#[tokio::test]
async fn test_mint_error_order() {
    let market = Market::new();
    let event_id = market.event(tokens("1.0"), 1).await;

    let missing = market
        .engine
        .mint(&alice(), EventId::new(42), tokens("1.0"), "ipfs://x")
        .await;
    assert!(matches!(missing, Err(MarketError::NotFound { id: 42, .. })));

    let blank_uri = market.engine.mint(&alice(), EventId::new(42), tokens("1.0"), "").await;
    assert!(matches!(blank_uri, Err(MarketError::Validation { .. })));

    let overpaid = market.engine.mint(&alice(), event_id, tokens("1.5"), "ipfs://x").await;
    assert_eq!(
        overpaid.unwrap_err(),
        MarketError::PaymentMismatch {
            expected: tokens("1.0"),
            received: tokens("1.5"),
        }
    );

    market.engine.deactivate_event(&organizer(), event_id).await.unwrap();
    let inactive = market.engine.mint(&alice(), event_id, tokens("1.5"), "ipfs://x").await;
    assert_eq!(inactive.unwrap_err(), MarketError::EventInactive(event_id));
    assert_eq!(market.engine.escrow_balance().await, Amount::ZERO);
}

#[tokio::test]
async fn test_deactivate_is_organizer_only_and_terminal() {
    let market = Market::new();
    let event_id = market.event(tokens("1.0"), 3).await;

    let stranger = market.engine.deactivate_event(&alice(), event_id).await;
    assert!(matches!(stranger, Err(MarketError::Unauthorized { .. })));

    market.engine.deactivate_event(&organizer(), event_id).await.unwrap();
    let again = market.engine.deactivate_event(&organizer(), event_id).await;
    assert_eq!(again.unwrap_err(), MarketError::AlreadyInactive(event_id));

    let missing = market.engine.deactivate_event(&organizer(), EventId::new(9)).await;
    assert!(matches!(missing, Err(MarketError::NotFound { .. })));
    assert_eq!(
        market.engine.event_status(event_id).await.unwrap(),
        EventStatus::Cancelled
    );
}

#[tokio::test]
async fn test_check_in_and_verification() {
    let market = Market::new();
    let event_id = market.event(tokens("1.0"), 3).await;
    let token = market.mint(event_id, &alice()).await;

    let fresh = market.engine.verify(token).await;
    assert!(fresh.is_valid);
    assert_eq!(fresh.reason, VerificationReason::Valid);

    let by_owner = market.engine.mark_used(&alice(), token).await;
    assert!(matches!(by_owner, Err(MarketError::Unauthorized { .. })));

    market.engine.mark_used(&organizer(), token).await.unwrap();
    let again = market.engine.mark_used(&organizer(), token).await;
    assert_eq!(again.unwrap_err(), MarketError::AlreadyUsed(token));

    let used = market.engine.verify(token).await;
    assert!(!used.is_valid);
    assert_eq!(used.reason, VerificationReason::AlreadyUsed);
    assert_eq!(used.reason.message(), "This ticket has already been used.");

    let missing = market.engine.verify(TokenId::new(99)).await;
    assert_eq!(missing.reason, VerificationReason::DoesNotExist);
}

#[tokio::test]
async fn test_verification_after_event_date_and_cancellation() {
    let market = Market::new();
    let event_id = market.event(tokens("1.0"), 3).await;
    let token = market.mint(event_id, &alice()).await;

    market.engine.deactivate_event(&organizer(), event_id).await.unwrap();
    assert_eq!(
        market.engine.verify(token).await.reason,
        VerificationReason::EventCancelled
    );

    market.pass(Duration::days(31));
    let ended = market.engine.verify(token).await;
    assert_eq!(ended.reason, VerificationReason::EventEnded);
    assert_eq!(
        ended.reason.message(),
        "This ticket is for an event that has already ended."
    );
}

#[tokio::test]
async fn test_organizer_verification_and_withdraw_permissions() {
    let market = Market::new();

    let not_owner = market.engine.verify_organizer(&alice(), &organizer()).await;
    assert!(matches!(not_owner, Err(MarketError::Unauthorized { .. })));

    market.engine.verify_organizer(&platform(), &organizer()).await.unwrap();
    assert!(market.engine.is_verified_organizer(&organizer()).await);
    assert!(!market.engine.is_verified_organizer(&alice()).await);

    let empty = market.engine.withdraw(&platform()).await;
    assert!(matches!(empty, Err(MarketError::Validation { .. })));

    let event_id = market.event(tokens("2.5"), 3).await;
    market.mint(event_id, &alice()).await;
    let stranger = market.engine.withdraw(&alice()).await;
    assert!(matches!(stranger, Err(MarketError::Unauthorized { .. })));
    assert_eq!(market.engine.withdraw(&platform()).await.unwrap(), tokens("2.5"));
}
