//! Discovery and request/response tests against a populated engine.
//!
//! Run with: `cargo test --test discovery_test`

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use chrono::Duration;
use common::{Market, alice, bob, organizer, tokens};
use nfticket_core::environment::Clock;
use nfticket_marketplace::discovery::DiscoveryScanner;
use nfticket_marketplace::error::ErrorKind;
use nfticket_marketplace::{MarketEngine, Request, Response, TokenId};
use nfticket_testing::{InMemoryLedger, ManualClock, test_epoch};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_scan_events_skips_inactive_ids() {
    let market = Market::new();
    for _ in 0..4 {
        market.event(tokens("1.0"), 10).await;
    }
    market
        .engine
        .deactivate_event(&organizer(), nfticket_marketplace::EventId::new(2))
        .await
        .unwrap();

    let result = market.engine.scan_events(1, 20).await;
    let ids: Vec<u64> = result.items.iter().map(|e| e.event_id.value()).collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert!(!result.truncated);
    assert_eq!(result.last_probed, Some(20));

    assert!(market.engine.scan_events(5, 4).await.items.is_empty());
}

#[tokio::test]
async fn test_scan_listings_finds_active_listings_by_token() {
    let market = Market::new();
    let event_id = market.event(tokens("1.0"), 10).await;
    let first = market.mint(event_id, &alice()).await;
    let second = market.mint(event_id, &alice()).await;
    let third = market.mint(event_id, &bob()).await;
    market.pass(Duration::hours(24));

    market.engine.list(&alice(), first, tokens("1.0")).await.unwrap();
    market.engine.list(&alice(), second, tokens("1.0")).await.unwrap();
    market.engine.list(&bob(), third, tokens("1.1")).await.unwrap();
    market.engine.cancel_listing(&alice(), second).await.unwrap();

    let max = market.engine.last_token_id().await;
    let result = market.engine.scan_listings(max).await;
    let tokens_found: Vec<TokenId> = result.items.iter().map(|l| l.token_id).collect();
    assert_eq!(tokens_found, vec![first, third]);

    assert!(market.engine.scan_listings(0).await.items.is_empty());
}

#[tokio::test]
async fn test_scan_ceiling_pages_through_events() {
    let clock = Arc::new(ManualClock::starting_at(test_epoch()));
    let ledger = Arc::new(InMemoryLedger::new());
    let env = nfticket_marketplace::MarketEnvironment::new(clock.clone(), ledger)
        .with_scanner(DiscoveryScanner::new(3));
    let engine = MarketEngine::new(env, common::platform());

    for _ in 0..7 {
        engine
            .create_event(
                &organizer(),
                common::new_event(clock.now() + Duration::days(1), tokens("1.0"), 1),
            )
            .await
            .unwrap();
    }

    let mut from = 1;
    let mut found = Vec::new();
    loop {
        let page = engine.scan_events(from, 7).await;
        assert!(page.items.len() <= 3);
        found.extend(page.items.iter().map(|e| e.event_id.value()));
        match page.next_from() {
            Some(next) => from = next,
            None => break,
        }
    }
    assert_eq!(found, (1..=7).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_json_dispatch_round_trip() {
    let market = Market::new();
    let event_id = market.event(tokens("1.0"), 2).await;

    let minted = market
        .engine
        .dispatch_json(
            &alice(),
            &json!({
                "op": "mint",
                "event_id": event_id.value(),
                "payment": "1000000000000000000",
                "token_uri": "ipfs://seat"
            })
            .to_string(),
        )
        .await
        .unwrap();
    assert_eq!(minted, Response::TicketMinted(TokenId::new(1)));

    let early = market
        .engine
        .dispatch(
            &alice(),
            Request::List {
                token_id: TokenId::new(1),
                price: tokens("1.0"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(early.kind(), ErrorKind::Cooldown);

    let cooldown = market
        .engine
        .dispatch(&alice(), Request::CooldownRemaining { token_id: TokenId::new(1) })
        .await
        .unwrap();
    assert_eq!(cooldown, Response::Cooldown(Some(86_400)));

    let malformed = market.engine.dispatch_json(&alice(), "{\"op\": \"teleport\"}").await;
    assert_eq!(malformed.unwrap_err().kind, ErrorKind::Validation);

    let policy = market.engine.dispatch(&alice(), Request::Policy).await.unwrap();
    match policy {
        Response::Policy(policy) => {
            assert_eq!(policy.max_resale_percentage, 110);
            assert_eq!(policy.royalty_percentage, 5);
        },
        other => panic!("unexpected response {other:?}"),
    }
}
