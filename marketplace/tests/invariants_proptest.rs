//! Property tests for the marketplace invariants.
//!
//! - sold tickets never exceed capacity, whatever the number of attempts
//! - a listing is accepted iff its price is within 110% of the mint price
//! - royalty plus proceeds always equal the sale price
//!
//! Run with: `cargo test --test invariants_proptest`

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Duration;
use common::{Market, alice, bob};
use nfticket_marketplace::{Amount, Identity, MarketError, MarketPolicy};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sold_never_exceeds_capacity(max_tickets in 1u32..8, attempts in 0usize..16) {
        tokio_test::block_on(async {
            let market = Market::new();
            let price = Amount::from_base_units(1_000);
            let event_id = market.event(price, max_tickets).await;

            let mut minted = 0usize;
            for i in 0..attempts {
                let buyer = Identity::new(format!("0xbuyer{i}"));
                match market.engine.mint(&buyer, event_id, price, "ipfs://t").await {
                    Ok(_) => minted += 1,
                    Err(error) => assert!(matches!(error, MarketError::SoldOut { .. })),
                }
            }

            let event = market.engine.get_event(event_id).await.unwrap();
            assert!(event.sold_tickets <= event.max_tickets);
            assert_eq!(minted, attempts.min(max_tickets as usize));
            assert_eq!(event.sold_tickets as usize, minted);
        });
    }

    #[test]
    fn listing_accepted_iff_within_cap(original in 1u128..1_000_000, price in 1u128..1_200_000) {
        tokio_test::block_on(async {
            let market = Market::new();
            let event_id = market.event(Amount::from_base_units(original), 1).await;
            let token = market.mint(event_id, &alice()).await;
            market.pass(Duration::hours(24));

            let result = market.engine.list(&alice(), token, Amount::from_base_units(price)).await;
            if price * 100 <= original * 110 {
                assert!(result.is_ok());
            } else {
                assert!(matches!(result, Err(MarketError::PriceCap { .. })));
            }
        });
    }

    #[test]
    fn royalty_and_proceeds_sum_to_price(original in 20u128..10_000_000) {
        tokio_test::block_on(async {
            let market = Market::new();
            let event_id = market.event(Amount::from_base_units(original), 1).await;
            let token = market.mint(event_id, &alice()).await;
            market.pass(Duration::hours(24));

            let price = MarketPolicy::default()
                .max_resale_price(Amount::from_base_units(original))
                .unwrap();
            market.engine.list(&alice(), token, price).await.unwrap();
            let receipt = market.engine.buy(&bob(), token, price).await.unwrap();

            assert_eq!(receipt.royalty.base_units(), price.base_units() * 5 / 100);
            assert_eq!(
                receipt.royalty.checked_add(receipt.seller_proceeds),
                Some(price)
            );
        });
    }
}
