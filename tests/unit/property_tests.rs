//! Property checks for rounding and cycle canonicalization.

use proptest::prelude::*;
use rust_decimal::Decimal;

use cyclebook_rs::network::canonical_rotation;
use cyclebook_rs::prelude::*;

use crate::common::{btc_usd, dec};

proptest! {
    #[test]
    fn round_quantity_never_oversizes(units in 0i64..10_000_000, scale in 0u32..6) {
        let product = btc_usd();
        let quantity = Decimal::new(units, scale);
        let rounded = product.round_quantity(quantity);
        prop_assert!(rounded <= quantity);
        prop_assert_eq!(rounded % product.base_min_size(), Decimal::ZERO);
    }

    #[test]
    fn round_price_lands_on_the_increment(units in 0i64..10_000_000, scale in 0u32..6) {
        let product = btc_usd();
        let price = Decimal::new(units, scale);
        let rounded = product.round_price(price);
        prop_assert_eq!(rounded % product.quote_increment(), Decimal::ZERO);
        // banker's rounding stays within half an increment
        prop_assert!((rounded - price).abs() * dec("2") <= product.quote_increment());
    }

    #[test]
    fn canonical_rotation_is_idempotent(
        cycle in proptest::sample::subsequence(&Currency::ALL[..], 1..=4).prop_shuffle()
    ) {
        let once = canonical_rotation(&cycle);
        prop_assert_eq!(canonical_rotation(&once), once.clone());
        let greatest = cycle.iter().max().copied().unwrap();
        prop_assert_eq!(once[0], greatest);
    }
}
