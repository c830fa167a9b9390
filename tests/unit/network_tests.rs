//! Conversion-network scenarios, including the symmetric-book cycle
//! regression.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use cyclebook_rs::prelude::*;

use crate::common::{btc_usd, dec};

/// A BTC-USD book with three levels per side and one recent match near the
/// top of each.
fn seeded_book(store: &Arc<Store>) -> OrderBook {
    let book = OrderBook::new(Arc::clone(store), Arc::new(btc_usd()));
    let now = Utc::now();
    for side in Side::BOTH {
        let prices = match side {
            Side::Bid => ["100", "150", "50"],
            Side::Ask => ["400", "350", "450"],
        };
        for (index, price) in prices.iter().enumerate() {
            let order = Order::new("BTC-USD", 0, side, dec("1.0"), dec(price))
                .unwrap()
                .with_order_id(format!("{side}-{index}"))
                .with_created_at(now);
            book.apply(&order).unwrap();
            let traded = Order::new("BTC-USD", 0, side, dec("0.5"), dec(price))
                .unwrap()
                .with_kind(OrderKind::Match)
                .with_created_at(now)
                .historical();
            book.apply(&traded).unwrap();
        }
    }
    book
}

#[test]
fn mean_edges_reproduce_the_symmetric_cycle() {
    let store = Arc::new(Store::new());
    let book = seeded_book(&store);
    let network = NetworkManager::new(Arc::clone(&store));

    for side in Side::BOTH {
        let best = match side {
            Side::Bid => "150",
            Side::Ask => "350",
        };
        assert_eq!(book.best(side), Some(dec(best)));
        assert_eq!(
            book.median_trade_size(side, OrderKind::Match, 100, None),
            Some(dec("1.5"))
        );
        assert_eq!(
            book.mean_trade_size(side, OrderKind::Match, 100, None),
            Some(dec("1.5"))
        );
        network.update_from_book(&book, side).unwrap();
    }

    let hops = network.next_hops(EdgeKind::Mean, Currency::USD);
    assert_eq!(hops.len(), 1);
    let (value, hop) = hops.iter().next_back().unwrap();
    assert!((value.0 - 2.333_111_125_924_938_6).abs() < 1e-9);
    assert_eq!(hop.next, Currency::BTC);
    assert_eq!(hop.price, dec("150.01"));
    assert_eq!(hop.available, dec("1.5"));

    let hops = network.next_hops(EdgeKind::Mean, Currency::BTC);
    assert_eq!(hops.len(), 1);
    let (value, hop) = hops.iter().next_back().unwrap();
    assert!((value.0 - 2.333_111_125_924_938_6).abs() < 1e-9);
    assert_eq!(hop.next, Currency::USD);
    assert_eq!(hop.price, dec("349.99"));
    assert_eq!(hop.available, dec("1.5"));
}

#[test]
fn best_edges_carry_unbounded_depth() {
    let store = Arc::new(Store::new());
    let book = seeded_book(&store);
    let network = NetworkManager::new(Arc::clone(&store));
    for side in Side::BOTH {
        network.update_from_book(&book, side).unwrap();
    }

    assert_eq!(
        network.edge_weight(
            NetKind::Price,
            EdgeKind::Best,
            QuoteView::Product,
            Currency::USD,
            Currency::BTC,
        ),
        Some(dec("150"))
    );
    assert_eq!(
        network.edge_weight(
            NetKind::Quantity,
            EdgeKind::Best,
            QuoteView::Product,
            Currency::USD,
            Currency::BTC,
        ),
        Some(dec("1000000000"))
    );
    // the reciprocal view converts held BTC into USD at the best ask
    assert_eq!(
        network.edge_weight(
            NetKind::Price,
            EdgeKind::Best,
            QuoteView::Currency,
            Currency::BTC,
            Currency::USD,
        ),
        Some(dec("350"))
    );
}

#[test]
fn custom_edges_never_step_past_best() {
    let store = Arc::new(Store::new());
    let book = seeded_book(&store);
    let network = NetworkManager::new(Arc::clone(&store));
    network.update_from_book(&book, Side::Bid).unwrap();

    // custom flavor walks 0.075 of depth at the best level and is pinned
    // there with nothing fillable
    assert_eq!(
        network.edge_weight(
            NetKind::Price,
            EdgeKind::Custom,
            QuoteView::Product,
            Currency::USD,
            Currency::BTC,
        ),
        Some(dec("150"))
    );
    assert_eq!(
        network.edge_weight(
            NetKind::Quantity,
            EdgeKind::Custom,
            QuoteView::Product,
            Currency::USD,
            Currency::BTC,
        ),
        Some(Decimal::ZERO)
    );
}

#[test]
fn valuation_uses_best_currency_edges() {
    let store = Arc::new(Store::new());
    let book = seeded_book(&store);
    let network = NetworkManager::new(Arc::clone(&store));
    for side in Side::BOTH {
        network.update_from_book(&book, side).unwrap();
    }

    let balances: BTreeMap<Currency, Decimal> =
        [(Currency::USD, dec("100")), (Currency::BTC, dec("1"))].into();
    let (valued, total) = network.value_portfolio(&balances, Currency::USD);
    assert_eq!(valued[&Currency::USD], (dec("100"), Decimal::ONE));
    assert_eq!(valued[&Currency::BTC], (dec("350"), dec("350")));
    assert_eq!(total, dec("450"));

    // currencies without an edge to the target are skipped
    let balances: BTreeMap<Currency, Decimal> = [(Currency::ETH, dec("5"))].into();
    let (valued, total) = network.value_portfolio(&balances, Currency::USD);
    assert!(valued.is_empty());
    assert_eq!(total, Decimal::ZERO);
}
