//! Portfolio accounting and trade-selection scenarios.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use cyclebook_rs::prelude::*;

use crate::common::{dec, open_order, three_product_manager};

fn funded_group() -> PortfolioGroup {
    let store = Arc::new(Store::new());
    let mut group = PortfolioGroup::new(store, three_product_manager());
    for currency in [Currency::USD, Currency::BTC, Currency::LTC] {
        group.credit(currency, dec("100"));
    }
    group
}

fn own_bid(group: &mut PortfolioGroup) {
    let order = open_order("BTC-USD", "1", Side::Bid, "1", "10.0");
    group.own_orders_mut().insert(order).unwrap();
}

#[test]
fn open_order_reduces_available_qty() {
    let mut group = funded_group();
    own_bid(&mut group);
    assert_eq!(group.available(Currency::USD), dec("90"));
    assert_eq!(group.available(Currency::BTC), dec("100"));
}

#[test]
fn partial_match_credits_destination() {
    let mut group = funded_group();
    own_bid(&mut group);
    group.handle_match("1", dec("0.5")).unwrap();
    assert_eq!(group.available(Currency::USD), dec("90"));
    assert_eq!(group.available(Currency::BTC), dec("100.5"));
}

#[test]
fn full_fill_settles_both_sides() {
    let mut group = funded_group();
    own_bid(&mut group);
    group.handle_match("1", dec("1")).unwrap();
    group.handle_done("1", OrderStatus::Filled).unwrap();
    assert_eq!(group.available(Currency::USD), dec("90"));
    assert_eq!(group.available(Currency::BTC), dec("101"));
    assert!(!group.own_orders().any_open());
}

#[test]
fn cancellation_restores_the_hold() {
    let mut group = funded_group();
    own_bid(&mut group);
    group.handle_done("1", OrderStatus::Canceled).unwrap();
    assert_eq!(group.available(Currency::USD), dec("100"));
    assert_eq!(group.available(Currency::BTC), dec("100"));
}

#[test]
fn balances_never_go_negative() {
    let mut group = funded_group();
    let result = group.debit(Currency::USD, dec("100.01"));
    assert!(matches!(
        result,
        Err(PortfolioError::InsufficientBalance { .. })
    ));
    assert_eq!(group.balance(Currency::USD), dec("100"));
}

#[test]
fn rejected_fill_leaves_order_and_balances_untouched() {
    let mut group = funded_group();
    own_bid(&mut group);
    // drain USD so the fill's debit cannot settle
    group.debit(Currency::USD, dec("95")).unwrap();
    let result = group.handle_match("1", dec("1"));
    assert!(matches!(
        result,
        Err(PortfolioError::InsufficientBalance { .. })
    ));
    assert_eq!(group.balance(Currency::USD), dec("5"));
    assert_eq!(group.balance(Currency::BTC), dec("100"));
    // the fill size did not advance, so the event can be replayed
    let (order, _) = group.own_orders().order_and_status("1").unwrap();
    assert_eq!(order.filled_size(), Decimal::ZERO);
    assert_eq!(order.remaining(), dec("1"));
}

#[test]
fn edge_qty_counts_only_matching_direction() {
    let mut group = funded_group();
    own_bid(&mut group);
    // the bid converts USD into BTC
    assert_eq!(
        group.own_orders().edge_qty(Currency::USD, Currency::BTC),
        dec("1")
    );
    assert_eq!(
        group.own_orders().edge_qty(Currency::BTC, Currency::USD),
        Decimal::ZERO
    );
    assert_eq!(
        group.own_orders().edges_with_open_orders(),
        [(Currency::USD, Currency::BTC)].into_iter().collect()
    );
}

#[test]
fn stale_and_unconfirmed_orders_are_observable() {
    let mut group = funded_group();
    let now = Utc::now();
    let aged = now - Duration::seconds(400);

    let mut confirmed = open_order("BTC-USD", "old", Side::Bid, "1", "10.0")
        .with_created_at(aged);
    confirmed.set_confirmed(true);
    group.own_orders_mut().insert(confirmed).unwrap();

    let lost = open_order("BTC-USD", "lost", Side::Bid, "1", "9.0")
        .with_created_at(now - Duration::seconds(700));
    group.own_orders_mut().insert(lost).unwrap();

    assert_eq!(
        group.own_orders().stale_open_order_ids(300, now),
        vec!["old".to_string()]
    );
    assert_eq!(
        group.own_orders().expired_unconfirmed_order_ids(600, now),
        vec!["lost".to_string()]
    );
    // fresh cutoffs observe nothing
    assert!(group.own_orders().stale_open_order_ids(500, now).is_empty());

    // untracking a lost order releases its hold
    let removed = group.own_orders_mut().remove("lost").unwrap();
    assert_eq!(removed.order_id(), Some("lost"));
    assert_eq!(group.available(Currency::USD), dec("90"));
}

/// Regression over the three-product setup: symmetric books, one recent
/// match each, skewed balances. One order per currency comes back.
#[test]
fn decision_pass_emits_one_order_per_currency() {
    let store = Arc::new(Store::new());
    let pm = three_product_manager();
    let books = OrderBookManager::new(Arc::clone(&store), Arc::clone(&pm));
    let network = NetworkManager::new(Arc::clone(&store));
    let now = Utc::now();

    let setup = [
        ("BTC-USD", Side::Bid, "1009.0"),
        ("BTC-USD", Side::Ask, "1010.0"),
        ("LTC-USD", Side::Bid, "10.1"),
        ("LTC-USD", Side::Ask, "10.2"),
        ("LTC-BTC", Side::Bid, "0.01"),
        ("LTC-BTC", Side::Ask, "0.011"),
    ];
    for (product_id, side, price) in setup {
        let book = books.book(product_id).unwrap();
        let resting = Order::new(product_id, 0, side, dec("10"), dec(price))
            .unwrap()
            .with_order_id(format!("{product_id}-{side}"))
            .with_created_at(now);
        book.apply(&resting).unwrap();
        let traded = Order::new(product_id, 0, side, dec("1"), dec(price))
            .unwrap()
            .with_kind(OrderKind::Match)
            .with_created_at(now)
            .historical();
        book.apply(&traded).unwrap();
        network.update_from_book(book, side).unwrap();
    }

    let mut group = PortfolioGroup::new(Arc::clone(&store), pm);
    for currency in [Currency::USD, Currency::BTC, Currency::LTC] {
        group.credit(currency, dec("100"));
    }
    group.debit(Currency::BTC, dec("99.9")).unwrap();
    group.debit(Currency::LTC, dec("90")).unwrap();

    let trader = Trader::new(EdgeKind::Mean, 1.005);
    let orders = trader.next_orders(&group).unwrap();

    let emitted: HashSet<(String, Side, Decimal, Decimal)> = orders
        .iter()
        .map(|order| {
            (
                order.product_id().to_string(),
                order.side(),
                order.size(),
                order.price(),
            )
        })
        .collect();
    let expected: HashSet<(String, Side, Decimal, Decimal)> = [
        ("LTC-BTC".to_string(), Side::Ask, dec("1.0000"), dec("0.0109")),
        ("LTC-USD".to_string(), Side::Bid, dec("1.00"), dec("10.11")),
        ("BTC-USD".to_string(), Side::Ask, dec("0.10"), dec("1009.99")),
    ]
    .into();
    assert_eq!(emitted, expected);
}

/// Allocation caps clamp order size: with the destination already at its
/// max fraction, nothing is placed.
#[test]
fn max_fraction_blocks_overweight_destinations() {
    let store = Arc::new(Store::new());
    let pm = three_product_manager();
    let books = OrderBookManager::new(Arc::clone(&store), Arc::clone(&pm));
    let network = NetworkManager::new(Arc::clone(&store));
    let now = Utc::now();

    let book = books.book("BTC-USD").unwrap();
    for (side, price) in [(Side::Bid, "1009.0"), (Side::Ask, "1010.0")] {
        let resting = Order::new("BTC-USD", 0, side, dec("10"), dec(price))
            .unwrap()
            .with_order_id(format!("o-{side}"))
            .with_created_at(now);
        book.apply(&resting).unwrap();
        let traded = Order::new("BTC-USD", 0, side, dec("1"), dec(price))
            .unwrap()
            .with_kind(OrderKind::Match)
            .with_created_at(now)
            .historical();
        book.apply(&traded).unwrap();
        network.update_from_book(book, side).unwrap();
    }

    // BTC may not grow at all
    store.set_num("portfolio:max_fraction:BTC", Decimal::ZERO);

    let mut group = PortfolioGroup::new(Arc::clone(&store), pm);
    group.credit(Currency::USD, dec("1000"));
    let trader = Trader::new(EdgeKind::Mean, 1.0);
    let orders = trader.next_orders(&group).unwrap();
    assert!(
        orders.iter().all(|order| order.side() != Side::Bid),
        "no USD->BTC order may be placed: {orders:?}"
    );
}
