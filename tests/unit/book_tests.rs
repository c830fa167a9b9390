//! Order book engine scenarios.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use cyclebook_rs::prelude::*;

use crate::common::{btc_usd, dec, open_order, single_product_book};

fn match_order(id: &str, size: &str, price: &str, side: Side, at: DateTime<Utc>) -> Order {
    Order::new("BTC-USD", 0, side, dec(size), dec(price))
        .unwrap()
        .with_kind(OrderKind::Match)
        .with_order_id(id)
        .with_created_at(at)
}

#[test]
fn bid_ladder_lifecycle() {
    let book = single_product_book(btc_usd());
    book.apply(&open_order("BTC-USD", "0", Side::Bid, "1", "10")).unwrap();
    book.apply(&open_order("BTC-USD", "1", Side::Bid, "1", "9")).unwrap();
    assert_eq!(book.best_bid(), Some(dec("10")));
    assert_eq!(book.best_ask(), None);

    // fill order 0 in two steps: a partial match, then done-filled
    let now = Utc::now();
    book.apply(&match_order("0", "0.5", "10", Side::Bid, now)).unwrap();
    let done = match_order("0", "0.5", "10", Side::Bid, now).with_status(OrderStatus::Filled);
    book.apply(&done).unwrap();
    assert_eq!(book.best_bid(), Some(dec("9")));

    book.apply(&open_order("BTC-USD", "3", Side::Bid, "1", "8")).unwrap();
    let depth = book.price_depth(Side::Bid, dec("2"));
    assert_eq!(depth.best, Some(dec("9")));
    assert_eq!(depth.worst, Some(dec("8")));
    assert_eq!(depth.notional, dec("17"));
    assert_eq!(depth.excess, Decimal::ZERO);
    assert_eq!(depth.worst_fill, dec("1"));

    let cancel = Order::new("BTC-USD", 0, Side::Bid, dec("1"), dec("9"))
        .unwrap()
        .with_kind(OrderKind::Cancel)
        .with_status(OrderStatus::Canceled)
        .with_order_id("1");
    book.apply(&cancel).unwrap();
    assert_eq!(book.best_bid(), Some(dec("8")));
}

#[test]
fn both_sides_behave_symmetrically() {
    for side in Side::BOTH {
        let book = single_product_book(btc_usd());
        let other = side.opposite();
        let (best, worse, worst) = match side {
            Side::Ask => ("20", "21", "22"),
            Side::Bid => ("10", "9", "8"),
        };
        let other_best = match other {
            Side::Ask => "20",
            Side::Bid => "10",
        };
        let now = Utc::now();

        book.apply(&open_order("BTC-USD", "0", other, "1.0", other_best)).unwrap();
        book.apply(&open_order("BTC-USD", "1", side, "1.0", best)).unwrap();
        book.apply(&open_order("BTC-USD", "2", side, "1.0", worse)).unwrap();

        // match and fill the order at the best price
        book.apply(&match_order("1", "1.0", best, side, now)).unwrap();
        let done = match_order("1", "0", best, side, now).with_status(OrderStatus::Filled);
        book.apply(&done).unwrap();
        assert_eq!(book.best(side), Some(dec(worse)));
        assert_eq!(book.median_trade_size(side, OrderKind::Match, 10, Some(1)), Some(dec("1.0")));

        // a worse level behind the new best
        book.apply(&open_order("BTC-USD", "3", side, "1.0", worst)).unwrap();
        assert_eq!(book.best(side), Some(dec(worse)));
        let depth = book.price_depth(side, dec("2"));
        assert_eq!(depth.best, Some(dec(worse)));
        assert_eq!(depth.worst, Some(dec(worst)));
        assert_eq!(depth.notional, dec(worse) + dec(worst));
        assert_eq!(depth.excess, Decimal::ZERO);
        assert_eq!(depth.worst_fill, dec("1.0"));

        // cancel the best level
        let cancel = Order::new("BTC-USD", 0, side, dec("1.0"), dec(worse))
            .unwrap()
            .with_kind(OrderKind::Cancel)
            .with_status(OrderStatus::Canceled)
            .with_order_id("2");
        book.apply(&cancel).unwrap();
        assert_eq!(book.best(side), Some(dec(worst)));

        // resize the remaining order in place
        let mut change = Order::new("BTC-USD", 0, side, dec("1"), dec(worst))
            .unwrap()
            .with_kind(OrderKind::Change)
            .with_order_id("3");
        change.add_filled(dec("0.5"));
        book.apply(&change).unwrap();
        assert_eq!(book.best(side), Some(dec(worst)));
        assert_eq!(book.levels(side), vec![(dec(worst), dec("0.5"))]);

        // unknown order ids on cancel are a silent no-op
        let ghost = Order::new("BTC-USD", 0, side, dec("4"), dec(worst))
            .unwrap()
            .with_kind(OrderKind::Cancel)
            .with_status(OrderStatus::Canceled)
            .with_order_id("1e2");
        book.apply(&ghost).unwrap();
        assert_eq!(book.best(side), Some(dec(worst)));

        assert_eq!(book.best(other), Some(dec(other_best)));
    }
}

#[test]
fn per_second_buckets_coalesce() {
    let book = single_product_book(btc_usd());
    let now = Utc::now();
    for _ in 0..3 {
        let order = Order::new("BTC-USD", 0, Side::Bid, dec("0.5"), dec("10"))
            .unwrap()
            .with_kind(OrderKind::Match)
            .with_created_at(now)
            .historical();
        book.apply(&order).unwrap();
    }
    assert_eq!(
        book.trade_quantities(Side::Bid, OrderKind::Match, 10, Some(1)),
        vec![dec("1.5")]
    );
    assert_eq!(
        book.median_trade_size(Side::Bid, OrderKind::Match, 10, Some(1)),
        Some(dec("1.5"))
    );
    assert_eq!(
        book.mean_trade_size(Side::Bid, OrderKind::Match, 10, Some(1)),
        Some(dec("1.5"))
    );
    assert_eq!(book.volume(Side::Bid, OrderKind::Match, 10), dec("1.5"));
}

#[test]
fn grouping_follows_the_period() {
    let book = single_product_book(btc_usd());
    // anchor to the previous full century so bucket boundaries are known
    let base = (Utc::now().timestamp() / 100 - 1) * 100;
    for (offset, size) in [(10, "0.25"), (11, "0.5")] {
        let at = DateTime::from_timestamp(base + offset, 0).unwrap();
        let order = Order::new("BTC-USD", 0, Side::Ask, dec(size), dec("10"))
            .unwrap()
            .with_kind(OrderKind::Match)
            .with_created_at(at)
            .historical();
        book.apply(&order).unwrap();
    }
    assert_eq!(
        book.trade_quantities(Side::Ask, OrderKind::Match, 300, Some(1)),
        vec![dec("0.25"), dec("0.5")]
    );
    assert_eq!(
        book.trade_quantities(Side::Ask, OrderKind::Match, 300, Some(100)),
        vec![dec("0.75")]
    );
    assert_eq!(
        book.mode_trade_size(Side::Ask, OrderKind::Match, 300, Some(100)),
        Some(dec("0.75"))
    );
}

#[test]
fn ladder_sums_match_resting_orders() {
    let book = single_product_book(btc_usd());
    let now = Utc::now();
    for (id, size, price) in [("a", "1", "10"), ("b", "2", "10"), ("c", "0.5", "9.5")] {
        book.apply(&open_order("BTC-USD", id, Side::Bid, size, price)).unwrap();
    }
    book.apply(&match_order("a", "0.25", "10", Side::Bid, now)).unwrap();

    for (price, sum) in book.levels(Side::Bid) {
        let order_total: Decimal = book
            .level_orders(Side::Bid, price)
            .into_iter()
            .map(|(_, size)| size)
            .sum();
        assert_eq!(sum, order_total, "level {price} out of balance");
    }
}

#[test]
fn stale_events_leave_the_book_identical() {
    let book = single_product_book(btc_usd());
    let order = Order::new("BTC-USD", 5, Side::Bid, dec("1"), dec("10"))
        .unwrap()
        .with_order_id("0");
    book.apply(&order).unwrap();
    let before = book.levels(Side::Bid);

    let behind = Order::new("BTC-USD", 3, Side::Bid, dec("1"), dec("11"))
        .unwrap()
        .with_order_id("1");
    assert!(matches!(
        book.apply(&behind),
        Err(BookError::SequenceBehind { .. })
    ));
    assert_eq!(book.levels(Side::Bid), before);
    assert_eq!(book.sequence_id(), 5);
}

#[test]
fn placement_steps_inside_the_queue() {
    let book = single_product_book(btc_usd());
    // a deep best level: queue ahead never clears within one min size
    book.apply(&open_order("BTC-USD", "0", Side::Bid, "10", "9")).unwrap();
    book.apply(&open_order("BTC-USD", "1", Side::Ask, "10", "20")).unwrap();

    let placement = book.placement_price(Side::Bid, dec("1"), dec("0.5"), true).unwrap();
    assert_eq!(placement.price, dec("9.01"));
    assert_eq!(placement.fillable, dec("1.0"));

    // stepping disallowed: rest at best with nothing fillable
    let held = book.placement_price(Side::Bid, dec("1"), dec("0.5"), false).unwrap();
    assert_eq!(held.price, dec("9"));
    assert_eq!(held.fillable, Decimal::ZERO);

    // queue ahead fits within the min size: the worst walked price is optimal
    book.apply(&open_order("BTC-USD", "2", Side::Bid, "0.505", "9.5")).unwrap();
    let optimal = book.placement_price(Side::Bid, dec("1"), dec("0.5"), true).unwrap();
    assert_eq!(optimal.price, dec("9.5"));
    assert_eq!(optimal.fillable, dec("0.5"));

    // empty ladder: nothing to suggest
    let empty = single_product_book(btc_usd());
    assert!(empty.placement_price(Side::Bid, dec("1"), dec("0.5"), true).is_none());
}
