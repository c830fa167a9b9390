//! Shared fixtures.

use std::sync::Arc;

use rust_decimal::Decimal;

use cyclebook_rs::prelude::*;

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn btc_usd() -> Product {
    Product::new("BTC-USD", Currency::USD, Currency::BTC, dec("0.01"), dec("0.01")).unwrap()
}

pub fn ltc_usd() -> Product {
    Product::new("LTC-USD", Currency::USD, Currency::LTC, dec("0.01"), dec("0.01")).unwrap()
}

pub fn ltc_btc() -> Product {
    Product::new("LTC-BTC", Currency::BTC, Currency::LTC, dec("0.0001"), dec("0.0001")).unwrap()
}

/// The three-product registry the cycle scenarios run on.
pub fn three_product_manager() -> Arc<ProductManager> {
    let mut pm = ProductManager::new();
    pm.insert(btc_usd());
    pm.insert(ltc_usd());
    pm.insert(ltc_btc());
    Arc::new(pm)
}

pub fn single_product_book(product: Product) -> OrderBook {
    OrderBook::new(Arc::new(Store::new()), Arc::new(product))
}

pub fn open_order(
    product_id: &str,
    id: &str,
    side: Side,
    size: &str,
    price: &str,
) -> Order {
    Order::new(product_id, 0, side, dec(size), dec(price))
        .unwrap()
        .with_order_id(id)
}
