//! Startup state: product registry, book snapshots, trade replay, balances
//! and already-open own orders.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::EngineError;
use crate::book::{Order, OrderBookManager, OrderKind};
use crate::exchange::ExchangeClient;
use crate::portfolio::PortfolioGroup;
use crate::product::{Currency, Product, ProductManager, Side};

/// Build the product registry from the exchange's product and currency
/// listings. Currencies outside the closed enumeration are skipped.
pub async fn product_manager<C: ExchangeClient>(client: &C) -> Result<ProductManager, EngineError> {
    let mut registry = ProductManager::new();
    for currency in client.currencies().await? {
        match currency.id.parse::<Currency>() {
            Ok(parsed) => registry.set_currency_min_size(parsed, currency.min_size),
            Err(_) => debug!(id = %currency.id, "currency not traded, skipped"),
        }
    }
    for info in client.products().await? {
        let (Ok(quote), Ok(base)) = (
            info.quote_currency.parse::<Currency>(),
            info.base_currency.parse::<Currency>(),
        ) else {
            debug!(id = %info.id, "product outside traded currencies, skipped");
            continue;
        };
        match Product::new(info.id, quote, base, info.quote_increment, info.base_min_size) {
            Ok(product) => registry.insert(product),
            Err(error) => warn!(%error, "exchange listed an invalid product"),
        }
    }
    info!(products = registry.len(), "product registry built");
    Ok(registry)
}

/// Seed every book from a level-3 snapshot, then replay recent trades into
/// the history window as historical matches.
pub async fn books<C: ExchangeClient>(
    client: &C,
    books: &OrderBookManager,
) -> Result<(), EngineError> {
    for book in books.books() {
        let product_id = book.product_id().to_string();
        let snapshot = client.book_snapshot(&product_id).await?;
        for (side, levels) in [(Side::Bid, &snapshot.bids), (Side::Ask, &snapshot.asks)] {
            for level in levels {
                let order = Order::new(&product_id, snapshot.sequence, side, level.size, level.price)?
                    .with_order_id(level.order_id.as_str());
                book.apply(&order)?;
            }
        }
        for trade in client.recent_trades(&product_id).await? {
            let order = Order::new(
                &product_id,
                snapshot.sequence,
                trade.side.into(),
                trade.size,
                trade.price,
            )?
            .with_kind(OrderKind::Match)
            .with_created_at(trade.time)
            .historical();
            book.apply(&order)?;
        }
        info!(%product_id, sequence = snapshot.sequence, "book bootstrapped");
    }
    Ok(())
}

/// Load balances for traded currencies and adopt our already-open orders as
/// confirmed. Returns the registered own-order ids.
pub async fn portfolio<C: ExchangeClient>(
    client: &C,
    group: &mut PortfolioGroup,
) -> Result<HashSet<String>, EngineError> {
    let currencies = group.product_manager().currencies();
    for account in client.accounts().await? {
        let Ok(currency) = account.currency.parse::<Currency>() else {
            continue;
        };
        if currencies.contains(&currency) {
            group.credit(currency, account.balance);
        }
    }

    let product_ids: HashSet<String> = group
        .product_manager()
        .product_ids()
        .map(str::to_string)
        .collect();
    let mut registered = HashSet::new();
    for placed in client.open_orders().await? {
        if !product_ids.contains(&placed.product_id) {
            continue;
        }
        let order_id = placed.id.clone();
        let mut order = placed.into_order()?;
        order.set_confirmed(true);
        group.own_orders_mut().insert(order)?;
        registered.insert(order_id);
    }
    info!(open_orders = registered.len(), "portfolio bootstrapped");
    Ok(registered)
}
