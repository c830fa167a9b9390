//! Balances, holds, valuation and own-order event handling.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use super::own_orders::PortfolioOrderBook;
use super::targets::TargetFractions;
use super::PortfolioError;
use crate::book::OrderStatus;
use crate::network::NetworkManager;
use crate::product::{Currency, ProductManager};
use crate::store::Store;

/// How far a currency's allocation may move in one direction, in units of
/// that currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxDeltas {
    /// Largest sell-down before undershooting the min fraction
    pub decrease: Decimal,
    /// Largest buy-up before overshooting the max fraction
    pub increase: Decimal,
}

/// Tracked balances plus the own-order book, valued against the conversion
/// network.
pub struct PortfolioGroup {
    store: Arc<Store>,
    product_manager: Arc<ProductManager>,
    network: NetworkManager,
    targets: TargetFractions,
    holdings: BTreeMap<Currency, Decimal>,
    own_orders: PortfolioOrderBook,
}

impl PortfolioGroup {
    /// Empty portfolio over the product registry's currencies.
    pub fn new(store: Arc<Store>, product_manager: Arc<ProductManager>) -> Self {
        let holdings = product_manager
            .currencies()
            .into_iter()
            .map(|currency| (currency, Decimal::ZERO))
            .collect();
        Self {
            network: NetworkManager::new(Arc::clone(&store)),
            targets: TargetFractions::new(Arc::clone(&store)),
            own_orders: PortfolioOrderBook::new(Arc::clone(&product_manager)),
            store,
            product_manager,
            holdings,
        }
    }

    /// The product registry.
    pub fn product_manager(&self) -> &Arc<ProductManager> {
        &self.product_manager
    }

    /// The conversion-network view.
    pub fn network(&self) -> &NetworkManager {
        &self.network
    }

    /// The own-order book.
    pub fn own_orders(&self) -> &PortfolioOrderBook {
        &self.own_orders
    }

    /// Mutable own-order book, for registration and status flips.
    pub fn own_orders_mut(&mut self) -> &mut PortfolioOrderBook {
        &mut self.own_orders
    }

    /// Tracked balance of `currency`.
    pub fn balance(&self, currency: Currency) -> Decimal {
        self.holdings.get(&currency).copied().unwrap_or(Decimal::ZERO)
    }

    /// All tracked balances.
    pub fn balances(&self) -> BTreeMap<Currency, Decimal> {
        self.holdings.clone()
    }

    /// Balance minus holds. Exported to the store for operator visibility.
    pub fn available(&self, currency: Currency) -> Decimal {
        let available = self.balance(currency) - self.own_orders.hold_qty(currency);
        self.store
            .set_num(&format!("portfolio:available:{currency}"), available);
        available
    }

    /// Add `quantity` of `currency`.
    pub fn credit(&mut self, currency: Currency, quantity: Decimal) -> Decimal {
        let balance = self.holdings.entry(currency).or_insert(Decimal::ZERO);
        *balance += quantity;
        let balance = *balance;
        self.persist_balance(currency, balance);
        balance
    }

    /// Remove `quantity` of `currency`. Trades that would take a balance
    /// negative are rejected and leave state unchanged.
    pub fn debit(&mut self, currency: Currency, quantity: Decimal) -> Result<Decimal, PortfolioError> {
        let current = self.balance(currency);
        if current - quantity < Decimal::ZERO {
            return Err(PortfolioError::InsufficientBalance {
                currency,
                available: current,
                debit: quantity,
            });
        }
        let balance = self.holdings.entry(currency).or_insert(Decimal::ZERO);
        *balance -= quantity;
        let balance = *balance;
        self.persist_balance(currency, balance);
        Ok(balance)
    }

    fn persist_balance(&self, currency: Currency, balance: Decimal) {
        let key = format!("portfolio:balance:{currency}");
        self.store.set_num(&key, balance);
        // history of balance points, scored by time
        self.store
            .zadd(&key, Decimal::from(Utc::now().timestamp()), &balance.to_string());
    }

    /// Portfolio valued in USD through the best-price currency view.
    pub fn valuation(&self) -> (BTreeMap<Currency, (Decimal, Decimal)>, Decimal) {
        self.network.value_portfolio(&self.balances(), Currency::USD)
    }

    /// Available quantity per currency, zeroed where it falls below the
    /// exchange's per-currency minimum.
    pub fn tradable_quantities(&self) -> BTreeMap<Currency, Decimal> {
        self.holdings
            .keys()
            .map(|currency| {
                let available = self.available(*currency);
                let tradable = match self.product_manager.min_size(*currency) {
                    Some(min_size) if available < min_size => Decimal::ZERO,
                    _ => available,
                };
                (*currency, tradable)
            })
            .collect()
    }

    /// Per-currency allocation headroom from the live valuation and the
    /// operator-tunable target fractions. Empty when the portfolio values to
    /// zero; currencies without a USD edge are skipped.
    pub fn max_currency_deltas(&self) -> BTreeMap<Currency, MaxDeltas> {
        let (valued, total) = self.valuation();
        let mut deltas = BTreeMap::new();
        if total == Decimal::ZERO {
            return deltas;
        }
        for (currency, (value_usd, edge)) in valued {
            let (min_fraction, max_fraction) = self.targets.fractions(currency);
            let increase = ((max_fraction * total - value_usd) / edge).max(Decimal::ZERO);
            let decrease = ((value_usd - min_fraction * total) / edge).max(Decimal::ZERO);
            deltas.insert(currency, MaxDeltas { decrease, increase });
        }
        deltas
    }

    /// Apply a fill on one of our orders: the destination currency is
    /// credited and the source debited at the order's price.
    pub fn handle_match(&mut self, order_id: &str, fill_qty: Decimal) -> Result<(), PortfolioError> {
        let (order, _) = self
            .own_orders
            .order_and_status(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        let side = order.side();
        let price = order.price();
        let product = self
            .product_manager
            .product(order.product_id())
            .ok_or_else(|| PortfolioError::UnknownProduct(order.product_id().to_string()))?
            .clone();

        let source = product.source(side);
        let destination = product.destination(side);
        let source_qty = product.currency_qty_from_quote_qty(source, fill_qty, price);
        let destination_qty = product.currency_qty_from_quote_qty(destination, fill_qty, price);
        debug!(
            order_id,
            %source, %source_qty, %destination, %destination_qty,
            "own-order fill settles"
        );
        // settle balances before advancing the fill size: the debit can
        // reject the fill, and a rejected fill must leave both the balances
        // and the order untouched so the event can be replayed
        self.debit(source, source_qty)?;
        self.credit(destination, destination_qty);
        self.own_orders.match_order(order_id, fill_qty)?;
        Ok(())
    }

    /// Finish one of our orders. Cancellation restores the hold by removing
    /// the order from the open partition; no balance moves.
    pub fn handle_done(&mut self, order_id: &str, status: OrderStatus) -> Result<(), PortfolioError> {
        match status {
            OrderStatus::Filled => self.own_orders.fill_order(order_id),
            OrderStatus::Canceled => self.own_orders.cancel_order(order_id),
            other => Err(PortfolioError::InvalidDoneStatus(other)),
        }
    }
}
