//! Status-partitioned book of our own orders.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use super::PortfolioError;
use crate::book::{Order, OrderStatus};
use crate::product::{Currency, ProductManager};

/// Our own orders, partitioned by lifecycle status. An order lives in
/// exactly one partition; the only transitions are `open -> filled` and
/// `open -> canceled`.
pub struct PortfolioOrderBook {
    product_manager: Arc<ProductManager>,
    orders: BTreeMap<OrderStatus, HashMap<String, Order>>,
}

impl PortfolioOrderBook {
    /// Empty own-order book over the product registry.
    pub fn new(product_manager: Arc<ProductManager>) -> Self {
        let orders = OrderStatus::ALL
            .into_iter()
            .map(|status| (status, HashMap::new()))
            .collect();
        Self {
            product_manager,
            orders,
        }
    }

    /// The product registry.
    pub fn product_manager(&self) -> &Arc<ProductManager> {
        &self.product_manager
    }

    /// Currencies covered by the registry.
    pub fn currencies(&self) -> BTreeSet<Currency> {
        self.product_manager.currencies()
    }

    /// Orders in one partition.
    pub fn orders(&self, status: OrderStatus) -> &HashMap<String, Order> {
        self.orders.get(&status).expect("all partitions exist")
    }

    fn orders_mut(&mut self, status: OrderStatus) -> &mut HashMap<String, Order> {
        self.orders.get_mut(&status).expect("all partitions exist")
    }

    /// Whether any order is resting.
    pub fn any_open(&self) -> bool {
        !self.orders(OrderStatus::Open).is_empty()
    }

    /// Track a new own order under its current status.
    pub fn insert(&mut self, order: Order) -> Result<(), PortfolioError> {
        let Some(order_id) = order.order_id().map(str::to_string) else {
            return Err(PortfolioError::MissingOrderId);
        };
        info!(%order_id, %order, "own order tracked");
        self.orders_mut(order.status()).insert(order_id, order);
        Ok(())
    }

    /// Stop tracking an order, whatever its status.
    pub fn remove(&mut self, order_id: &str) -> Result<Order, PortfolioError> {
        let status = self
            .status_of(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        info!(order_id, "own order removed");
        self.orders_mut(status)
            .remove(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))
    }

    /// The order and the partition it lives in.
    pub fn order_and_status(&self, order_id: &str) -> Option<(&Order, OrderStatus)> {
        for status in OrderStatus::ALL {
            if let Some(order) = self.orders(status).get(order_id) {
                return Some((order, status));
            }
        }
        None
    }

    fn status_of(&self, order_id: &str) -> Option<OrderStatus> {
        self.order_and_status(order_id).map(|(_, status)| status)
    }

    /// Move an order to a new partition, updating its status.
    pub fn update_status(
        &mut self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<(), PortfolioError> {
        let current = self
            .status_of(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        let mut order = self
            .orders_mut(current)
            .remove(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        order.update_status(status);
        self.orders_mut(status).insert(order_id.to_string(), order);
        Ok(())
    }

    /// Record a fill against an open order.
    pub fn match_order(&mut self, order_id: &str, quantity: Decimal) -> Result<(), PortfolioError> {
        info!(order_id, %quantity, "own order matched");
        let status = self
            .status_of(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        let order = self
            .orders_mut(status)
            .get_mut(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        order.add_filled(quantity);
        Ok(())
    }

    /// Transition an order to filled.
    pub fn fill_order(&mut self, order_id: &str) -> Result<(), PortfolioError> {
        info!(order_id, "own order filled");
        self.update_status(order_id, OrderStatus::Filled)
    }

    /// Transition an order to canceled.
    pub fn cancel_order(&mut self, order_id: &str) -> Result<(), PortfolioError> {
        info!(order_id, "own order canceled");
        self.update_status(order_id, OrderStatus::Canceled)
    }

    /// Mark an order as acknowledged by the exchange.
    pub fn confirm_order(&mut self, order_id: &str) -> Result<(), PortfolioError> {
        info!(order_id, "own order confirmed");
        let status = self
            .status_of(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        let order = self
            .orders_mut(status)
            .get_mut(order_id)
            .ok_or_else(|| PortfolioError::UnknownOrder(order_id.to_string()))?;
        order.set_confirmed(true);
        Ok(())
    }

    /// Quantity of `currency` reserved by open orders that spend it.
    pub fn hold_qty(&self, currency: Currency) -> Decimal {
        let mut held = Decimal::ZERO;
        for order in self.orders(OrderStatus::Open).values() {
            let Some(product) = self.product_manager.product(order.product_id()) else {
                continue;
            };
            if product.source(order.side()) == currency {
                held += product.currency_qty_from_quote_qty(
                    currency,
                    order.remaining(),
                    order.price(),
                );
            }
        }
        held
    }

    /// Remaining product quantity of open orders already working the
    /// `source -> destination` edge. Note this is product (base) quantity,
    /// not source-currency quantity.
    pub fn edge_qty(&self, source: Currency, destination: Currency) -> Decimal {
        let mut total = Decimal::ZERO;
        for order in self.orders(OrderStatus::Open).values() {
            let Some(product) = self.product_manager.product(order.product_id()) else {
                continue;
            };
            if product.side_from_direction(source, destination) == Some(order.side()) {
                total += order.remaining();
            }
        }
        total
    }

    /// Currency edges with at least one open order.
    pub fn edges_with_open_orders(&self) -> BTreeSet<(Currency, Currency)> {
        let mut edges = BTreeSet::new();
        for order in self.orders(OrderStatus::Open).values() {
            let Some(product) = self.product_manager.product(order.product_id()) else {
                continue;
            };
            edges.insert((
                product.source(order.side()),
                product.destination(order.side()),
            ));
        }
        edges
    }

    /// Confirmed open orders older than `seconds_ago`.
    pub fn stale_open_order_ids(&self, seconds_ago: i64, now: DateTime<Utc>) -> Vec<String> {
        self.orders(OrderStatus::Open)
            .iter()
            .filter(|(_, order)| {
                order.is_confirmed() && order.created_seconds_ago(now) > seconds_ago
            })
            .map(|(order_id, _)| order_id.clone())
            .collect()
    }

    /// Open orders the exchange never acknowledged within `seconds_ago`.
    pub fn expired_unconfirmed_order_ids(&self, seconds_ago: i64, now: DateTime<Utc>) -> Vec<String> {
        self.orders(OrderStatus::Open)
            .iter()
            .filter(|(_, order)| {
                !order.is_confirmed() && order.created_seconds_ago(now) > seconds_ago
            })
            .map(|(order_id, _)| order_id.clone())
            .collect()
    }
}
