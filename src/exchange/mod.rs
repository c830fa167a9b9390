//! The REST collaborator interface the core expects.
//!
//! The actual HTTP client lives outside this crate; the engine is generic
//! over [`ExchangeClient`] so tests drive it with an in-memory double.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::book::{BookError, Order};
use crate::feed::FeedSide;
use crate::product::Side;

/// Exchange REST failures. The portfolio stage treats any of these during a
/// placement pass as a signal to cancel the pass's earlier orders.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The exchange rejected the order outright.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The exchange answered with an error message.
    #[error("exchange error: {0}")]
    Message(String),

    /// The request never completed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Parameters of a maker limit order placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderParams {
    /// Limit price
    pub price: Decimal,
    /// Order size in base units
    pub size: Decimal,
    /// Product to trade
    pub product_id: String,
    /// Always good-till-canceled
    pub time_in_force: String,
    /// Always post-only; the engine never takes
    pub post_only: bool,
}

impl PlaceOrderParams {
    /// Maker parameters for one of the trader's orders.
    pub fn maker(order: &Order) -> Self {
        Self {
            price: order.price(),
            size: order.size(),
            product_id: order.product_id().to_string(),
            time_in_force: "GTC".to_string(),
            post_only: true,
        }
    }
}

/// An order as the exchange reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacedOrder {
    /// Exchange-assigned order id
    pub id: String,
    /// Product the order trades
    pub product_id: String,
    /// Direction in feed terms
    pub side: FeedSide,
    /// Limit price
    pub price: Decimal,
    /// Requested size
    pub size: Decimal,
    /// Size already executed
    #[serde(default)]
    pub filled_size: Decimal,
    /// Exchange creation time
    pub created_at: DateTime<Utc>,
}

impl PlacedOrder {
    /// Convert into the engine's own-order representation. Confirmation is
    /// the feed's job, so the result starts unconfirmed.
    pub fn into_order(self) -> Result<Order, BookError> {
        let mut order = Order::new(self.product_id, 0, self.side.into(), self.size, self.price)?
            .with_order_id(self.id)
            .with_created_at(self.created_at);
        order.add_filled(self.filled_size);
        Ok(order)
    }
}

/// One resting order of a level-3 book snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotOrder {
    /// Resting price
    pub price: Decimal,
    /// Resting size
    pub size: Decimal,
    /// Exchange order id
    pub order_id: String,
}

/// A level-3 book snapshot at a known sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct BookSnapshot {
    /// Sequence the snapshot was taken at
    pub sequence: u64,
    /// Resting buy orders
    pub bids: Vec<SnapshotOrder>,
    /// Resting sell orders
    pub asks: Vec<SnapshotOrder>,
}

/// A recent trade used to seed the trade-history window.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalTrade {
    /// Trade time
    pub time: DateTime<Utc>,
    /// Trade price
    pub price: Decimal,
    /// Trade size
    pub size: Decimal,
    /// Maker direction in feed terms
    pub side: FeedSide,
}

/// An account balance line.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalance {
    /// Currency code as the exchange spells it
    pub currency: String,
    /// Total balance
    pub balance: Decimal,
}

/// Product listing line.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    /// Product id
    pub id: String,
    /// Quote currency code
    pub quote_currency: String,
    /// Base currency code
    pub base_currency: String,
    /// Smallest price step
    pub quote_increment: Decimal,
    /// Smallest tradable size
    pub base_min_size: Decimal,
}

/// Currency listing line.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyInfo {
    /// Currency code
    pub id: String,
    /// Smallest tradable quantity
    pub min_size: Decimal,
}

/// The exchange REST surface the engine depends on.
pub trait ExchangeClient: Send + Sync + 'static {
    /// List tradable products.
    fn products(&self) -> impl Future<Output = Result<Vec<ProductInfo>, ApiError>> + Send;

    /// List currencies with their minimum sizes.
    fn currencies(&self) -> impl Future<Output = Result<Vec<CurrencyInfo>, ApiError>> + Send;

    /// Level-3 order book snapshot for a product.
    fn book_snapshot(
        &self,
        product_id: &str,
    ) -> impl Future<Output = Result<BookSnapshot, ApiError>> + Send;

    /// Recent trades for a product, newest first.
    fn recent_trades(
        &self,
        product_id: &str,
    ) -> impl Future<Output = Result<Vec<HistoricalTrade>, ApiError>> + Send;

    /// Account balances.
    fn accounts(&self) -> impl Future<Output = Result<Vec<AccountBalance>, ApiError>> + Send;

    /// Our orders currently resting on the exchange.
    fn open_orders(&self) -> impl Future<Output = Result<Vec<PlacedOrder>, ApiError>> + Send;

    /// Place a maker limit order; returns the exchange's view of it.
    fn place_order(
        &self,
        side: Side,
        params: &PlaceOrderParams,
    ) -> impl Future<Output = Result<PlacedOrder, ApiError>> + Send;

    /// Cancel a single order.
    fn cancel_order(&self, order_id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Cancel every order on a product.
    fn cancel_all(&self, product_id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}
