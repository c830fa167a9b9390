//! The feed order model shared by the book and portfolio stages.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::BookError;
use crate::product::Side;

/// What kind of book mutation an order event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// A fill against a resting order
    Match,
    /// A new resting limit order
    Limit,
    /// A resize of a resting order
    Change,
    /// A cancellation
    Cancel,
}

impl OrderKind {
    /// All kinds, in trade-history stream order.
    pub const ALL: [OrderKind; 4] =
        [OrderKind::Match, OrderKind::Limit, OrderKind::Change, OrderKind::Cancel];
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Match => write!(f, "match"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Change => write!(f, "change"),
            OrderKind::Cancel => write!(f, "cancel"),
        }
    }
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Resting on the book
    Open,
    /// Fully filled
    Filled,
    /// Cancelled before filling
    Canceled,
    /// Never acknowledged by the exchange
    Unconfirmed,
}

impl OrderStatus {
    /// All statuses, open first.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Open,
        OrderStatus::Filled,
        OrderStatus::Canceled,
        OrderStatus::Unconfirmed,
    ];
}

/// A single order event, either from the live feed, from a bootstrap
/// snapshot, or one of our own.
///
/// `historical` orders bypass ladder mutation but still land in trade
/// history; that is how bootstrap replays recent trades without touching the
/// live book.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    product_id: String,
    sequence_id: u64,
    side: Side,
    size: Decimal,
    filled_size: Decimal,
    price: Decimal,
    status: OrderStatus,
    kind: OrderKind,
    order_id: Option<String>,
    created_at: DateTime<Utc>,
    historical: bool,
    confirmed: bool,
}

impl Order {
    /// A new open limit order event. Further fields are set with the `with_*`
    /// builders.
    pub fn new(
        product_id: impl Into<String>,
        sequence_id: u64,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Result<Self, BookError> {
        if size < Decimal::ZERO {
            return Err(BookError::NegativeSize(size));
        }
        Ok(Self {
            product_id: product_id.into(),
            sequence_id,
            side,
            size,
            filled_size: Decimal::ZERO,
            price,
            status: OrderStatus::Open,
            kind: OrderKind::Limit,
            order_id: None,
            created_at: Utc::now(),
            historical: false,
            confirmed: false,
        })
    }

    /// Set the order kind.
    pub fn with_kind(mut self, kind: OrderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the order status.
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the exchange order id.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// Set the creation time. Orders cannot be created in the future; later
    /// timestamps are clamped to now.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at.min(Utc::now());
        self
    }

    /// Mark the order as a historical replay (no ladder mutation).
    pub fn historical(mut self) -> Self {
        self.historical = true;
        self
    }

    /// Set whether the exchange has acknowledged the order.
    pub fn with_confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    /// Product this order belongs to.
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Feed sequence number.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    /// Book side.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Original size.
    pub fn size(&self) -> Decimal {
        self.size
    }

    /// Quantity filled so far.
    pub fn filled_size(&self) -> Decimal {
        self.filled_size
    }

    /// Record an additional fill.
    pub fn add_filled(&mut self, quantity: Decimal) -> Decimal {
        self.filled_size += quantity;
        self.filled_size
    }

    /// Unfilled quantity.
    pub fn remaining(&self) -> Decimal {
        self.size - self.filled_size
    }

    /// Limit price.
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Lifecycle state.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Replace the lifecycle state.
    pub fn update_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    /// Mutation kind.
    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    /// Exchange order id, when known.
    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Creation time as a unix second, the trade-history score.
    pub fn unix_timestamp(&self) -> i64 {
        self.created_at.timestamp()
    }

    /// Whole seconds elapsed between creation and `now`.
    pub fn created_seconds_ago(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds()
    }

    /// Whether this is a bootstrap replay.
    pub fn is_historical(&self) -> bool {
        self.historical
    }

    /// Whether the exchange has acknowledged the order.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Flip the confirmation flag.
    pub fn set_confirmed(&mut self, confirmed: bool) {
        self.confirmed = confirmed;
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}-{:?}",
            self.product_id, self.size, self.side, self.price, self.kind, self.status
        )
    }
}
