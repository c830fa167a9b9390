//! Inbound market-data feed model.
//!
//! One message per feed line, externally tagged on `type`. The exchange
//! speaks `buy`/`sell`; the book speaks `bid`/`ask`. Decimal fields arrive
//! as strings and stay exact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::book::{BookError, Order, OrderKind, OrderStatus};
use crate::product::Side;

/// Feed-side order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSide {
    /// Maps to the bid side
    Buy,
    /// Maps to the ask side
    Sell,
}

impl From<FeedSide> for Side {
    fn from(side: FeedSide) -> Side {
        match side {
            FeedSide::Buy => Side::Bid,
            FeedSide::Sell => Side::Ask,
        }
    }
}

impl From<Side> for FeedSide {
    fn from(side: Side) -> FeedSide {
        match side {
            Side::Bid => FeedSide::Buy,
            Side::Ask => FeedSide::Sell,
        }
    }
}

/// Why a `done` message closed an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoneReason {
    /// Fully executed
    Filled,
    /// Pulled from the book
    Canceled,
}

/// One feed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    /// Acknowledgement; flips own orders to confirmed, never touches books.
    Received {
        /// Product the order belongs to
        product_id: String,
        /// Per-product sequence number
        sequence: u64,
        /// Exchange order id
        order_id: String,
        /// Requested size, when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Decimal>,
        /// Requested price, when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<Decimal>,
        /// Order direction
        side: FeedSide,
        /// Exchange timestamp
        time: DateTime<Utc>,
    },
    /// A new resting order.
    Open {
        /// Product the order belongs to
        product_id: String,
        /// Per-product sequence number
        sequence: u64,
        /// Exchange order id
        order_id: String,
        /// Resting price
        price: Decimal,
        /// Size left after any immediate execution
        remaining_size: Decimal,
        /// Order direction
        side: FeedSide,
        /// Exchange timestamp
        time: DateTime<Utc>,
    },
    /// An order left the book.
    Done {
        /// Product the order belongs to
        product_id: String,
        /// Per-product sequence number
        sequence: u64,
        /// Exchange order id
        order_id: String,
        /// Resting price; absent for orders that never rested
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<Decimal>,
        /// Unfilled size; absent for orders that never rested
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remaining_size: Option<Decimal>,
        /// Filled or canceled
        reason: DoneReason,
        /// Order direction
        side: FeedSide,
        /// Exchange timestamp
        time: DateTime<Utc>,
    },
    /// A trade against a resting maker order.
    Match {
        /// Product the trade belongs to
        product_id: String,
        /// Per-product sequence number
        sequence: u64,
        /// Resting order that was hit
        maker_order_id: String,
        /// Aggressing order
        #[serde(default, skip_serializing_if = "Option::is_none")]
        taker_order_id: Option<String>,
        /// Traded size
        size: Decimal,
        /// Trade price
        price: Decimal,
        /// Maker order direction
        side: FeedSide,
        /// Exchange timestamp
        time: DateTime<Utc>,
    },
    /// A resting order was resized.
    Change {
        /// Product the order belongs to
        product_id: String,
        /// Per-product sequence number
        sequence: u64,
        /// Exchange order id
        order_id: String,
        /// Resting price; absent for funds-denominated changes
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<Decimal>,
        /// Size before the change
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_size: Option<Decimal>,
        /// Size after the change
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_size: Option<Decimal>,
        /// Present when the change is funds-denominated; such changes are
        /// skipped
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_funds: Option<Decimal>,
        /// Order direction
        side: FeedSide,
        /// Exchange timestamp
        time: DateTime<Utc>,
    },
    /// Keep-alive; ignored.
    Heartbeat {
        /// Product the heartbeat covers, when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_id: Option<String>,
        /// Last sequence observed by the exchange
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sequence: Option<u64>,
        /// Exchange timestamp
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<DateTime<Utc>>,
    },
}

impl FeedMessage {
    /// Whether this is a keep-alive.
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, FeedMessage::Heartbeat { .. })
    }

    /// The product the message concerns, when any.
    pub fn product_id(&self) -> Option<&str> {
        match self {
            FeedMessage::Received { product_id, .. }
            | FeedMessage::Open { product_id, .. }
            | FeedMessage::Done { product_id, .. }
            | FeedMessage::Match { product_id, .. }
            | FeedMessage::Change { product_id, .. } => Some(product_id),
            FeedMessage::Heartbeat { product_id, .. } => product_id.as_deref(),
        }
    }

    /// The per-product sequence number, when any.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            FeedMessage::Received { sequence, .. }
            | FeedMessage::Open { sequence, .. }
            | FeedMessage::Done { sequence, .. }
            | FeedMessage::Match { sequence, .. }
            | FeedMessage::Change { sequence, .. } => Some(*sequence),
            FeedMessage::Heartbeat { sequence, .. } => *sequence,
        }
    }

    /// The order id an own-order tracker should key on: the order itself,
    /// or the maker side of a match.
    pub fn own_order_id(&self) -> Option<&str> {
        match self {
            FeedMessage::Received { order_id, .. }
            | FeedMessage::Open { order_id, .. }
            | FeedMessage::Done { order_id, .. }
            | FeedMessage::Change { order_id, .. } => Some(order_id),
            FeedMessage::Match { maker_order_id, .. } => Some(maker_order_id),
            FeedMessage::Heartbeat { .. } => None,
        }
    }

    /// Translate into a book mutation. `None` for messages that do not
    /// mutate the book: acknowledgements, heartbeats, done/change messages
    /// missing their price or size fields, and funds-denominated changes.
    pub fn to_book_order(&self) -> Result<Option<Order>, BookError> {
        match self {
            FeedMessage::Received { .. } | FeedMessage::Heartbeat { .. } => Ok(None),
            FeedMessage::Open {
                product_id,
                sequence,
                order_id,
                price,
                remaining_size,
                side,
                time,
            } => {
                let order = Order::new(product_id, *sequence, (*side).into(), *remaining_size, *price)?
                    .with_order_id(order_id)
                    .with_created_at(*time);
                Ok(Some(order))
            }
            FeedMessage::Done {
                product_id,
                sequence,
                order_id,
                price,
                remaining_size,
                reason,
                side,
                time,
            } => {
                let (Some(price), Some(remaining_size)) = (price, remaining_size) else {
                    return Ok(None);
                };
                let (kind, status) = match reason {
                    DoneReason::Filled => (OrderKind::Match, OrderStatus::Filled),
                    DoneReason::Canceled => (OrderKind::Cancel, OrderStatus::Canceled),
                };
                let order = Order::new(product_id, *sequence, (*side).into(), *remaining_size, *price)?
                    .with_kind(kind)
                    .with_status(status)
                    .with_order_id(order_id)
                    .with_created_at(*time);
                Ok(Some(order))
            }
            FeedMessage::Match {
                product_id,
                sequence,
                maker_order_id,
                size,
                price,
                side,
                time,
                ..
            } => {
                let order = Order::new(product_id, *sequence, (*side).into(), *size, *price)?
                    .with_kind(OrderKind::Match)
                    .with_order_id(maker_order_id)
                    .with_created_at(*time);
                Ok(Some(order))
            }
            FeedMessage::Change {
                product_id,
                sequence,
                order_id,
                price,
                old_size,
                new_size,
                new_funds,
                side,
                time,
            } => {
                if new_funds.is_some() {
                    return Ok(None);
                }
                let (Some(price), Some(old_size), Some(new_size)) = (price, old_size, new_size)
                else {
                    return Ok(None);
                };
                let mut order = Order::new(product_id, *sequence, (*side).into(), *old_size, *price)?
                    .with_kind(OrderKind::Change)
                    .with_order_id(order_id)
                    .with_created_at(*time);
                order.add_filled(*new_size);
                Ok(Some(order))
            }
        }
    }
}

/// Feed-level failures.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Per-product sequence numbers must be contiguous; a gap means missed
    /// events and forces a rebootstrap.
    #[error("feed gap on {product_id}: expected {expected}, received {received}")]
    Gap {
        /// Product whose stream gapped
        product_id: String,
        /// Sequence the router expected next
        expected: u64,
        /// Sequence that actually arrived
        received: u64,
    },
}
