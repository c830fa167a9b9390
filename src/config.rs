//! Tunable constants for the trading pipeline.
//!
//! Values here are process-wide defaults. Portfolio target fractions can be
//! overridden at runtime through the aggregate store; everything else requires
//! a restart to change.

use rust_decimal::Decimal;

use crate::network::EdgeKind;

/// How far back (seconds) the network refresh looks when sizing edges from
/// recent trade history.
pub const NETWORK_LOOKBACK_SECS: i64 = 30 * 24 * 60;

/// Open orders older than this (seconds) are considered stale.
pub const STALE_OPEN_ORDERS_SECS: i64 = 5 * 60;

/// Orders that have not been confirmed by the feed within this window
/// (seconds) are considered lost.
pub const ORDER_CONFIRMATION_SECS: i64 = 600;

/// Trades within the same aggregation period (seconds) are treated as one.
pub const ORDER_AGGREGATION_SECS: i64 = 1;

/// Edge flavor the trading loop ranks cycles with.
pub const EDGE_KIND: EdgeKind = EdgeKind::Mean;

/// Minimum round-trip multiple a cycle must exceed before an order is placed.
pub const MIN_CYCLE_RETURN: f64 = 1.005;

/// Fraction of the observed trade size we try to capture. Placing for half
/// the aggregate size lets the order fill at the better part of the ladder
/// while still rounding up the fillable quantity where possible.
pub fn qty_multiplier() -> Decimal {
    Decimal::new(5, 1)
}

/// Edge quantity recorded for best-price edges, effectively unbounded.
pub fn default_edge_qty() -> Decimal {
    Decimal::from(1_000_000_000u64)
}

/// Dirty products consumed per network refresh pass, per side.
pub const NETWORK_BATCH_SIZE: usize = 10;

/// Own-order feed events drained per portfolio pass.
pub const PORTFOLIO_BATCH_SIZE: usize = 100;

/// Capacity of the bounded queues between the feed router and the stages.
pub const STAGE_QUEUE_CAPACITY: usize = 1024;

/// TTL (milliseconds) of the read-through cache in front of operator-tunable
/// portfolio target fractions.
pub const TARGET_FRACTION_TTL_MS: u64 = 1000;
