//! Portfolio tracking and the maker trading loop.

mod group;
mod own_orders;
mod targets;
mod trader;

pub use group::{MaxDeltas, PortfolioGroup};
pub use own_orders::PortfolioOrderBook;
pub use targets::TargetFractions;
pub use trader::Trader;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::book::{BookError, OrderStatus};
use crate::product::Currency;

/// Portfolio-side errors.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Event referenced an order we are not tracking.
    #[error("unknown own order {0}")]
    UnknownOrder(String),

    /// Own orders must carry an exchange id before tracking.
    #[error("own order has no order id")]
    MissingOrderId,

    /// A debit would take a balance negative.
    #[error("insufficient {currency} balance: have {available}, debit {debit}")]
    InsufficientBalance {
        /// Currency being debited
        currency: Currency,
        /// Tracked balance before the debit
        available: Decimal,
        /// Requested debit
        debit: Decimal,
    },

    /// `done` events only finish orders as filled or canceled.
    #[error("done event carried status {0:?}")]
    InvalidDoneStatus(OrderStatus),

    /// An order referenced a product missing from the registry.
    #[error("unknown product {0}")]
    UnknownProduct(String),

    /// Order construction failed.
    #[error(transparent)]
    Order(#[from] BookError),
}
