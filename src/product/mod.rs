//! Product model: currencies, sides, trading pairs and exact rounding.

mod currency;
mod manager;
mod product;

pub use currency::{Currency, Side};
pub use manager::ProductManager;
pub use product::Product;

use rust_decimal::Decimal;
use thiserror::Error;

/// Product-model validation errors.
#[derive(Debug, Error)]
pub enum ProductError {
    /// Quote and base currency must differ.
    #[error("quote and base currency are both {0}")]
    IdenticalCurrencies(Currency),

    /// Quote increment must be positive.
    #[error("quote increment must be positive, got {0}")]
    NonPositiveIncrement(Decimal),

    /// Base min size must be positive.
    #[error("base min size must be positive, got {0}")]
    NonPositiveMinSize(Decimal),

    /// Currency name not in the closed enumeration.
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
}
