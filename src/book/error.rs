//! Order book error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::product::Side;

/// Errors that can occur while applying events to or querying a book.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookError {
    /// Event routed to a book for a different product. Structural; fatal to
    /// the call.
    #[error("product mismatch: book {book}, order {order}")]
    ProductMismatch {
        /// Product id of the receiving book
        book: String,
        /// Product id carried by the order
        order: String,
    },

    /// Event sequence is behind the book. Late events are expected; callers
    /// drop these silently.
    #[error("sequence behind: book at {current}, order at {incoming}")]
    SequenceBehind {
        /// Highest sequence the book has applied
        current: u64,
        /// Sequence carried by the order
        incoming: u64,
    },

    /// Orders cannot carry a negative size.
    #[error("order size must be non-negative, got {0}")]
    NegativeSize(Decimal),

    /// A derived edge trade size came out negative, which indicates a
    /// bookkeeping bug upstream. Fatal.
    #[error("negative edge trade size {size} on {side}")]
    NegativeEdgeSize {
        /// Side the size was derived for
        side: Side,
        /// The offending size
        size: Decimal,
    },

    /// Best bid exceeds best ask outside a transient locked-spread
    /// observation.
    #[error("crossed book: best bid {bid} > best ask {ask}")]
    Crossed {
        /// Best bid price
        bid: Decimal,
        /// Best ask price
        ask: Decimal,
    },

    /// Event names a product with no registered book.
    #[error("no book for product {0}")]
    UnknownProduct(String),
}
