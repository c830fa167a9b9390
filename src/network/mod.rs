//! Currency-conversion network derived from the order books.
//!
//! For every edge flavor the network keeps two weighted digraph views: the
//! product view quotes edges in the product's native quote currency, the
//! currency view normalizes weights so traversing an edge multiplies a held
//! quantity of the source currency into the destination. A parallel quantity
//! net records available depth per edge. Simple cycles of the currency view
//! whose product of weights exceeds one are round-trip gains.

mod cycles;
mod manager;

pub use cycles::{canonical_rotation, canonicalize, simple_cycles};
pub use manager::NetworkManager;

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

use crate::product::Currency;

/// How a graph-edge weight is derived from a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Best resting price
    Best,
    /// Median of recent match sizes
    Median,
    /// Mean of recent match sizes
    Mean,
    /// Mean scaled down by ten, never stepping past best
    Custom,
}

impl EdgeKind {
    /// All edge flavors.
    pub const ALL: [EdgeKind; 4] =
        [EdgeKind::Best, EdgeKind::Median, EdgeKind::Mean, EdgeKind::Custom];
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Best => write!(f, "best"),
            EdgeKind::Median => write!(f, "median"),
            EdgeKind::Mean => write!(f, "mean"),
            EdgeKind::Custom => write!(f, "custom"),
        }
    }
}

/// Which denomination an edge weight is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteView {
    /// Product-native quote price
    Product,
    /// Currency-normalized conversion rate
    Currency,
}

impl fmt::Display for QuoteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteView::Product => write!(f, "product"),
            QuoteView::Currency => write!(f, "currency"),
        }
    }
}

/// Whether a net carries prices or available quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetKind {
    /// Edge prices
    Price,
    /// Available depth
    Quantity,
}

impl fmt::Display for NetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetKind::Price => write!(f, "price"),
            NetKind::Quantity => write!(f, "quantity"),
        }
    }
}

/// Product of weights along a canonical cycle. Ranking only; prices and
/// sizes stay decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleValue(pub f64);

impl Eq for CycleValue {}

impl PartialOrd for CycleValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CycleValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The move a cycle prescribes from a given currency: the next currency and
/// the product-view price and available depth of the connecting edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NextHop {
    /// Currency the edge converts into
    pub next: Currency,
    /// Product-view edge price
    pub price: Decimal,
    /// Product-view available quantity
    pub available: Decimal,
}
