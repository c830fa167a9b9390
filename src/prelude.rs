//! Prelude re-exporting the types most integrations need.
//!
//! ```rust
//! use cyclebook_rs::prelude::*;
//! ```

pub use crate::book::{
    BookError, MakerPlacement, Order, OrderBook, OrderBookManager, OrderKind, OrderStatus,
    PriceDepth,
};
pub use crate::engine::{EngineError, ExitFlag, Outcome, Pipeline, ReadyFlags};
pub use crate::exchange::{
    AccountBalance, ApiError, BookSnapshot, CurrencyInfo, ExchangeClient, HistoricalTrade,
    PlaceOrderParams, PlacedOrder, ProductInfo, SnapshotOrder,
};
pub use crate::feed::{DoneReason, FeedError, FeedMessage, FeedSide};
pub use crate::network::{
    CycleValue, EdgeKind, NetKind, NetworkManager, NextHop, QuoteView,
};
pub use crate::portfolio::{
    MaxDeltas, PortfolioError, PortfolioGroup, PortfolioOrderBook, TargetFractions, Trader,
};
pub use crate::product::{Currency, Product, ProductError, ProductManager, Side};
pub use crate::store::Store;
