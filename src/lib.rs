//! # Currency-Cycle Arbitrage Engine
//!
//! A real-time arbitrage trader for spot currency markets. The engine
//! ingests a sequenced exchange feed, maintains a limit order book per
//! product, derives a weighted currency-conversion network from those books,
//! and sizes post-only maker orders along profitable conversion cycles while
//! respecting portfolio-composition constraints.
//!
//! ## Pipeline
//!
//! Four workers run in parallel, wired by bounded queues and a shared
//! aggregate store:
//!
//! 1. **Feed router** — validates per-product sequence contiguity and fans
//!    each event out to the book and portfolio stages. A sequence gap is not
//!    recoverable in-flight and forces a rebootstrap.
//! 2. **Book stage** — applies `open`/`match`/`change`/`done` events to the
//!    store-backed price ladders and appends every event to the per-second
//!    trade-history window, marking touched products dirty.
//! 3. **Network stage** — pops dirty products and refreshes their conversion
//!    edges across four flavors (best price, mean/median of recent match
//!    sizes, and a conservative custom variant), in both product-quote and
//!    currency-normalized views with parallel depth quantities.
//! 4. **Portfolio stage** — tracks balances and holds from our own orders,
//!    and once all stages are ready walks the highest-valued simple cycles,
//!    emitting at most one rounded maker order per source currency per pass.
//!
//! ## Data discipline
//!
//! Everything that feeds back into order sizing or accounting is carried as
//! an exact decimal. Floating point appears in exactly one place: the
//! product-of-weights score used to rank cycles, where accuracy loss is
//! benign.
//!
//! The websocket and REST clients live outside this crate. The feed arrives
//! as [`feed::FeedMessage`] values on a channel and the REST surface is the
//! [`exchange::ExchangeClient`] trait, so the whole pipeline runs against
//! in-memory doubles in tests.

pub mod book;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod feed;
pub mod network;
pub mod portfolio;
pub mod prelude;
pub mod product;
pub mod store;

pub use book::{
    BookError, MakerPlacement, Order, OrderBook, OrderBookManager, OrderKind, OrderStatus,
    PriceDepth,
};
pub use engine::{EngineError, ExitFlag, Outcome, Pipeline, ReadyFlags};
pub use exchange::{ApiError, ExchangeClient};
pub use feed::{FeedError, FeedMessage};
pub use network::{CycleValue, EdgeKind, NetKind, NetworkManager, NextHop, QuoteView};
pub use portfolio::{PortfolioError, PortfolioGroup, PortfolioOrderBook, Trader};
pub use product::{Currency, Product, ProductError, ProductManager, Side};
pub use store::Store;
