//! Pipeline orchestration: four workers over bounded queues, readiness
//! gating and global exit signalling.

pub mod bootstrap;
mod stages;

pub use stages::{book_stage, feed_router, network_stage, portfolio_stage};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::book::{BookError, OrderBookManager};
use crate::config;
use crate::exchange::{ApiError, ExchangeClient};
use crate::feed::FeedMessage;
use crate::network::NetworkManager;
use crate::portfolio::{PortfolioError, PortfolioGroup, Trader};
use crate::store::Store;

/// Errors that abort pipeline startup. Once the stages are running, errors
/// stay inside their stage and at worst flip the exit flag.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A bootstrap REST call failed; fatal at startup.
    #[error("bootstrap failed: {0}")]
    Api(#[from] ApiError),

    /// Bootstrap state did not apply cleanly.
    #[error(transparent)]
    Book(#[from] BookError),

    /// Own-order bootstrap failed.
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A gap or fatal stage error; the supervisor should rebootstrap.
    Restart,
    /// An orderly external shutdown.
    Shutdown,
}

/// Global exit flag, checked at every queue read.
#[derive(Debug, Default)]
pub struct ExitFlag {
    exit: AtomicBool,
    restart: AtomicBool,
}

impl ExitFlag {
    /// A fresh, unset flag.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Whether any exit was requested.
    pub fn is_set(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    /// Request an exit that should be followed by a rebootstrap.
    pub fn trigger_restart(&self) {
        self.restart.store(true, Ordering::Release);
        self.exit.store(true, Ordering::Release);
    }

    /// Request an orderly shutdown.
    pub fn trigger_shutdown(&self) {
        self.exit.store(true, Ordering::Release);
    }

    /// Whether the exit asked for a rebootstrap.
    pub fn wants_restart(&self) -> bool {
        self.restart.load(Ordering::Acquire)
    }
}

/// Per-stage readiness. Trading starts only once every flag is up.
#[derive(Debug, Default)]
pub struct ReadyFlags {
    feed: AtomicBool,
    book: AtomicBool,
    network: AtomicBool,
}

impl ReadyFlags {
    /// All flags down.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark the feed router live.
    pub fn set_feed(&self) {
        self.feed.store(true, Ordering::Release);
    }

    /// Mark the book stage live.
    pub fn set_book(&self) {
        self.book.store(true, Ordering::Release);
    }

    /// Mark the network stage live; set after its first complete pass.
    pub fn set_network(&self) {
        self.network.store(true, Ordering::Release);
    }

    /// Whether every stage has come up.
    pub fn all_ready(&self) -> bool {
        self.feed.load(Ordering::Acquire)
            && self.book.load(Ordering::Acquire)
            && self.network.load(Ordering::Acquire)
    }
}

/// The assembled trading pipeline.
///
/// `run` bootstraps from REST snapshots, spawns the four workers and waits
/// for the exit flag. In-memory state dies with the run; a supervisor that
/// receives [`Outcome::Restart`] simply builds a new pipeline.
pub struct Pipeline<C: ExchangeClient> {
    client: Arc<C>,
    feed_rx: mpsc::Receiver<FeedMessage>,
    trader: Trader,
    exit: Arc<ExitFlag>,
}

impl<C: ExchangeClient> Pipeline<C> {
    /// A pipeline fed by `feed_rx` and trading through `client`.
    pub fn new(client: Arc<C>, feed_rx: mpsc::Receiver<FeedMessage>) -> Self {
        Self {
            client,
            feed_rx,
            trader: Trader::default(),
            exit: ExitFlag::new(),
        }
    }

    /// Replace the default trader.
    pub fn with_trader(mut self, trader: Trader) -> Self {
        self.trader = trader;
        self
    }

    /// Handle for requesting an exit from outside the run.
    pub fn exit_flag(&self) -> Arc<ExitFlag> {
        Arc::clone(&self.exit)
    }

    /// Bootstrap, run until exit, report how the run ended.
    pub async fn run(self) -> Result<Outcome, EngineError> {
        let Self {
            client,
            feed_rx,
            trader,
            exit,
        } = self;

        let product_manager = Arc::new(bootstrap::product_manager(client.as_ref()).await?);
        let store = Arc::new(Store::new());
        let books = Arc::new(OrderBookManager::new(
            Arc::clone(&store),
            Arc::clone(&product_manager),
        ));
        bootstrap::books(client.as_ref(), &books).await?;
        let mut group = PortfolioGroup::new(Arc::clone(&store), Arc::clone(&product_manager));
        let registered = bootstrap::portfolio(client.as_ref(), &mut group).await?;

        let (book_tx, book_rx) = mpsc::channel(config::STAGE_QUEUE_CAPACITY);
        let (portfolio_tx, portfolio_rx) = mpsc::channel(config::STAGE_QUEUE_CAPACITY);
        let ready = ReadyFlags::new();
        let network = NetworkManager::new(Arc::clone(&store));

        info!("starting pipeline stages");
        let router = tokio::spawn(feed_router(
            feed_rx,
            book_tx,
            portfolio_tx,
            Arc::clone(&exit),
            Arc::clone(&ready),
        ));
        let book_worker = tokio::spawn(book_stage(
            book_rx,
            Arc::clone(&books),
            Arc::clone(&exit),
            Arc::clone(&ready),
        ));
        let network_worker = tokio::spawn(network_stage(
            Arc::clone(&books),
            network,
            Arc::clone(&exit),
            Arc::clone(&ready),
        ));
        let portfolio_worker = tokio::spawn(portfolio_stage(
            portfolio_rx,
            group,
            registered,
            trader,
            Arc::clone(&client),
            Arc::clone(&exit),
            Arc::clone(&ready),
        ));

        let _ = tokio::join!(router, book_worker, network_worker, portfolio_worker);
        let outcome = if exit.wants_restart() {
            Outcome::Restart
        } else {
            Outcome::Shutdown
        };
        info!(?outcome, "pipeline stopped");
        Ok(outcome)
    }
}

/// Cancel every resting order across all products. Operator tooling for a
/// hard stop.
pub async fn cancel_all_orders<C: ExchangeClient>(
    client: &C,
    product_ids: impl IntoIterator<Item = &str>,
) -> Result<(), ApiError> {
    for product_id in product_ids {
        client.cancel_all(product_id).await?;
        info!(product_id, "all orders canceled");
    }
    Ok(())
}
