//! The four long-running pipeline workers.
//!
//! Each worker is internally single-threaded and only suspends at queue
//! reads, store round trips and exchange calls. The global exit flag is
//! checked at every queue interaction; a fatal condition in one stage flips
//! it and the others drain out on their own.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::{ExitFlag, ReadyFlags};
use crate::book::{BookError, Order, OrderBookManager, OrderStatus};
use crate::config;
use crate::exchange::{ExchangeClient, PlaceOrderParams};
use crate::feed::{DoneReason, FeedError, FeedMessage};
use crate::network::NetworkManager;
use crate::portfolio::{PortfolioGroup, Trader};
use crate::product::Side;

/// How long queue reads wait before re-checking the exit flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Idle pause when a drain pass finds nothing to do.
const IDLE_PAUSE: Duration = Duration::from_millis(5);

/// Consume the feed, enforce per-product sequence contiguity, and fan every
/// event out to the book and portfolio queues.
pub async fn feed_router(
    mut feed_rx: mpsc::Receiver<FeedMessage>,
    book_tx: mpsc::Sender<FeedMessage>,
    portfolio_tx: mpsc::Sender<FeedMessage>,
    exit: Arc<ExitFlag>,
    ready: Arc<ReadyFlags>,
) {
    info!("feed router started");
    ready.set_feed();
    let mut last_sequence: HashMap<String, u64> = HashMap::new();
    while !exit.is_set() {
        let message = match timeout(POLL_INTERVAL, feed_rx.recv()).await {
            Err(_) => continue,
            Ok(None) => {
                warn!("feed channel closed");
                exit.trigger_restart();
                break;
            }
            Ok(Some(message)) => message,
        };
        if message.is_heartbeat() {
            continue;
        }
        let (product_id, sequence) = match (message.product_id(), message.sequence()) {
            (Some(product_id), Some(sequence)) => (product_id.to_string(), sequence),
            _ => continue,
        };
        if let Some(last) = last_sequence.get(&product_id)
            && sequence != last + 1
        {
            let gap = FeedError::Gap {
                product_id,
                expected: last + 1,
                received: sequence,
            };
            error!(error = %gap, "feed gap, forcing rebootstrap");
            exit.trigger_restart();
            break;
        }
        last_sequence.insert(product_id, sequence);
        if book_tx.send(message.clone()).await.is_err()
            || portfolio_tx.send(message).await.is_err()
        {
            warn!("stage queue closed");
            exit.trigger_restart();
            break;
        }
    }
    info!("feed router stopped");
}

/// Drain the book queue and apply events to the per-product books.
pub async fn book_stage(
    mut book_rx: mpsc::Receiver<FeedMessage>,
    books: Arc<OrderBookManager>,
    exit: Arc<ExitFlag>,
    ready: Arc<ReadyFlags>,
) {
    info!("book stage started");
    ready.set_book();
    while !exit.is_set() {
        match book_rx.try_recv() {
            Ok(message) => {
                let order = match message.to_book_order() {
                    Ok(Some(order)) => order,
                    Ok(None) => continue,
                    Err(error) => {
                        error!(%error, "feed message did not translate");
                        continue;
                    }
                };
                apply_book_order(&books, &order);
            }
            Err(TryRecvError::Empty) => sleep(IDLE_PAUSE).await,
            Err(TryRecvError::Disconnected) => {
                exit.trigger_restart();
                break;
            }
        }
    }
    info!("book stage stopped");
}

fn apply_book_order(books: &OrderBookManager, order: &Order) {
    // live events at or behind the book's sequence are replays; only the
    // bootstrap snapshot, which bypasses this stage, applies several orders
    // at one sequence
    if let Some(current) = books.sequence_id(order.product_id())
        && order.sequence_id() <= current
    {
        return;
    }
    match books.apply(order) {
        Ok(()) => {}
        Err(BookError::SequenceBehind { .. }) => {}
        Err(error) => error!(%error, product_id = order.product_id(), "book apply failed"),
    }
}

/// Consume dirty products and refresh their network edges.
pub async fn network_stage(
    books: Arc<OrderBookManager>,
    network: NetworkManager,
    exit: Arc<ExitFlag>,
    ready: Arc<ReadyFlags>,
) {
    info!("network stage started");
    while !exit.is_set() {
        let mut refreshed = 0usize;
        for side in Side::BOTH {
            for product_id in books.pop_dirty(side, config::NETWORK_BATCH_SIZE) {
                let Some(book) = books.book(&product_id) else {
                    continue;
                };
                match network.update_from_book(book, side) {
                    Ok(()) => refreshed += 1,
                    Err(error @ BookError::NegativeEdgeSize { .. }) => {
                        error!(%error, %product_id, "bookkeeping corrupted, forcing restart");
                        exit.trigger_restart();
                        return;
                    }
                    Err(error) => {
                        error!(%error, %product_id, %side, "edge refresh failed");
                    }
                }
            }
        }
        ready.set_network();
        if refreshed == 0 {
            sleep(IDLE_PAUSE).await;
        } else {
            debug!(refreshed, "network refresh pass");
        }
    }
    info!("network stage stopped");
}

/// Track own-order events and, once every stage is ready, run decision
/// passes and place the resulting maker orders.
pub async fn portfolio_stage<C: ExchangeClient>(
    mut portfolio_rx: mpsc::Receiver<FeedMessage>,
    mut group: PortfolioGroup,
    mut registered: HashSet<String>,
    trader: Trader,
    client: Arc<C>,
    exit: Arc<ExitFlag>,
    ready: Arc<ReadyFlags>,
) {
    info!("portfolio stage started");
    'run: while !exit.is_set() {
        let mut handled = 0usize;
        while handled < config::PORTFOLIO_BATCH_SIZE {
            match portfolio_rx.try_recv() {
                Ok(message) => {
                    let Some(order_id) = message.own_order_id() else {
                        continue;
                    };
                    if !registered.contains(order_id) {
                        continue;
                    }
                    handled += 1;
                    if let Err(error) = process_own_message(&mut group, &mut registered, &message) {
                        error!(%error, "own-order event failed");
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    exit.trigger_restart();
                    break 'run;
                }
            }
        }

        observe_order_ages(&group);

        if ready.all_ready() {
            match trader.next_orders(&group) {
                Ok(orders) if !orders.is_empty() => {
                    place_orders(&mut group, &mut registered, client.as_ref(), orders).await;
                }
                Ok(_) => {}
                Err(error) => error!(%error, "decision pass failed"),
            }
        }
        sleep(IDLE_PAUSE).await;
    }
    info!("portfolio stage stopped");
}

fn process_own_message(
    group: &mut PortfolioGroup,
    registered: &mut HashSet<String>,
    message: &FeedMessage,
) -> Result<(), crate::portfolio::PortfolioError> {
    match message {
        FeedMessage::Done {
            order_id, reason, ..
        } => {
            info!(%order_id, ?reason, "own order done");
            let status = match reason {
                DoneReason::Filled => OrderStatus::Filled,
                DoneReason::Canceled => OrderStatus::Canceled,
            };
            group.handle_done(order_id, status)?;
            registered.remove(order_id);
        }
        FeedMessage::Match {
            maker_order_id,
            size,
            ..
        } => {
            info!(order_id = %maker_order_id, %size, "own order matched");
            group.handle_match(maker_order_id, *size)?;
        }
        FeedMessage::Received { order_id, .. } | FeedMessage::Open { order_id, .. } => {
            group.own_orders_mut().confirm_order(order_id)?;
        }
        FeedMessage::Change { order_id, .. } => {
            error!(%order_id, "own order changed unexpectedly");
        }
        FeedMessage::Heartbeat { .. } => {}
    }
    Ok(())
}

/// Stale and lost orders are observed and logged only; the cancellation
/// policy is still pending.
fn observe_order_ages(group: &PortfolioGroup) {
    let now = Utc::now();
    let stale = group
        .own_orders()
        .stale_open_order_ids(config::STALE_OPEN_ORDERS_SECS, now);
    if !stale.is_empty() {
        info!(?stale, "stale open orders observed");
    }
    let unconfirmed = group
        .own_orders()
        .expired_unconfirmed_order_ids(config::ORDER_CONFIRMATION_SECS, now);
    if !unconfirmed.is_empty() {
        error!(?unconfirmed, "orders never confirmed by the feed");
    }
}

/// Submit a pass's orders. The first exchange error cancels everything the
/// pass already placed and abandons the rest.
async fn place_orders<C: ExchangeClient>(
    group: &mut PortfolioGroup,
    registered: &mut HashSet<String>,
    client: &C,
    orders: Vec<Order>,
) {
    let mut created: Vec<String> = Vec::new();
    for order in orders {
        let params = PlaceOrderParams::maker(&order);
        info!(product_id = %params.product_id, side = %order.side(), price = %params.price, size = %params.size, "placing maker order");
        match client.place_order(order.side(), &params).await {
            Ok(placed) => {
                let order_id = placed.id.clone();
                match placed.into_order() {
                    Ok(own) => {
                        if let Err(error) = group.own_orders_mut().insert(own) {
                            error!(%error, %order_id, "placed order could not be tracked");
                            continue;
                        }
                        registered.insert(order_id.clone());
                        created.push(order_id);
                    }
                    Err(error) => error!(%error, %order_id, "placed order did not translate"),
                }
            }
            Err(error) => {
                error!(%error, "placement failed, rolling back this pass");
                roll_back_pass(group, client, &created).await;
                break;
            }
        }
    }
}

async fn roll_back_pass<C: ExchangeClient>(
    group: &mut PortfolioGroup,
    client: &C,
    created: &[String],
) {
    for order_id in created {
        match client.cancel_order(order_id).await {
            // cancelled locally too so it stops holding balance; the feed's
            // own done event finds it already canceled and is a no-op
            Ok(()) => {
                if let Err(error) = group.own_orders_mut().cancel_order(order_id) {
                    error!(%error, %order_id, "local cancel failed");
                }
            }
            Err(error) => {
                error!(%error, %order_id, "rollback cancel failed");
            }
        }
    }
}
