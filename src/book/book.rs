//! Core order book: store-backed price ladders and incremental event
//! application.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use tracing::trace;

use super::error::BookError;
use super::order::{Order, OrderKind, OrderStatus};
use crate::product::{Product, Side};
use crate::store::Store;

/// Price levels fetched per round of a depth walk.
const DEPTH_WALK_BATCH: usize = 10;

/// Result of a depth walk down one side of the book.
///
/// `best`/`worst` are the first and last price levels touched; `notional` is
/// the quote value accumulated over the requested depth; `excess` is the
/// quantity left at the worst level after the walk and `worst_fill` the full
/// size resting there.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceDepth {
    /// First (most aggressive) price touched
    pub best: Option<Decimal>,
    /// Last price touched
    pub worst: Option<Decimal>,
    /// Quote notional accumulated across the walk
    pub notional: Decimal,
    /// Size left unconsumed at the worst level
    pub excess: Decimal,
    /// Total size resting at the worst level
    pub worst_fill: Decimal,
}

/// A maker placement suggestion: the price a new resting order should take
/// and the quantity it can expect to fill there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MakerPlacement {
    /// Price to rest at
    pub price: Decimal,
    /// Fillable quantity at that price
    pub fillable: Decimal,
}

/// Per-product limit order book.
///
/// Ladders live in the shared store as a score-ordered price index per side,
/// with a running size sum and an `order_id -> size` map per price. The book
/// itself only keeps the monotone sequence id and apply counters.
pub struct OrderBook {
    store: Arc<Store>,
    product: Arc<Product>,
    sequence_id: AtomicU64,
    orders_added: AtomicU64,
    orders_subtracted: AtomicU64,
}

impl OrderBook {
    /// A book for `product`, starting at sequence zero.
    pub fn new(store: Arc<Store>, product: Arc<Product>) -> Self {
        Self {
            store,
            product,
            sequence_id: AtomicU64::new(0),
            orders_added: AtomicU64::new(0),
            orders_subtracted: AtomicU64::new(0),
        }
    }

    /// The product this book tracks.
    pub fn product(&self) -> &Arc<Product> {
        &self.product
    }

    /// The shared store backing the ladders and trade history.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Product id shorthand.
    pub fn product_id(&self) -> &str {
        self.product.product_id()
    }

    /// Highest sequence applied so far.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id.load(Ordering::Acquire)
    }

    /// Count of add events applied.
    pub fn orders_added(&self) -> u64 {
        self.orders_added.load(Ordering::Relaxed)
    }

    /// Count of remove/match/change events applied.
    pub fn orders_subtracted(&self) -> u64 {
        self.orders_subtracted.load(Ordering::Relaxed)
    }

    // --- store keys ---

    fn root_key(&self, side: Side) -> String {
        format!("order_book:book:{}:{}", self.product_id(), side)
    }

    /// The price index key; members are per-price sum keys scored by price.
    fn ladder_key(&self, side: Side) -> String {
        self.root_key(side)
    }

    fn sum_key(&self, side: Side, price: Decimal) -> String {
        format!("{}:{}:order_size_sum", self.root_key(side), price_key(price))
    }

    fn orders_key(&self, side: Side, price: Decimal) -> String {
        format!("{}:{}:order_list", self.root_key(side), price_key(price))
    }

    pub(super) fn history_key(&self, side: Side, kind: OrderKind) -> String {
        format!("order_book:history:trades:{}:{}:{}", self.product_id(), side, kind)
    }

    // --- event application ---

    /// Apply one feed event.
    ///
    /// Ladder mutation is skipped for historical orders; trade history and
    /// the dirty-product marker are updated regardless. Unknown order ids and
    /// absent prices are normal sparsity and never fail; product mismatches
    /// and sequence regressions do.
    pub fn apply(&self, order: &Order) -> Result<(), BookError> {
        self.validate_order(order)?;
        self.sequence_id.fetch_max(order.sequence_id(), Ordering::AcqRel);

        let is_add = order.status() == OrderStatus::Open && order.kind() == OrderKind::Limit;
        if !order.is_historical() {
            if matches!(order.status(), OrderStatus::Filled | OrderStatus::Canceled) {
                self.remove_order(order);
            } else {
                match order.kind() {
                    OrderKind::Change => self.change_order(order),
                    OrderKind::Match => self.match_order(order),
                    _ => self.add_order(order),
                }
            }
        }

        self.store
            .sadd(&changed_products_key(order.side()), self.product_id());
        if is_add {
            self.orders_added.fetch_add(1, Ordering::Relaxed);
        } else {
            self.orders_subtracted.fetch_add(1, Ordering::Relaxed);
        }
        self.record_trade(order);
        trace!(
            product_id = self.product_id(),
            side = %order.side(),
            kind = %order.kind(),
            sequence = order.sequence_id(),
            "applied order event"
        );
        Ok(())
    }

    fn validate_order(&self, order: &Order) -> Result<(), BookError> {
        if order.product_id() != self.product_id() {
            return Err(BookError::ProductMismatch {
                book: self.product_id().to_string(),
                order: order.product_id().to_string(),
            });
        }
        let current = self.sequence_id();
        if order.sequence_id() < current {
            return Err(BookError::SequenceBehind {
                current,
                incoming: order.sequence_id(),
            });
        }
        Ok(())
    }

    fn add_order(&self, order: &Order) {
        let Some(order_id) = order.order_id() else {
            return;
        };
        let side = order.side();
        let price = order.price();
        let sum_key = self.sum_key(side, price);
        self.store.zadd(&self.ladder_key(side), price, &sum_key);
        self.store
            .hset(&self.orders_key(side, price), order_id, order.size());
        self.store.incr_by(&sum_key, order.size());
    }

    fn remove_order(&self, order: &Order) {
        let Some(order_id) = order.order_id() else {
            return;
        };
        let side = order.side();
        let price = order.price();
        let orders_key = self.orders_key(side, price);
        let sum_key = self.sum_key(side, price);
        // late events reference orders we never saw; leave the level alone
        if self.store.hdel(&orders_key, order_id).is_none() {
            return;
        }
        if self.store.hlen(&orders_key) == 0 {
            self.store.del(&orders_key);
            self.store.del(&sum_key);
            self.store.zrem(&self.ladder_key(side), &sum_key);
        } else {
            self.store.incr_by(&sum_key, -order.size());
        }
    }

    /// Change events carry the new remaining size in `filled_size`; the sum
    /// shrinks by the delta between old and new size.
    fn change_order(&self, order: &Order) {
        let Some(order_id) = order.order_id() else {
            return;
        };
        let side = order.side();
        let price = order.price();
        let orders_key = self.orders_key(side, price);
        if self.store.hexists(&orders_key, order_id) {
            self.store.hset(&orders_key, order_id, order.filled_size());
            self.store
                .incr_by(&self.sum_key(side, price), -order.remaining());
        }
    }

    fn match_order(&self, order: &Order) {
        let Some(order_id) = order.order_id() else {
            return;
        };
        let side = order.side();
        let price = order.price();
        self.store
            .hincr_by(&self.orders_key(side, price), order_id, -order.size());
        self.store.incr_by(&self.sum_key(side, price), -order.size());
    }

    fn record_trade(&self, order: &Order) {
        let key = self.history_key(order.side(), order.kind());
        let timestamp = order.unix_timestamp();
        let bucket_key = format!("{key}:{timestamp}");
        self.store.zadd(&key, Decimal::from(timestamp), &bucket_key);
        self.store.incr_by(&bucket_key, order.size());
    }

    // --- price queries ---

    /// Walk `side` in price-preference order (bids descending, asks
    /// ascending) until `depth` is accumulated or the ladder is exhausted.
    pub fn price_depth(&self, side: Side, depth: Decimal) -> PriceDepth {
        let ladder_key = self.ladder_key(side);
        let desc = side == Side::Bid;
        let mut result = PriceDepth {
            best: None,
            worst: None,
            notional: Decimal::ZERO,
            excess: Decimal::ZERO,
            worst_fill: Decimal::ZERO,
        };
        let mut total = Decimal::ZERO;
        let mut offset = 0;
        'walk: loop {
            let levels = self
                .store
                .zrange_batch(&ladder_key, offset, DEPTH_WALK_BATCH, desc);
            if levels.is_empty() {
                break;
            }
            for (sum_key, price) in &levels {
                if result.best.is_none() {
                    result.best = Some(*price);
                }
                result.worst = Some(*price);
                let Some(size) = self.store.get_num(sum_key) else {
                    continue;
                };
                let take = size.min(depth - total);
                result.excess = size - take;
                result.worst_fill = size;
                result.notional += *price * take;
                total += take;
                if total >= depth {
                    break 'walk;
                }
            }
            offset += DEPTH_WALK_BATCH;
        }
        result
    }

    /// Best price on `side`, if the ladder is non-empty.
    pub fn best(&self, side: Side) -> Option<Decimal> {
        self.price_depth(side, Decimal::ZERO).worst
    }

    /// All `(price, aggregated size)` levels on `side` in price-preference
    /// order.
    pub fn levels(&self, side: Side) -> Vec<(Decimal, Decimal)> {
        let ladder_key = self.ladder_key(side);
        let desc = side == Side::Bid;
        let mut levels = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self
                .store
                .zrange_batch(&ladder_key, offset, DEPTH_WALK_BATCH, desc);
            if batch.is_empty() {
                break;
            }
            for (sum_key, price) in &batch {
                let size = self.store.get_num(sum_key).unwrap_or(Decimal::ZERO);
                levels.push((*price, size));
            }
            offset += DEPTH_WALK_BATCH;
        }
        levels
    }

    /// The `(order_id, size)` rows resting at one price level.
    pub fn level_orders(&self, side: Side, price: Decimal) -> Vec<(String, Decimal)> {
        self.store.hgetall(&self.orders_key(side, price))
    }

    /// Best bid, if any.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.best(Side::Bid)
    }

    /// Best ask, if any.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.best(Side::Ask)
    }

    /// Best bid and ask together.
    pub fn best_bid_ask(&self) -> (Option<Decimal>, Option<Decimal>) {
        (self.best_bid(), self.best_ask())
    }

    /// Whether the spread is locked to a single increment: the next price
    /// above the best bid is already the best ask.
    pub fn spread_locked(&self) -> bool {
        match self.best_bid_ask() {
            (Some(bid), Some(ask)) => {
                self.product.higher_price(bid) == self.product.round_price(ask)
            }
            _ => false,
        }
    }

    /// Check the resting-book invariant `best_bid <= best_ask`.
    pub fn validate(&self) -> Result<(), BookError> {
        if let (Some(bid), Some(ask)) = self.best_bid_ask()
            && bid > ask
        {
            return Err(BookError::Crossed { bid, ask });
        }
        Ok(())
    }

    /// The price a new maker order of `total_quantity` should rest at so
    /// that, once the `total_quantity - desired_quantity` queued ahead of it
    /// fills, it fills too.
    ///
    /// Returns `None` while the ladder is empty. When the queue ahead ends
    /// within one min-size of a level boundary, resting at the worst walked
    /// price is already optimal. When the walk never leaves the best level
    /// and the spread is locked (or stepping past best is disallowed), there
    /// is nowhere better to go and the fillable quantity is zero. Otherwise
    /// the order steps one increment more aggressive than the worst walked
    /// price, picking up the remainder of that level.
    pub fn placement_price(
        &self,
        side: Side,
        total_quantity: Decimal,
        desired_quantity: Decimal,
        allow_exceed_best: bool,
    ) -> Option<MakerPlacement> {
        let ahead = total_quantity - desired_quantity;
        let depth = self.price_depth(side, ahead);
        let (best, worst) = match (depth.best, depth.worst) {
            (Some(best), Some(worst)) => (best, worst),
            _ => return None,
        };
        if depth.excess <= self.product.base_min_size() {
            return Some(MakerPlacement {
                price: worst,
                fillable: desired_quantity,
            });
        }
        if best == worst && (self.spread_locked() || !allow_exceed_best) {
            return Some(MakerPlacement {
                price: best,
                fillable: Decimal::ZERO,
            });
        }
        let price = match side {
            Side::Bid => self.product.higher_price(worst),
            Side::Ask => self.product.lower_price(worst),
        };
        Some(MakerPlacement {
            price,
            fillable: desired_quantity + depth.worst_fill - depth.excess,
        })
    }
}

/// Rescale a price to the store's fixed five-decimal key form.
fn price_key(price: Decimal) -> String {
    let mut rescaled = price;
    rescaled.rescale(5);
    rescaled.to_string()
}

/// Key of the per-side dirty-product set.
pub fn changed_products_key(side: Side) -> String {
    format!("order_book:changed_products:{side}")
}
