//! Trade-history aggregates over the per-second score index.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

use super::book::OrderBook;
use super::error::BookError;
use super::order::OrderKind;
use crate::network::EdgeKind;
use crate::product::Side;

impl OrderBook {
    /// Per-bucket trade quantities for the `(side, kind)` stream over the
    /// last `seconds_ago` seconds, oldest first.
    ///
    /// With `group_by_period`, scores are floored to the period and adjacent
    /// buckets with the same floored score are coalesced by summing; without
    /// it every second is its own bucket.
    pub fn trade_quantities(
        &self,
        side: Side,
        kind: OrderKind,
        seconds_ago: i64,
        group_by_period: Option<i64>,
    ) -> Vec<Decimal> {
        let now = Utc::now().timestamp();
        let entries = self.trade_history_range(side, kind, now - seconds_ago, now);
        let mut quantities: Vec<Decimal> = Vec::new();
        let mut last_bucket: Option<i64> = None;
        for (size, created_at) in entries {
            let bucket = match group_by_period {
                Some(period) if period > 0 => (created_at / period) * period,
                _ => created_at,
            };
            if last_bucket == Some(bucket) {
                if let Some(total) = quantities.last_mut() {
                    *total += size;
                }
            } else {
                quantities.push(size);
            }
            last_bucket = Some(bucket);
        }
        quantities
    }

    /// Raw `(size, unix_second)` pairs of the stream within `[from, to]`.
    fn trade_history_range(
        &self,
        side: Side,
        kind: OrderKind,
        from: i64,
        to: i64,
    ) -> Vec<(Decimal, i64)> {
        let key = self.history_key(side, kind);
        self.store()
            .zrange_by_score(&key, Decimal::from(from), Decimal::from(to))
            .into_iter()
            .filter_map(|(bucket_key, score)| {
                let size = self.store().get_num(&bucket_key)?;
                Some((size, score.to_i64()?))
            })
            .collect()
    }

    /// Total traded quantity over the window.
    pub fn volume(&self, side: Side, kind: OrderKind, seconds_ago: i64) -> Decimal {
        self.trade_quantities(side, kind, seconds_ago, None)
            .into_iter()
            .sum()
    }

    /// Mean bucket quantity, `None` on an empty window.
    pub fn mean_trade_size(
        &self,
        side: Side,
        kind: OrderKind,
        seconds_ago: i64,
        group_by_period: Option<i64>,
    ) -> Option<Decimal> {
        mean(&self.trade_quantities(side, kind, seconds_ago, group_by_period))
    }

    /// Median bucket quantity, `None` on an empty window.
    pub fn median_trade_size(
        &self,
        side: Side,
        kind: OrderKind,
        seconds_ago: i64,
        group_by_period: Option<i64>,
    ) -> Option<Decimal> {
        median(&self.trade_quantities(side, kind, seconds_ago, group_by_period))
    }

    /// Most common bucket quantity; `None` on an empty window or when no
    /// single quantity is most common.
    pub fn mode_trade_size(
        &self,
        side: Side,
        kind: OrderKind,
        seconds_ago: i64,
        group_by_period: Option<i64>,
    ) -> Option<Decimal> {
        mode(&self.trade_quantities(side, kind, seconds_ago, group_by_period))
    }

    /// The trade size an `edge_kind` network edge derives from recent
    /// history: zero for best-price edges, the bucket mean (or a tenth of it
    /// for the custom flavor), or the bucket median.
    ///
    /// A negative result indicates corrupted bookkeeping and is fatal.
    pub fn edge_trade_size(
        &self,
        side: Side,
        kind: OrderKind,
        seconds_ago: i64,
        edge_kind: EdgeKind,
        group_by_period: Option<i64>,
    ) -> Result<Option<Decimal>, BookError> {
        let size = match edge_kind {
            EdgeKind::Best => Some(Decimal::ZERO),
            EdgeKind::Mean => self.mean_trade_size(side, kind, seconds_ago, group_by_period),
            EdgeKind::Median => self.median_trade_size(side, kind, seconds_ago, group_by_period),
            EdgeKind::Custom => self
                .mean_trade_size(side, kind, seconds_ago, group_by_period)
                .map(|mean| mean / Decimal::TEN),
        };
        if let Some(size) = size
            && size < Decimal::ZERO
        {
            return Err(BookError::NegativeEdgeSize { side, size });
        }
        Ok(size)
    }
}

fn mean(quantities: &[Decimal]) -> Option<Decimal> {
    if quantities.is_empty() {
        return None;
    }
    let total: Decimal = quantities.iter().copied().sum();
    Some(total / Decimal::from(quantities.len() as u64))
}

fn median(quantities: &[Decimal]) -> Option<Decimal> {
    if quantities.is_empty() {
        return None;
    }
    let mut sorted = quantities.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / Decimal::TWO)
    }
}

fn mode(quantities: &[Decimal]) -> Option<Decimal> {
    if quantities.is_empty() {
        return None;
    }
    let mut counts: HashMap<Decimal, usize> = HashMap::new();
    for quantity in quantities {
        *counts.entry(*quantity).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max()?;
    let mut at_max = counts
        .into_iter()
        .filter(|(_, count)| *count == max_count)
        .map(|(quantity, _)| quantity);
    let candidate = at_max.next()?;
    // a tie means there is no mode
    if at_max.next().is_some() { None } else { Some(candidate) }
}
