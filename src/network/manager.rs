//! The conversion-network manager: store-backed weighted digraphs derived
//! from the order books.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::cycles::{canonicalize, simple_cycles};
use super::{CycleValue, EdgeKind, NetKind, NextHop, QuoteView};
use crate::book::{BookError, OrderBook, OrderKind};
use crate::config;
use crate::product::{Currency, Side};
use crate::store::Store;

/// Stateless view over the network edges in the shared store.
///
/// The network stage writes edges here after each book refresh; the
/// portfolio stage reads cycles and valuations from the same keys, so both
/// see one source of truth with per-key atomicity.
#[derive(Clone)]
pub struct NetworkManager {
    store: Arc<Store>,
}

impl NetworkManager {
    /// A manager over `store`.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn key(net: NetKind, edge: EdgeKind, view: QuoteView, start: Currency) -> String {
        format!("network:{net}:{edge}:{view}:{start}")
    }

    fn prefix(net: NetKind, edge: EdgeKind, view: QuoteView) -> String {
        format!("network:{net}:{edge}:{view}:")
    }

    /// Record a directed edge in both the price and quantity nets of an
    /// `(edge, view)` graph.
    pub fn add_edge(
        &self,
        edge: EdgeKind,
        view: QuoteView,
        source: Currency,
        destination: Currency,
        weight: Decimal,
        quantity: Decimal,
    ) {
        self.store.hset(
            &Self::key(NetKind::Price, edge, view, source),
            &destination.to_string(),
            weight,
        );
        self.store.hset(
            &Self::key(NetKind::Quantity, edge, view, source),
            &destination.to_string(),
            quantity,
        );
    }

    /// Weight of the `source -> destination` edge, if present.
    pub fn edge_weight(
        &self,
        net: NetKind,
        edge: EdgeKind,
        view: QuoteView,
        source: Currency,
        destination: Currency,
    ) -> Option<Decimal> {
        self.store
            .hget(&Self::key(net, edge, view, source), &destination.to_string())
    }

    /// Materialize one `(net, edge, view)` digraph from the store.
    pub fn graph(&self, net: NetKind, edge: EdgeKind, view: QuoteView) -> DiGraph<Currency, Decimal> {
        let prefix = Self::prefix(net, edge, view);
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<Currency, _> = HashMap::new();
        for key in self.store.hash_keys_with_prefix(&prefix) {
            let Some(source) = key
                .rsplit(':')
                .next()
                .and_then(|name| name.parse::<Currency>().ok())
            else {
                continue;
            };
            for (destination, weight) in self.store.hgetall(&key) {
                let Ok(destination) = destination.parse::<Currency>() else {
                    continue;
                };
                let a = *nodes.entry(source).or_insert_with(|| graph.add_node(source));
                let b = *nodes
                    .entry(destination)
                    .or_insert_with(|| graph.add_node(destination));
                graph.update_edge(a, b, weight);
            }
        }
        graph
    }

    /// All simple cycles of the `(edge, view)` price graph, canonicalized
    /// and keyed by their product-of-weights. Identical values keep the last
    /// cycle seen.
    pub fn cycles_by_value(
        &self,
        edge: EdgeKind,
        view: QuoteView,
    ) -> BTreeMap<CycleValue, Vec<Currency>> {
        let graph = self.graph(NetKind::Price, edge, view);
        let weights: HashMap<(Currency, Currency), Decimal> = graph
            .edge_references()
            .map(|edge_ref| {
                (
                    (graph[edge_ref.source()], graph[edge_ref.target()]),
                    *edge_ref.weight(),
                )
            })
            .collect();
        let mut cycles = BTreeMap::new();
        for cycle in simple_cycles(&graph) {
            let closed = canonicalize(&cycle);
            let mut value = 1f64;
            let mut complete = true;
            for hop in closed.windows(2) {
                match weights.get(&(hop[0], hop[1])).and_then(|weight| weight.to_f64()) {
                    Some(weight) => value *= weight,
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                cycles.insert(CycleValue(value), closed);
            }
        }
        cycles
    }

    /// The subset of [`Self::cycles_by_value`] passing through
    /// `start_currency`.
    pub fn cycles_for_currency(
        &self,
        edge: EdgeKind,
        view: QuoteView,
        start_currency: Currency,
    ) -> BTreeMap<CycleValue, Vec<Currency>> {
        self.cycles_by_value(edge, view)
            .into_iter()
            .filter(|(_, cycle)| cycle.contains(&start_currency))
            .collect()
    }

    /// For each cycle through `start_currency`, the hop to take next: the
    /// following currency with its product-view price and available depth.
    /// Cycles whose product-view edges are not yet populated are skipped.
    pub fn next_hops(
        &self,
        edge: EdgeKind,
        start_currency: Currency,
    ) -> BTreeMap<CycleValue, NextHop> {
        let cycles = self.cycles_for_currency(edge, QuoteView::Currency, start_currency);
        let mut hops = BTreeMap::new();
        for (value, cycle) in cycles {
            let Some(position) = cycle.iter().position(|currency| *currency == start_currency)
            else {
                continue;
            };
            let Some(next) = cycle.get(position + 1).copied() else {
                continue;
            };
            let price = self.edge_weight(
                NetKind::Price,
                edge,
                QuoteView::Product,
                start_currency,
                next,
            );
            let available = self.edge_weight(
                NetKind::Quantity,
                edge,
                QuoteView::Product,
                start_currency,
                next,
            );
            if let (Some(price), Some(available)) = (price, available) {
                hops.insert(
                    value,
                    NextHop {
                        next,
                        price,
                        available,
                    },
                );
            }
        }
        hops
    }

    /// Value a balance map in `target` currency using the best-price
    /// currency-view graph. Returns per-currency `(value, edge weight)` for
    /// every currency with a direct edge to `target` (the target itself
    /// converts at one) plus the total.
    pub fn value_portfolio(
        &self,
        balances: &BTreeMap<Currency, Decimal>,
        target: Currency,
    ) -> (BTreeMap<Currency, (Decimal, Decimal)>, Decimal) {
        let mut valued = BTreeMap::new();
        let mut total = Decimal::ZERO;
        for (currency, quantity) in balances {
            if *currency == target {
                valued.insert(*currency, (*quantity, Decimal::ONE));
                total += *quantity;
                continue;
            }
            if let Some(weight) = self.edge_weight(
                NetKind::Price,
                EdgeKind::Best,
                QuoteView::Currency,
                *currency,
                target,
            ) {
                let value = weight * *quantity;
                valued.insert(*currency, (value, weight));
                total += value;
            }
        }
        (valued, total)
    }

    /// Refresh every edge flavor for one `(book, side)` pair.
    pub fn update_from_book(&self, book: &OrderBook, side: Side) -> Result<(), BookError> {
        for edge in EdgeKind::ALL {
            self.refresh_edge(book, side, edge)?;
        }
        Ok(())
    }

    fn refresh_edge(&self, book: &OrderBook, side: Side, edge: EdgeKind) -> Result<(), BookError> {
        let product = book.product();
        let source = product.source(side);
        let destination = product.destination(side);

        if edge == EdgeKind::Best {
            if let Some(price) = book.best(side) {
                let currency_price = product.quote_to_currency_price(destination, price);
                self.add_edge(
                    edge,
                    QuoteView::Currency,
                    source,
                    destination,
                    currency_price,
                    config::default_edge_qty(),
                );
                self.add_edge(
                    edge,
                    QuoteView::Product,
                    source,
                    destination,
                    price,
                    config::default_edge_qty(),
                );
            }
            return Ok(());
        }

        let Some(product_qty) = book.edge_trade_size(
            side,
            OrderKind::Match,
            config::NETWORK_LOOKBACK_SECS,
            edge,
            Some(config::ORDER_AGGREGATION_SECS),
        )?
        else {
            return Ok(());
        };
        let desired = product_qty * config::qty_multiplier();
        // the custom flavor never steps past the best price
        let allow_exceed_best = edge != EdgeKind::Custom;
        let Some(placement) = book.placement_price(side, product_qty, desired, allow_exceed_best)
        else {
            return Ok(());
        };
        let currency_price = product.quote_to_currency_price(destination, placement.price);
        let currency_qty =
            product.currency_qty_from_quote_qty(destination, placement.fillable, placement.price);
        self.add_edge(
            edge,
            QuoteView::Currency,
            source,
            destination,
            currency_price,
            currency_qty,
        );
        self.add_edge(
            edge,
            QuoteView::Product,
            source,
            destination,
            placement.price,
            placement.fillable,
        );
        Ok(())
    }
}
