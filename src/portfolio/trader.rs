//! The decision pass: walk profitable cycles and size maker orders.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::group::PortfolioGroup;
use super::PortfolioError;
use crate::book::Order;
use crate::config;
use crate::network::EdgeKind;

/// Sizes maker orders against the ranked conversion cycles.
pub struct Trader {
    edge_kind: EdgeKind,
    min_cycle_return: f64,
}

impl Trader {
    /// Trader over an explicit edge flavor and profitability floor.
    pub fn new(edge_kind: EdgeKind, min_cycle_return: f64) -> Self {
        Self {
            edge_kind,
            min_cycle_return,
        }
    }

    /// The orders one decision pass wants to place: at most one per source
    /// currency, sized against available balance, book depth, allocation
    /// headroom and orders already working the same edge.
    pub fn next_orders(&self, group: &PortfolioGroup) -> Result<Vec<Order>, PortfolioError> {
        let pass_id = Uuid::new_v4();
        let tradable = group.tradable_quantities();
        let deltas = group.max_currency_deltas();
        let mut orders = Vec::new();

        for (currency, available) in tradable {
            if available <= Decimal::ZERO {
                continue;
            }
            let mut currency_qty = available;
            if let Some(delta) = deltas.get(&currency) {
                currency_qty = currency_qty.min(delta.decrease);
            }
            let hops = group.network().next_hops(self.edge_kind, currency);
            // best cycles first; once below the floor, the rest are worse
            for (value, hop) in hops.iter().rev() {
                if value.0 <= self.min_cycle_return {
                    break;
                }
                let working = group.own_orders().edge_qty(currency, hop.next);
                let remaining_edge_qty = hop.available - working;
                if remaining_edge_qty <= Decimal::ZERO {
                    continue;
                }
                let Some(product) = group
                    .product_manager()
                    .product_from_currencies(currency, hop.next)
                else {
                    warn!(%currency, next = %hop.next, "cycle edge without a product");
                    continue;
                };
                let Some(side) = product.side_from_direction(currency, hop.next) else {
                    warn!(%currency, next = %hop.next, "cycle edge without a side");
                    continue;
                };
                let price = hop.price;
                let mut quote_qty = remaining_edge_qty
                    .min(product.quote_qty_from_currency_qty(currency, currency_qty, price));
                let destination_qty =
                    product.currency_qty_from_quote_qty(hop.next, quote_qty, price);
                if let Some(next_delta) = deltas.get(&hop.next)
                    && destination_qty > next_delta.increase
                {
                    quote_qty =
                        product.quote_qty_from_currency_qty(hop.next, next_delta.increase, price);
                }
                quote_qty = product.round_quantity(quote_qty);
                if quote_qty > product.base_min_size() {
                    info!(
                        %pass_id,
                        cycle_return = value.0,
                        source = %currency,
                        destination = %hop.next,
                        product_id = product.product_id(),
                        %side,
                        %price,
                        size = %quote_qty,
                        "trade identified"
                    );
                    let order = Order::new(product.product_id(), 0, side, quote_qty, price)?;
                    orders.push(order);
                    // one order per source currency per pass
                    break;
                }
            }
        }
        debug!(%pass_id, orders = orders.len(), "decision pass complete");
        Ok(orders)
    }
}

impl Default for Trader {
    fn default() -> Self {
        Self::new(config::EDGE_KIND, config::MIN_CYCLE_RETURN)
    }
}
