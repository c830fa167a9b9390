//! Operator-tunable portfolio target fractions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::config;
use crate::product::Currency;
use crate::store::Store;

/// Per-currency `(min_fraction, max_fraction)` allocation bounds.
///
/// Operators retune these through the store without a restart; reads go
/// through a short-TTL cache so every decision pass sees fresh values
/// without hammering the keys. Missing keys mean the `(0, 1)` defaults.
pub struct TargetFractions {
    store: Arc<Store>,
    ttl: Duration,
    cache: DashMap<Currency, (Instant, (Decimal, Decimal))>,
}

impl TargetFractions {
    /// Reader over `store` with the configured TTL.
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_ttl(store, Duration::from_millis(config::TARGET_FRACTION_TTL_MS))
    }

    /// Reader with an explicit TTL.
    pub fn with_ttl(store: Arc<Store>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: DashMap::new(),
        }
    }

    /// `(min_fraction, max_fraction)` for `currency`.
    pub fn fractions(&self, currency: Currency) -> (Decimal, Decimal) {
        if let Some(entry) = self.cache.get(&currency) {
            let (read_at, fractions) = *entry;
            if read_at.elapsed() < self.ttl {
                return fractions;
            }
        }
        let fractions = self.read(currency);
        self.cache.insert(currency, (Instant::now(), fractions));
        fractions
    }

    fn read(&self, currency: Currency) -> (Decimal, Decimal) {
        let min = self
            .store
            .get_num(&format!("portfolio:min_fraction:{currency}"))
            .unwrap_or(Decimal::ZERO);
        let max = self
            .store
            .get_num(&format!("portfolio:max_fraction:{currency}"))
            .unwrap_or(Decimal::ONE);
        (min, max)
    }
}
