//! Registry of tradable products and currency minimums.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rust_decimal::Decimal;

use super::currency::{Currency, Side};
use super::product::Product;

/// Read-mostly registry built once at startup and shared across stages.
///
/// Iteration order is the product-id order, which keeps decision passes and
/// tests deterministic.
#[derive(Debug, Default)]
pub struct ProductManager {
    products: BTreeMap<String, Arc<Product>>,
    currency_min_sizes: BTreeMap<Currency, Decimal>,
}

impl ProductManager {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product, replacing any previous entry with the same id.
    pub fn insert(&mut self, product: Product) {
        self.products
            .insert(product.product_id().to_string(), Arc::new(product));
    }

    /// Remove a product by id.
    pub fn remove(&mut self, product_id: &str) -> Option<Arc<Product>> {
        self.products.remove(product_id)
    }

    /// Look up a product by id.
    pub fn product(&self, product_id: &str) -> Option<&Arc<Product>> {
        self.products.get(product_id)
    }

    /// All registered product ids, in order.
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    /// Number of registered products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// The product converting between `{a, b}`, if one is registered.
    pub fn product_from_currencies(&self, a: Currency, b: Currency) -> Option<&Arc<Product>> {
        self.products.values().find(|product| product.matches_pair(a, b))
    }

    /// Side of the registered product that converts `source` into
    /// `destination`.
    pub fn side_from_direction(&self, source: Currency, destination: Currency) -> Option<Side> {
        self.product_from_currencies(source, destination)?
            .side_from_direction(source, destination)
    }

    /// Union of all product currency sets.
    pub fn currencies(&self) -> BTreeSet<Currency> {
        self.products
            .values()
            .flat_map(|product| product.currency_set())
            .collect()
    }

    /// Record the exchange's minimum tradable size for a currency.
    pub fn set_currency_min_size(&mut self, currency: Currency, min_size: Decimal) {
        self.currency_min_sizes.insert(currency, min_size);
    }

    /// The exchange's minimum tradable size for `currency`, if known.
    pub fn min_size(&self, currency: Currency) -> Option<Decimal> {
        self.currency_min_sizes.get(&currency).copied()
    }
}
