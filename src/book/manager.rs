//! Routing of feed events across per-product books.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::book::{OrderBook, changed_products_key};
use super::error::BookError;
use super::order::Order;
use crate::product::{ProductManager, Side};
use crate::store::Store;

/// Holds one [`OrderBook`] per registered product and routes events to them.
pub struct OrderBookManager {
    product_manager: Arc<ProductManager>,
    store: Arc<Store>,
    books: BTreeMap<String, OrderBook>,
}

impl OrderBookManager {
    /// Build a book for every product in the registry.
    pub fn new(store: Arc<Store>, product_manager: Arc<ProductManager>) -> Self {
        let books = product_manager
            .product_ids()
            .filter_map(|product_id| {
                let product = product_manager.product(product_id)?;
                Some((
                    product_id.to_string(),
                    OrderBook::new(Arc::clone(&store), Arc::clone(product)),
                ))
            })
            .collect();
        info!(products = product_manager.len(), "order books initialized");
        Self {
            product_manager,
            store,
            books,
        }
    }

    /// The product registry the books were built from.
    pub fn product_manager(&self) -> &Arc<ProductManager> {
        &self.product_manager
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// The book for `product_id`, if registered.
    pub fn book(&self, product_id: &str) -> Option<&OrderBook> {
        self.books.get(product_id)
    }

    /// All books, in product-id order.
    pub fn books(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }

    /// Highest sequence the product's book has applied.
    pub fn sequence_id(&self, product_id: &str) -> Option<u64> {
        self.books.get(product_id).map(OrderBook::sequence_id)
    }

    /// Route one event to its product's book.
    pub fn apply(&self, order: &Order) -> Result<(), BookError> {
        let book = self
            .books
            .get(order.product_id())
            .ok_or_else(|| BookError::UnknownProduct(order.product_id().to_string()))?;
        book.apply(order)
    }

    /// Atomically take up to `count` dirty product ids for `side`. Each
    /// marked product is delivered to exactly one caller.
    pub fn pop_dirty(&self, side: Side, count: usize) -> Vec<String> {
        self.store.spop_n(&changed_products_key(side), count)
    }
}
