//! End-to-end pipeline behavior against an in-memory exchange double.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::timeout;

use cyclebook_rs::prelude::*;

use crate::common::dec;

/// Minimal exchange double: one product, empty books, no balances. Order
/// placement always rejects, which exercises the rollback path harmlessly.
struct StubExchange;

impl ExchangeClient for StubExchange {
    async fn products(&self) -> Result<Vec<ProductInfo>, ApiError> {
        Ok(vec![ProductInfo {
            id: "BTC-USD".to_string(),
            quote_currency: "USD".to_string(),
            base_currency: "BTC".to_string(),
            quote_increment: dec("0.01"),
            base_min_size: dec("0.01"),
        }])
    }

    async fn currencies(&self) -> Result<Vec<CurrencyInfo>, ApiError> {
        Ok(vec![
            CurrencyInfo {
                id: "USD".to_string(),
                min_size: dec("0.01"),
            },
            CurrencyInfo {
                id: "BTC".to_string(),
                min_size: dec("0.0001"),
            },
            // unknown currencies are skipped, not fatal
            CurrencyInfo {
                id: "GBP".to_string(),
                min_size: dec("0.01"),
            },
        ])
    }

    async fn book_snapshot(&self, _product_id: &str) -> Result<BookSnapshot, ApiError> {
        Ok(BookSnapshot {
            sequence: 0,
            bids: Vec::new(),
            asks: Vec::new(),
        })
    }

    async fn recent_trades(&self, _product_id: &str) -> Result<Vec<HistoricalTrade>, ApiError> {
        Ok(Vec::new())
    }

    async fn accounts(&self) -> Result<Vec<AccountBalance>, ApiError> {
        Ok(Vec::new())
    }

    async fn open_orders(&self) -> Result<Vec<PlacedOrder>, ApiError> {
        Ok(Vec::new())
    }

    async fn place_order(
        &self,
        _side: Side,
        _params: &PlaceOrderParams,
    ) -> Result<PlacedOrder, ApiError> {
        Err(ApiError::Rejected("stub exchange".to_string()))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn cancel_all(&self, _product_id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

fn open_message(sequence: u64, price: &str) -> FeedMessage {
    FeedMessage::Open {
        product_id: "BTC-USD".to_string(),
        sequence,
        order_id: format!("order-{sequence}"),
        price: dec(price),
        remaining_size: dec("1"),
        side: FeedSide::Buy,
        time: Utc::now(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequence_gap_forces_restart() {
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let pipeline = Pipeline::new(Arc::new(StubExchange), feed_rx);
    for sequence in [1, 2, 4] {
        feed_tx.send(open_message(sequence, "10.00")).await.unwrap();
    }
    let outcome = timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("pipeline should exit on the gap")
        .unwrap();
    assert_eq!(outcome, Outcome::Restart);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn contiguous_feed_shuts_down_cleanly() {
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let pipeline = Pipeline::new(Arc::new(StubExchange), feed_rx);
    let exit = pipeline.exit_flag();

    for sequence in [1, 2, 3] {
        feed_tx.send(open_message(sequence, "10.00")).await.unwrap();
    }
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        exit.trigger_shutdown();
    });

    let outcome = timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("pipeline should honor the exit flag")
        .unwrap();
    assert_eq!(outcome, Outcome::Shutdown);
    // the feed channel stays open the whole run
    drop(feed_tx);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closed_feed_channel_requests_restart() {
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let pipeline = Pipeline::new(Arc::new(StubExchange), feed_rx);
    drop(feed_tx);
    let outcome = timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("pipeline should exit when the feed dies")
        .unwrap();
    assert_eq!(outcome, Outcome::Restart);
}
