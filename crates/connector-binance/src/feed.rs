use common::BinanceEnvironment;
use connector_core::{ConnectorError, TickFeed, TickSender};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::SharedMetrics;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::stream::run_trade_stream;

/// Trade price feed with one aggTrade stream per subscribed symbol.
///
/// Every stream pushes into the same [`TickSender`]. Must be used from
/// within a Tokio runtime, since `subscribe` spawns the stream task.
pub struct BinanceTradeFeed {
    environment: BinanceEnvironment,
    sender: TickSender,
    metrics: SharedMetrics,
    subscriptions: DashMap<String, watch::Sender<bool>>,
}

impl BinanceTradeFeed {
    pub fn new(environment: BinanceEnvironment, sender: TickSender, metrics: SharedMetrics) -> Self {
        Self {
            environment,
            sender,
            metrics,
            subscriptions: DashMap::new(),
        }
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.subscriptions.contains_key(symbol)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Stop every stream.
    pub fn shutdown(&self) {
        for entry in self.subscriptions.iter() {
            let _ = entry.value().send(true);
        }
        self.subscriptions.clear();
    }
}

impl TickFeed for BinanceTradeFeed {
    fn subscribe(&self, symbol: &str) {
        let shutdown_rx = match self.subscriptions.entry(symbol.to_string()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(vacant) => {
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                vacant.insert(shutdown_tx);
                shutdown_rx
            }
        };

        info!(symbol = %symbol, "Subscribing to trade stream");
        let symbol = symbol.to_string();
        let environment = self.environment;
        let sender = self.sender.clone();
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            match run_trade_stream(symbol.clone(), environment, sender, shutdown_rx, metrics).await {
                Ok(()) => {}
                Err(ConnectorError::ChannelClosed) => {
                    info!(symbol = %symbol, "Tick channel closed, trade stream exited")
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "Trade stream exited"),
            }
        });
    }

    fn unsubscribe(&self, symbol: &str) {
        if let Some((_, shutdown_tx)) = self.subscriptions.remove(symbol) {
            info!(symbol = %symbol, "Unsubscribing from trade stream");
            let _ = shutdown_tx.send(true);
        }
    }
}

impl Drop for BinanceTradeFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}
