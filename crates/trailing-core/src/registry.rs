//! Directory of trailed orders and the workers that run them.

use connector_core::{ExchangeClient, TickFeed};
use metrics::SharedMetrics;
use model::{OrderState, PriceTick};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::TrailingConfig;
use crate::processor::{OrderProcessor, TickOutcome};

/// Work item for a processor's mailbox.
#[derive(Debug, Clone)]
pub(crate) enum ProcessorCommand {
    Tick(PriceTick),
    /// Query the order regardless of price.
    CheckStatus,
}

/// Registry side of one processor.
///
/// The worker task never holds this, so dropping the last handle closes the
/// mailbox and ends the worker.
pub(crate) struct ProcessorHandle {
    /// Stable identity; survives re-keying to a new order id.
    slot: u64,
    symbol: String,
    pub(crate) mailbox: mpsc::Sender<ProcessorCommand>,
    busy: Arc<AtomicBool>,
}

#[derive(Default)]
struct RegistryInner {
    by_order: HashMap<u64, Arc<ProcessorHandle>>,
    by_symbol: HashMap<String, HashMap<u64, Arc<ProcessorHandle>>>,
}

/// Binds open orders to symbols and owns the feed subscriptions.
///
/// Both maps sit behind one lock so a processor is in the order map exactly
/// when it is in its symbol's set, and a symbol is subscribed exactly when
/// its set is non-empty. Feed calls are made while the write lock is held.
pub struct MonitorRegistry {
    inner: RwLock<RegistryInner>,
    exchange: Arc<dyn ExchangeClient>,
    feed: Arc<dyn TickFeed>,
    config: Arc<TrailingConfig>,
    metrics: SharedMetrics,
    next_slot: AtomicU64,
}

impl MonitorRegistry {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        feed: Arc<dyn TickFeed>,
        config: TrailingConfig,
        metrics: SharedMetrics,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(RegistryInner::default()),
            exchange,
            feed,
            config: Arc::new(config),
            metrics,
            next_slot: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &TrailingConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Start trailing `order`.
    ///
    /// Returns `false` for orders that are not stop-loss or stop-loss-limit
    /// and for ids that are already tracked. Must be called from within a
    /// Tokio runtime.
    pub fn register(self: &Arc<Self>, order: OrderState) -> bool {
        if !order.is_trailable() {
            debug!(
                symbol = %order.symbol,
                order_id = order.order_id,
                order_type = order.order_type.as_binance_str(),
                "Skipping non stop-loss order"
            );
            return false;
        }

        let (tx, rx) = mpsc::channel(self.config.mailbox_capacity);
        let busy = Arc::new(AtomicBool::new(false));
        {
            let mut inner = self.inner.write();
            if inner.by_order.contains_key(&order.order_id) {
                return false;
            }

            let handle = Arc::new(ProcessorHandle {
                slot: self.next_slot.fetch_add(1, Ordering::Relaxed),
                symbol: order.symbol.clone(),
                mailbox: tx,
                busy: busy.clone(),
            });

            inner.by_order.insert(order.order_id, handle.clone());
            let set = inner.by_symbol.entry(order.symbol.clone()).or_default();
            let first = set.is_empty();
            set.insert(handle.slot, handle);
            if first {
                self.feed.subscribe(&order.symbol);
            }
        }

        info!(
            symbol = %order.symbol,
            order_id = order.order_id,
            stop_price = %order.stop_price,
            remaining_qty = %order.remaining_qty(),
            "Trailing order"
        );
        self.metrics.inc_orders_registered();

        let processor = OrderProcessor::new(
            order,
            self.exchange.clone(),
            self.config.clone(),
            self.metrics.clone(),
        );
        tokio::spawn(run_worker(Arc::downgrade(self), processor, rx, busy));
        true
    }

    /// Stop trailing `order_id`. Unsubscribes the symbol when it was the
    /// last order on it.
    pub fn deregister(&self, order_id: u64) -> bool {
        let mut inner = self.inner.write();
        let Some(handle) = inner.by_order.remove(&order_id) else {
            return false;
        };

        let now_empty = match inner.by_symbol.get_mut(&handle.symbol) {
            Some(set) => {
                set.remove(&handle.slot);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            inner.by_symbol.remove(&handle.symbol);
            self.feed.unsubscribe(&handle.symbol);
        }
        drop(inner);

        info!(symbol = %handle.symbol, order_id, "Stopped trailing order");
        self.metrics.inc_orders_deregistered();
        true
    }

    /// Move a processor to the id of its replacement order.
    ///
    /// Returns `false` if `old_id` is no longer tracked or `new_id` already
    /// is; in the latter case the processor under `old_id` is dropped so
    /// only one processor follows the order.
    pub fn rekey(&self, old_id: u64, new_id: u64) -> bool {
        let mut inner = self.inner.write();
        if inner.by_order.contains_key(&new_id) {
            drop(inner);
            warn!(old_id, new_id, "Replacement order already tracked");
            self.deregister(old_id);
            return false;
        }
        match inner.by_order.remove(&old_id) {
            Some(handle) => {
                inner.by_order.insert(new_id, handle);
                true
            }
            None => false,
        }
    }

    /// Ask the processor for `order_id` to re-query its order.
    pub fn request_status_check(&self, order_id: u64) -> bool {
        let inner = self.inner.read();
        match inner.by_order.get(&order_id) {
            Some(handle) => handle.mailbox.try_send(ProcessorCommand::CheckStatus).is_ok(),
            None => false,
        }
    }

    /// Mailboxes of every processor trailing `symbol`.
    pub(crate) fn mailboxes(&self, symbol: &str) -> Vec<mpsc::Sender<ProcessorCommand>> {
        self.inner
            .read()
            .by_symbol
            .get(symbol)
            .map(|set| set.values().map(|h| h.mailbox.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether a processor on `symbol` is handling a command right now.
    pub fn is_busy(&self, symbol: &str) -> bool {
        self.inner
            .read()
            .by_symbol
            .get(symbol)
            .is_some_and(|set| set.values().any(|h| h.busy.load(Ordering::Acquire)))
    }

    pub fn contains(&self, order_id: u64) -> bool {
        self.inner.read().by_order.contains_key(&order_id)
    }

    pub fn tracked_order_ids(&self) -> Vec<u64> {
        self.inner.read().by_order.keys().copied().collect()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.inner.read().by_symbol.keys().cloned().collect()
    }

    pub fn processor_count(&self, symbol: &str) -> usize {
        self.inner
            .read()
            .by_symbol
            .get(symbol)
            .map_or(0, |set| set.len())
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every processor and unsubscribe every symbol.
    pub fn shutdown(&self) {
        let mut inner = self.inner.write();
        for symbol in inner.by_symbol.keys() {
            self.feed.unsubscribe(symbol);
        }
        let count = inner.by_order.len();
        inner.by_symbol.clear();
        inner.by_order.clear();
        info!(orders = count, "Registry shut down");
    }
}

/// Serially handle one processor's commands until its order closes or the
/// registry drops its handle.
async fn run_worker(
    registry: Weak<MonitorRegistry>,
    mut processor: OrderProcessor,
    mut mailbox: mpsc::Receiver<ProcessorCommand>,
    busy: Arc<AtomicBool>,
) {
    while let Some(command) = mailbox.recv().await {
        busy.store(true, Ordering::Release);
        let order_id = processor.order_id();
        let result = match command {
            ProcessorCommand::Tick(tick) => processor.on_tick(&tick).await,
            ProcessorCommand::CheckStatus => processor.check_status().await,
        };

        let Some(registry) = registry.upgrade() else {
            break;
        };

        let keep_running = match result {
            Ok(TickOutcome::Idle) | Ok(TickOutcome::StillOpen) => true,
            Ok(TickOutcome::Reordered {
                old_order_id,
                new_order_id,
            }) => {
                let tracked = registry.rekey(old_order_id, new_order_id);
                if !tracked {
                    warn!(
                        symbol = %processor.symbol(),
                        old_order_id,
                        new_order_id,
                        "Replaced order no longer tracked, worker exiting"
                    );
                }
                tracked
            }
            Ok(TickOutcome::Stopped) => {
                registry.deregister(order_id);
                false
            }
            Err(e) if e.is_critical() => {
                error!(symbol = %processor.symbol(), order_id, error = %e, "Order processing failed");
                true
            }
            Err(e) => {
                warn!(symbol = %processor.symbol(), order_id, error = %e, "Attempt abandoned");
                true
            }
        };

        busy.store(false, Ordering::Release);
        if !keep_running {
            break;
        }
    }
    debug!(order_id = processor.order_id(), "Processor worker exited");
}
