//! Fan-out of feed ticks to processor mailboxes.

use connector_core::TickReceiver;
use metrics::SharedMetrics;
use model::PriceTick;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace};

use crate::registry::{MonitorRegistry, ProcessorCommand};

/// Routes each tick to every processor trailing its symbol.
///
/// Delivery uses `try_send`, so a processor busy with a replacement never
/// holds up its siblings or the feed. A full mailbox drops the tick for that
/// processor only.
pub struct TickDispatcher {
    registry: Arc<MonitorRegistry>,
    metrics: SharedMetrics,
}

impl TickDispatcher {
    pub fn new(registry: Arc<MonitorRegistry>) -> Self {
        let metrics = registry.metrics().clone();
        Self { registry, metrics }
    }

    /// Returns the number of processors the tick was delivered to.
    pub fn on_tick(&self, tick: PriceTick) -> usize {
        let mailboxes = self.registry.mailboxes(&tick.symbol);
        if mailboxes.is_empty() {
            trace!(symbol = %tick.symbol, "No processors for symbol, discarding tick");
            return 0;
        }

        let mut delivered = 0;
        for mailbox in &mailboxes {
            match mailbox.try_send(ProcessorCommand::Tick(tick.clone())) {
                Ok(()) => {
                    delivered += 1;
                    self.metrics.inc_ticks_dispatched();
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.metrics.inc_ticks_dropped();
                    debug!(symbol = %tick.symbol, "Dropping tick: processor mailbox full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Processor stopped and is being removed
                }
            }
        }
        delivered
    }

    /// Dispatch ticks until shutdown or until every feed sender is gone.
    pub async fn run(&self, mut receiver: TickReceiver, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Tick dispatcher started");
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping dispatcher");
                        break;
                    }
                }

                tick = receiver.recv() => {
                    match tick {
                        Some(tick) => {
                            self.on_tick(tick);
                        }
                        None => {
                            info!("Tick channel closed, stopping dispatcher");
                            break;
                        }
                    }
                }
            }
        }
    }
}
