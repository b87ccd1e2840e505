//! Startup registration and periodic reconciliation with the exchange.

use binance_rest::{AuthError, BinanceRestError};
use common::{EnvVarError, ParseEnvironmentError};
use connector_core::{ExchangeClient, ExchangeError};
use model::OrderState;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use trailing_core::{ConfigError, MonitorRegistry};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Env(#[from] EnvVarError),

    #[error(transparent)]
    Environment(#[from] ParseEnvironmentError),

    #[error("credentials error: {0}")]
    Auth(#[from] AuthError),

    #[error("REST API error: {0}")]
    Rest(#[from] BinanceRestError),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSummary {
    pub open_orders: usize,
    pub stop_orders: usize,
    pub registered: usize,
}

/// Register every stop-loss and stop-loss-limit order in `orders`.
pub fn register_open_orders(
    registry: &Arc<MonitorRegistry>,
    orders: Vec<OrderState>,
) -> RegisterSummary {
    let mut summary = RegisterSummary {
        open_orders: orders.len(),
        ..Default::default()
    };
    for order in orders {
        if !order.is_trailable() {
            continue;
        }
        summary.stop_orders += 1;
        if registry.register(order) {
            summary.registered += 1;
        }
    }
    summary
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResyncSummary {
    pub registered: usize,
    pub skipped_busy: usize,
    pub checks_requested: usize,
}

/// Bring the registry in line with the exchange's open orders.
///
/// New stop orders are registered, except on symbols where a processor is
/// mid-command: its replacement order may already be listed before the
/// registry is re-keyed to it. Tracked orders missing from the listing get a
/// status check so their processors can stop.
pub fn reconcile(registry: &Arc<MonitorRegistry>, open_orders: Vec<OrderState>) -> ResyncSummary {
    let mut summary = ResyncSummary::default();
    let open_ids: HashSet<u64> = open_orders.iter().map(|o| o.order_id).collect();

    for order in open_orders {
        if !order.is_trailable() || registry.contains(order.order_id) {
            continue;
        }
        if registry.is_busy(&order.symbol) {
            debug!(symbol = %order.symbol, order_id = order.order_id, "Processor busy, deferring registration");
            summary.skipped_busy += 1;
            continue;
        }
        if registry.register(order) {
            summary.registered += 1;
        }
    }

    for order_id in registry.tracked_order_ids() {
        if !open_ids.contains(&order_id) && registry.request_status_check(order_id) {
            summary.checks_requested += 1;
        }
    }

    summary
}

/// Reconcile every `interval` until shutdown.
pub async fn run_resync(
    exchange: Arc<dyn ExchangeClient>,
    registry: Arc<MonitorRegistry>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; startup already registered
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match exchange.list_open_orders().await {
                    Ok(orders) => {
                        let summary = reconcile(&registry, orders);
                        if summary != ResyncSummary::default() {
                            info!(
                                registered = summary.registered,
                                skipped_busy = summary.skipped_busy,
                                checks_requested = summary.checks_requested,
                                tracked = registry.len(),
                                "Resynced open orders"
                            );
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to list open orders for resync"),
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
