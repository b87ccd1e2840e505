mod bootstrap;

use binance_rest::{ApiCredentials, BinanceRestClient};
use common::{env_or, BinanceEnvironment};
use connector_binance::BinanceTradeFeed;
use connector_core::{create_tick_channel, ExchangeClient};
use metrics::create_metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use trailing_core::{DryRunExchange, MonitorRegistry, TickDispatcher, TrailingConfig};

use crate::bootstrap::{register_open_orders, run_resync, StartupError};

/// Interval for periodic health status logging.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Capacity of the channel shared by all trade streams.
const TICK_CHANNEL_CAPACITY: usize = 4096;

const DEFAULT_RECV_WINDOW_MS: u64 = 5000;
const DEFAULT_RESYNC_INTERVAL_MS: u64 = 60_000;

#[tokio::main]
async fn main() {
    common::init_logging();

    if let Err(e) = run().await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = TrailingConfig::from_env()?;
    let environment = BinanceEnvironment::from_env()?;
    let recv_window_ms = env_or("BINANCE_RECV_WINDOW_MS", DEFAULT_RECV_WINDOW_MS)?;
    let resync_interval = Duration::from_millis(env_or(
        "TRAILING_RESYNC_INTERVAL_MS",
        DEFAULT_RESYNC_INTERVAL_MS,
    )?);

    info!(
        environment = %environment,
        move_up_margin_pct = %config.move_up_margin_pct,
        static_threshold = %config.static_threshold,
        percentage_threshold = %config.percentage_threshold,
        dry_run = config.dry_run,
        "Starting trailing stop manager"
    );
    if environment.is_production() && !config.dry_run {
        warn!("Running against PRODUCTION with live order changes");
    }

    let credentials = ApiCredentials::from_env()?;
    let rest = Arc::new(
        BinanceRestClient::with_environment(credentials, environment)?
            .with_recv_window_ms(recv_window_ms),
    );
    rest.sync_time().await?;

    let exchange: Arc<dyn ExchangeClient> = if config.dry_run {
        info!("Dry run enabled, cancels and creates are simulated");
        Arc::new(DryRunExchange::new(rest.clone()))
    } else {
        rest.clone()
    };

    let metrics = create_metrics();
    let (tick_tx, tick_rx) = create_tick_channel(TICK_CHANNEL_CAPACITY);
    let feed = Arc::new(BinanceTradeFeed::new(environment, tick_tx, metrics.clone()));
    let registry = MonitorRegistry::new(exchange.clone(), feed.clone(), config, metrics.clone());

    let open_orders = exchange.list_open_orders().await?;
    let summary = register_open_orders(&registry, open_orders);
    info!(
        open_orders = summary.open_orders,
        stop_orders = summary.stop_orders,
        registered = summary.registered,
        symbols = registry.symbols().len(),
        "Open orders loaded"
    );
    if summary.registered == 0 {
        info!("No stop-loss orders to trail yet, waiting for resync");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating shutdown");
            let _ = shutdown_tx_clone.send(true);
        }
    });

    let health_metrics = metrics.clone();
    let health_registry = registry.clone();
    let mut health_shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let snapshot = health_metrics.snapshot();
                    info!(
                        status = %snapshot.health_status(),
                        tracked_orders = health_registry.len(),
                        ticks = snapshot.ticks_received,
                        ticks_per_sec = format!("{:.1}", snapshot.ticks_per_second),
                        dropped = snapshot.ticks_dropped,
                        reorders = snapshot.reorders_completed,
                        create_failures = snapshot.create_failures,
                        reconnects = snapshot.reconnect_attempts,
                        "Health check"
                    );
                }
                changed = health_shutdown_rx.changed() => {
                    if changed.is_err() || *health_shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    let resync_handle = tokio::spawn(run_resync(
        exchange.clone(),
        registry.clone(),
        resync_interval,
        shutdown_tx.subscribe(),
    ));

    let dispatcher = TickDispatcher::new(registry.clone());
    dispatcher.run(tick_rx, shutdown_rx).await;

    let _ = shutdown_tx.send(true);
    let _ = resync_handle.await;
    registry.shutdown();
    feed.shutdown();

    println!("\n{}", metrics.snapshot());
    info!("Shutdown complete");
    Ok(())
}
