//! Shared infrastructure for the trailing stop workspace.
//!
//! - **Environment**: production / testnet endpoint selection
//! - **Backoff**: reconnect delays for the market data feed
//! - **Env vars**: typed lookup of configuration values
//! - **Logging**: `tracing` subscriber setup for the binaries

mod backoff;
mod env;
mod environment;

pub use backoff::ExponentialBackoff;
pub use env::{env_or, env_parse, load_dotenv, EnvVarError};
pub use environment::{BinanceEnvironment, ParseEnvironmentError};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Calling this
/// more than once is harmless; later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
