//! Trailing stop-loss engine.
//!
//! Watches trade prices for every symbol with an open stop-loss order and
//! moves the stop up behind the market by cancelling the order and placing a
//! replacement with a higher stop.
//!
//! # Components
//!
//! - [`evaluate`]: pure reorder decision for one order and one tick
//! - [`OrderProcessor`]: lifecycle of one order (check, cancel, recreate)
//! - [`MonitorRegistry`]: order and symbol directory, one worker task per
//!   processor, feed subscriptions
//! - [`TickDispatcher`]: non-blocking fan-out of ticks to processors
//! - [`DryRunExchange`]: simulated cancels and creates for rehearsal
//!
//! # Example
//!
//! ```ignore
//! let registry = MonitorRegistry::new(exchange, feed, config, metrics);
//! for order in open_orders {
//!     registry.register(order);
//! }
//! TickDispatcher::new(registry).run(tick_rx, shutdown_rx).await;
//! ```

mod config;
mod dispatcher;
mod dry_run;
mod error;
mod policy;
mod processor;
mod registry;

#[cfg(test)]
mod mock;

pub use config::{ConfigError, TrailingConfig};
pub use dispatcher::TickDispatcher;
pub use dry_run::DryRunExchange;
pub use error::{Operation, ProcessorError};
pub use policy::{evaluate, fit_to_tick, Decision, PolicyError};
pub use processor::{OrderProcessor, ProcessorState, TickOutcome};
pub use registry::MonitorRegistry;
