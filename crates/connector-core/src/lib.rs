//! Interfaces between the trailing monitor and the outside world.
//!
//! - [`ExchangeClient`]: order queries and order placement
//! - [`TickFeed`]: per-symbol trade price subscriptions
//!
//! Both are object safe; the monitor holds them as `Arc<dyn ...>` so the
//! live Binance implementations, the dry-run wrapper and test doubles are
//! interchangeable.

use async_trait::async_trait;
use model::{NewStopOrder, OrderState, PriceTick};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure of a single exchange call.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Network, timeout or HTTP level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Request was throttled by the exchange.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Exchange rejected the request.
    #[error("exchange error {code}: {message}")]
    Api { code: i32, message: String },

    /// The order id is unknown to the exchange (already gone).
    #[error("order not found")]
    OrderNotFound,

    /// Credentials missing or rejected.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Response could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ExchangeError {
    pub fn is_order_not_found(&self) -> bool {
        matches!(self, Self::OrderNotFound)
    }

    /// Transient failures that a later tick may succeed on.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited { .. })
    }
}

/// Order operations the monitor needs from an exchange.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// All open orders on the account, every symbol.
    async fn list_open_orders(&self) -> Result<Vec<OrderState>, ExchangeError>;

    /// Authoritative state of one order.
    async fn query_order(&self, symbol: &str, order_id: u64) -> Result<OrderState, ExchangeError>;

    /// Cancel one order. Returns the order state reported by the cancel.
    async fn cancel_order(&self, symbol: &str, order_id: u64)
        -> Result<OrderState, ExchangeError>;

    /// Place a stop order. Returns the new order with its assigned id.
    async fn create_order(&self, order: &NewStopOrder) -> Result<OrderState, ExchangeError>;

    /// Price increment accepted for stop prices on `symbol`, if the exchange
    /// enforces one.
    async fn price_tick_size(&self, symbol: &str) -> Result<Option<Decimal>, ExchangeError>;
}

/// Market data feed errors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Subscription control for a trade price feed.
///
/// Ticks are not returned from these calls; the feed pushes them into the
/// [`TickSender`] it was built with. Both calls must be cheap and must not
/// block, since the monitor issues them while holding its registry lock.
pub trait TickFeed: Send + Sync {
    /// Start delivering ticks for `symbol`. Subscribing twice is a no-op.
    fn subscribe(&self, symbol: &str);

    /// Stop delivering ticks for `symbol`. Best effort; ticks already in
    /// flight may still arrive.
    fn unsubscribe(&self, symbol: &str);
}

pub type TickSender = mpsc::Sender<PriceTick>;
pub type TickReceiver = mpsc::Receiver<PriceTick>;

pub fn create_tick_channel(capacity: usize) -> (TickSender, TickReceiver) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ExchangeError::Transport("reset".into()).is_retryable());
        assert!(ExchangeError::RateLimited { retry_after_ms: 10 }.is_retryable());
        assert!(!ExchangeError::OrderNotFound.is_retryable());
        assert!(!ExchangeError::Api {
            code: -1013,
            message: "Filter failure".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_order_not_found() {
        assert!(ExchangeError::OrderNotFound.is_order_not_found());
        assert!(!ExchangeError::Parse("x".into()).is_order_not_found());
    }
}
