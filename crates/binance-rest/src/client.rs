//! Binance REST API client.

use crate::credentials::ApiCredentials;
use crate::error::BinanceRestError;
use crate::responses::{ExchangeInfoResponse, OrderResponse, ServerTimeResponse};
use crate::signer::RequestSigner;
use crate::transport::Transport;
use async_trait::async_trait;
use common::BinanceEnvironment;
use connector_core::{ExchangeClient, ExchangeError};
use model::{NewStopOrder, OrderState};
use reqwest::Method;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Request timeout for Binance API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `recvWindow` for signed requests.
const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;

/// Binance REST API client with authentication support.
pub struct BinanceRestClient {
    transport: Transport,
    credentials: ApiCredentials,
    environment: BinanceEnvironment,
    recv_window_ms: u64,
    /// Time offset between local clock and Binance server (local - server).
    time_offset_ms: AtomicI64,
}

impl BinanceRestClient {
    /// Create a client for production.
    pub fn new(credentials: ApiCredentials) -> Result<Self, BinanceRestError> {
        Self::with_environment(credentials, BinanceEnvironment::Production)
    }

    /// Create a client for a specific environment.
    pub fn with_environment(
        credentials: ApiCredentials,
        environment: BinanceEnvironment,
    ) -> Result<Self, BinanceRestError> {
        let transport = Transport::new(environment.rest_base_url(), REQUEST_TIMEOUT)?;

        Ok(Self {
            transport,
            credentials,
            environment,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
            time_offset_ms: AtomicI64::new(0),
        })
    }

    /// Override the `recvWindow` sent with signed requests.
    pub fn with_recv_window_ms(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    pub fn environment(&self) -> BinanceEnvironment {
        self.environment
    }

    /// Estimated Binance server time based on the local clock and the last
    /// measured offset.
    pub fn server_timestamp_ms(&self) -> i64 {
        local_timestamp_ms() - self.time_offset_ms.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Time Synchronization
    // ========================================================================

    /// Measure the offset between the local and the server clock.
    ///
    /// Call on startup; signed requests outside `recvWindow` are rejected.
    pub async fn sync_time(&self) -> Result<(), BinanceRestError> {
        let before = std::time::Instant::now();
        let response: ServerTimeResponse = self
            .transport
            .send(Method::GET, "/api/v3/time", None, None)
            .await?;
        let rtt = before.elapsed().as_millis() as i64;

        let local_time = local_timestamp_ms();
        // Estimate server time at midpoint of request
        let offset = local_time - (response.server_time + rtt / 2);
        self.time_offset_ms.store(offset, Ordering::Relaxed);

        tracing::info!(
            server_time = response.server_time,
            offset_ms = offset,
            rtt_ms = rtt,
            "Time synchronized with Binance server"
        );

        Ok(())
    }

    // ========================================================================
    // Symbol Rules
    // ========================================================================

    /// GET /api/v3/exchangeInfo for one symbol; returns its price tick size.
    pub async fn tick_size(&self, symbol: &str) -> Result<Option<Decimal>, BinanceRestError> {
        let query = exchange_info_query(symbol);
        let info: ExchangeInfoResponse = self
            .transport
            .send(Method::GET, "/api/v3/exchangeInfo", Some(&query), None)
            .await?;
        let tick_size = info.price_tick_size(symbol);

        tracing::debug!(symbol = %symbol, tick_size = ?tick_size, "Loaded price filter");

        Ok(tick_size)
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// GET /api/v3/openOrders for every symbol.
    ///
    /// Orders with a type or side this build does not know are skipped with
    /// a warning instead of failing the whole listing.
    pub async fn open_orders(&self) -> Result<Vec<OrderState>, BinanceRestError> {
        let raw: Vec<OrderResponse> = self.signed(Method::GET, "/api/v3/openOrders", &[]).await?;

        let mut orders = Vec::with_capacity(raw.len());
        for response in raw {
            let order_id = response.order_id;
            match response.into_order_state() {
                Ok(state) => orders.push(state),
                Err(e) => tracing::warn!(order_id, error = %e, "Skipping open order"),
            }
        }

        Ok(orders)
    }

    /// GET /api/v3/order by exchange order id.
    pub async fn order(&self, symbol: &str, order_id: u64) -> Result<OrderState, BinanceRestError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let response: OrderResponse = self.signed(Method::GET, "/api/v3/order", &params).await?;
        response.into_order_state()
    }

    /// DELETE /api/v3/order by exchange order id.
    pub async fn cancel(&self, symbol: &str, order_id: u64) -> Result<OrderState, BinanceRestError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];

        tracing::info!(symbol = %symbol, order_id, "Canceling order");

        let response: OrderResponse = self
            .signed(Method::DELETE, "/api/v3/order", &params)
            .await?;
        let state = response.into_order_state()?;

        tracing::info!(
            symbol = %symbol,
            order_id = state.order_id,
            status = %state.status,
            "Order canceled"
        );

        Ok(state)
    }

    /// POST /api/v3/order for a stop order.
    pub async fn place_stop(&self, order: &NewStopOrder) -> Result<OrderState, BinanceRestError> {
        let params = [
            ("symbol", order.symbol.clone()),
            ("side", order.side.as_binance_str().to_string()),
            ("type", order.order_type.as_binance_str().to_string()),
            ("quantity", order.quantity.normalize().to_string()),
            ("stopPrice", order.stop_price.normalize().to_string()),
            (
                "timeInForce",
                order.time_in_force.as_binance_str().to_string(),
            ),
            ("newClientOrderId", order.client_order_id.clone()),
            ("newOrderRespType", "RESULT".to_string()),
        ];

        tracing::info!(
            symbol = %order.symbol,
            side = ?order.side,
            order_type = ?order.order_type,
            quantity = %order.quantity,
            stop_price = %order.stop_price,
            client_order_id = %order.client_order_id,
            "Placing order"
        );

        let response: OrderResponse = self.signed(Method::POST, "/api/v3/order", &params).await?;
        let mut state = response.into_order_state()?;
        if state.stop_price.is_zero() {
            state.stop_price = order.stop_price;
        }

        tracing::info!(
            symbol = %state.symbol,
            order_id = state.order_id,
            status = %state.status,
            "Order placed"
        );

        Ok(state)
    }

    async fn signed<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BinanceRestError> {
        let signer = RequestSigner::new(&self.credentials);
        let query = signer.signed_query(
            params,
            Some(self.recv_window_ms),
            self.server_timestamp_ms(),
        );

        self.transport
            .send(method, path, Some(&query), Some(self.credentials.api_key()))
            .await
    }
}

#[async_trait]
impl ExchangeClient for BinanceRestClient {
    async fn list_open_orders(&self) -> Result<Vec<OrderState>, ExchangeError> {
        Ok(self.open_orders().await?)
    }

    async fn query_order(&self, symbol: &str, order_id: u64) -> Result<OrderState, ExchangeError> {
        Ok(self.order(symbol, order_id).await?)
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderState, ExchangeError> {
        Ok(self.cancel(symbol, order_id).await?)
    }

    async fn create_order(&self, order: &NewStopOrder) -> Result<OrderState, ExchangeError> {
        Ok(self.place_stop(order).await?)
    }

    async fn price_tick_size(&self, symbol: &str) -> Result<Option<Decimal>, ExchangeError> {
        Ok(self.tick_size(symbol).await?)
    }
}

impl std::fmt::Debug for BinanceRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("environment", &self.environment)
            .field("api_key", &self.credentials.api_key())
            .field("recv_window_ms", &self.recv_window_ms)
            .field(
                "time_offset_ms",
                &self.time_offset_ms.load(Ordering::Relaxed),
            )
            .finish()
    }
}

fn exchange_info_query(symbol: &str) -> String {
    format!("symbol={symbol}")
}

fn local_timestamp_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
