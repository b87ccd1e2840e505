//! Exchange wrapper that simulates order changes.

use async_trait::async_trait;
use connector_core::{ExchangeClient, ExchangeError};
use model::{NewStopOrder, OrderState, OrderStatus, StatusClass};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Starting point for simulated order ids, well clear of real ones.
const SIMULATED_ORDER_ID_START: u64 = 9_000_000_000_000;

/// Forwards reads to the real exchange and simulates cancels and creates.
///
/// Simulated orders are kept locally so the monitor can keep trailing them:
/// queries and open-order listings see the simulated book, not the real one.
pub struct DryRunExchange {
    inner: Arc<dyn ExchangeClient>,
    next_order_id: AtomicU64,
    book: Mutex<SimulatedBook>,
}

#[derive(Default)]
struct SimulatedBook {
    /// Real orders cancelled in simulation.
    cancelled: HashSet<u64>,
    /// Orders created in simulation, by id.
    created: HashMap<u64, OrderState>,
}

impl DryRunExchange {
    pub fn new(inner: Arc<dyn ExchangeClient>) -> Self {
        Self {
            inner,
            next_order_id: AtomicU64::new(SIMULATED_ORDER_ID_START),
            book: Mutex::new(SimulatedBook::default()),
        }
    }
}

#[async_trait]
impl ExchangeClient for DryRunExchange {
    async fn list_open_orders(&self) -> Result<Vec<OrderState>, ExchangeError> {
        let mut orders = self.inner.list_open_orders().await?;
        let book = self.book.lock();
        orders.retain(|o| !book.cancelled.contains(&o.order_id));
        orders.extend(
            book.created
                .values()
                .filter(|o| o.status.class() == StatusClass::Open)
                .cloned(),
        );
        Ok(orders)
    }

    async fn query_order(&self, symbol: &str, order_id: u64) -> Result<OrderState, ExchangeError> {
        if let Some(order) = self.book.lock().created.get(&order_id) {
            return Ok(order.clone());
        }
        let mut order = self.inner.query_order(symbol, order_id).await?;
        let cancelled = self.book.lock().cancelled.contains(&order_id);
        if cancelled && order.status.class() == StatusClass::Open {
            order.status = OrderStatus::Canceled;
        }
        Ok(order)
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderState, ExchangeError> {
        let simulated = self.book.lock().created.get(&order_id).cloned();
        let mut order = match simulated {
            Some(order) => order,
            None => self.inner.query_order(symbol, order_id).await?,
        };

        if order.status.is_terminal() {
            return Err(ExchangeError::OrderNotFound);
        }

        info!(symbol = %symbol, order_id, "[DRY RUN] Would cancel order");
        order.status = OrderStatus::Canceled;
        order.updated_at_ms = now_ms();

        let mut book = self.book.lock();
        match book.created.get_mut(&order_id) {
            Some(created) => created.status = OrderStatus::Canceled,
            None => {
                book.cancelled.insert(order_id);
            }
        }
        Ok(order)
    }

    async fn create_order(&self, order: &NewStopOrder) -> Result<OrderState, ExchangeError> {
        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        info!(
            symbol = %order.symbol,
            order_id,
            side = order.side.as_binance_str(),
            order_type = order.order_type.as_binance_str(),
            quantity = %order.quantity,
            stop_price = %order.stop_price,
            "[DRY RUN] Would place order"
        );

        let state = OrderState {
            order_id,
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            order_type: order.order_type,
            side: order.side,
            price: Decimal::ZERO,
            stop_price: order.stop_price,
            orig_qty: order.quantity,
            executed_qty: Decimal::ZERO,
            status: OrderStatus::New,
            updated_at_ms: now_ms(),
        };
        self.book.lock().created.insert(order_id, state.clone());
        Ok(state)
    }

    async fn price_tick_size(&self, symbol: &str) -> Result<Option<Decimal>, ExchangeError> {
        self.inner.price_tick_size(symbol).await
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
