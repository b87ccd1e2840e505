//! Scripted exchange and feed doubles for tests.

use async_trait::async_trait;
use connector_core::{ExchangeClient, ExchangeError, TickFeed};
use model::{NewStopOrder, OrderSide, OrderState, OrderStatus, OrderType};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeCall {
    ListOpen,
    Query { symbol: String, order_id: u64 },
    Cancel { symbol: String, order_id: u64 },
    Create(NewStopOrder),
    TickSize { symbol: String },
}

/// Exchange that replays queued responses.
///
/// Without a queued response: cancel reports the order `CANCELED`, create
/// assigns the next id from 1000, query fails with a transport error and the
/// tick size is whatever `set_tick_size` last set (none by default).
pub struct MockExchange {
    calls: Mutex<Vec<ExchangeCall>>,
    open_orders: Mutex<Vec<OrderState>>,
    query_responses: Mutex<VecDeque<Result<OrderState, ExchangeError>>>,
    cancel_responses: Mutex<VecDeque<Result<OrderState, ExchangeError>>>,
    create_responses: Mutex<VecDeque<Result<OrderState, ExchangeError>>>,
    tick_size_responses: Mutex<VecDeque<Result<Option<Decimal>, ExchangeError>>>,
    tick_size: Mutex<Option<Decimal>>,
    next_order_id: AtomicU64,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            open_orders: Mutex::new(Vec::new()),
            query_responses: Mutex::new(VecDeque::new()),
            cancel_responses: Mutex::new(VecDeque::new()),
            create_responses: Mutex::new(VecDeque::new()),
            tick_size_responses: Mutex::new(VecDeque::new()),
            tick_size: Mutex::new(None),
            next_order_id: AtomicU64::new(1000),
        }
    }

    pub fn set_open_orders(&self, orders: Vec<OrderState>) {
        *self.open_orders.lock() = orders;
    }

    pub fn push_query(&self, response: Result<OrderState, ExchangeError>) {
        self.query_responses.lock().push_back(response);
    }

    pub fn push_cancel(&self, response: Result<OrderState, ExchangeError>) {
        self.cancel_responses.lock().push_back(response);
    }

    pub fn push_create(&self, response: Result<OrderState, ExchangeError>) {
        self.create_responses.lock().push_back(response);
    }

    pub fn set_tick_size(&self, tick_size: Option<Decimal>) {
        *self.tick_size.lock() = tick_size;
    }

    pub fn push_tick_size(&self, response: Result<Option<Decimal>, ExchangeError>) {
        self.tick_size_responses.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.calls.lock().clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ExchangeCall::Cancel { .. }))
            .count()
    }

    pub fn create_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ExchangeCall::Create(_)))
            .count()
    }

    pub fn tick_size_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ExchangeCall::TickSize { .. }))
            .count()
    }

    pub fn query_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ExchangeCall::Query { .. }))
            .count()
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn list_open_orders(&self) -> Result<Vec<OrderState>, ExchangeError> {
        self.calls.lock().push(ExchangeCall::ListOpen);
        Ok(self.open_orders.lock().clone())
    }

    async fn query_order(&self, symbol: &str, order_id: u64) -> Result<OrderState, ExchangeError> {
        self.calls.lock().push(ExchangeCall::Query {
            symbol: symbol.to_string(),
            order_id,
        });
        self.query_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ExchangeError::Transport("no scripted response".into())))
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderState, ExchangeError> {
        self.calls.lock().push(ExchangeCall::Cancel {
            symbol: symbol.to_string(),
            order_id,
        });
        self.cancel_responses.lock().pop_front().unwrap_or_else(|| {
            let mut state = stop_order(symbol, order_id, Decimal::ZERO, Decimal::ZERO);
            state.status = OrderStatus::Canceled;
            Ok(state)
        })
    }

    async fn create_order(&self, order: &NewStopOrder) -> Result<OrderState, ExchangeError> {
        self.calls.lock().push(ExchangeCall::Create(order.clone()));
        self.create_responses.lock().pop_front().unwrap_or_else(|| {
            let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
            let mut state = stop_order(&order.symbol, order_id, order.stop_price, order.quantity);
            state.client_order_id = order.client_order_id.clone();
            Ok(state)
        })
    }

    async fn price_tick_size(&self, symbol: &str) -> Result<Option<Decimal>, ExchangeError> {
        self.calls.lock().push(ExchangeCall::TickSize {
            symbol: symbol.to_string(),
        });
        self.tick_size_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(*self.tick_size.lock()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCall {
    Subscribe(String),
    Unsubscribe(String),
}

/// Feed that only records subscription changes.
#[derive(Default)]
pub struct MockFeed {
    calls: Mutex<Vec<FeedCall>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<FeedCall> {
        self.calls.lock().clone()
    }

    pub fn subscribe_count(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == FeedCall::Subscribe(symbol.to_string()))
            .count()
    }

    pub fn unsubscribe_count(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == FeedCall::Unsubscribe(symbol.to_string()))
            .count()
    }
}

impl TickFeed for MockFeed {
    fn subscribe(&self, symbol: &str) {
        self.calls.lock().push(FeedCall::Subscribe(symbol.to_string()));
    }

    fn unsubscribe(&self, symbol: &str) {
        self.calls.lock().push(FeedCall::Unsubscribe(symbol.to_string()));
    }
}

/// An open SELL stop-loss order with nothing executed.
pub fn stop_order(symbol: &str, order_id: u64, stop_price: Decimal, qty: Decimal) -> OrderState {
    OrderState {
        order_id,
        client_order_id: format!("test_{order_id}"),
        symbol: symbol.to_string(),
        order_type: OrderType::StopLoss,
        side: OrderSide::Sell,
        price: Decimal::ZERO,
        stop_price,
        orig_qty: qty,
        executed_qty: Decimal::ZERO,
        status: OrderStatus::New,
        updated_at_ms: 0,
    }
}

pub fn with_status(mut state: OrderState, status: OrderStatus) -> OrderState {
    state.status = status;
    state
}
