//! Lifecycle of one trailed order.

use connector_core::{ExchangeClient, ExchangeError};
use metrics::SharedMetrics;
use model::{NewStopOrder, OrderState, OrderStatus, PriceTick, StatusClass};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::config::TrailingConfig;
use crate::error::{Operation, ProcessorError};
use crate::policy::{evaluate, fit_to_tick, Decision, PolicyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Active,
    /// The exchange reported the order closed. Terminal.
    Stopped,
}

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing sent to the exchange, or the command was throttled.
    Idle,
    /// Status refreshed and the order is still open.
    StillOpen,
    /// The order was replaced; the processor now tracks `new_order_id`.
    Reordered {
        old_order_id: u64,
        new_order_id: u64,
    },
    /// The order is closed and the processor stopped.
    Stopped,
}

/// Owns one order snapshot and drives it through reorders until the
/// exchange reports it closed.
///
/// Not synchronized: the registry runs each processor on its own task and
/// feeds it through a mailbox, so `&mut self` is the only access path.
pub struct OrderProcessor {
    order: OrderState,
    state: ProcessorState,
    exchange: Arc<dyn ExchangeClient>,
    config: Arc<TrailingConfig>,
    metrics: SharedMetrics,
    /// Symbol price increment, loaded before the first replacement.
    tick_size: Option<Option<Decimal>>,
    last_reorder_at: Option<Instant>,
    last_check_at: Option<Instant>,
    last_rejected_at: Option<Instant>,
}

impl OrderProcessor {
    pub fn new(
        order: OrderState,
        exchange: Arc<dyn ExchangeClient>,
        config: Arc<TrailingConfig>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            order,
            state: ProcessorState::Active,
            exchange,
            config,
            metrics,
            tick_size: None,
            last_reorder_at: None,
            last_check_at: None,
            last_rejected_at: None,
        }
    }

    pub fn order(&self) -> &OrderState {
        &self.order
    }

    pub fn order_id(&self) -> u64 {
        self.order.order_id
    }

    pub fn symbol(&self) -> &str {
        &self.order.symbol
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ProcessorState::Active
    }

    pub async fn on_tick(&mut self, tick: &PriceTick) -> Result<TickOutcome, ProcessorError> {
        if !self.is_active() {
            return Ok(TickOutcome::Idle);
        }

        trace!(
            symbol = %tick.symbol,
            order_id = self.order.order_id,
            price = %tick.price,
            stop_price = %self.order.stop_price,
            "Tick"
        );

        let decision = match evaluate(&self.order, tick, &self.config) {
            Ok(decision) => decision,
            Err(e) => return self.rejected(e),
        };

        match decision {
            Decision::NoOp => Ok(TickOutcome::Idle),
            Decision::CheckOrder => {
                if within(self.last_check_at, self.config.min_check_interval) {
                    return Ok(TickOutcome::Idle);
                }
                debug!(
                    symbol = %self.order.symbol,
                    order_id = self.order.order_id,
                    price = %tick.price,
                    stop_price = %self.order.stop_price,
                    "Price at or below stop, checking order"
                );
                self.check_status().await
            }
            Decision::Reorder { new_stop_price } => {
                if within(self.last_reorder_at, self.config.min_reorder_interval) {
                    debug!(
                        symbol = %self.order.symbol,
                        order_id = self.order.order_id,
                        "Reorder suppressed, last reorder too recent"
                    );
                    return Ok(TickOutcome::Idle);
                }
                debug!(
                    symbol = %self.order.symbol,
                    order_id = self.order.order_id,
                    price = %tick.price,
                    stop_price = %self.order.stop_price,
                    new_stop_price = %new_stop_price,
                    "Threshold crossed, replacing order"
                );
                self.replace(tick.price, new_stop_price).await
            }
        }
    }

    /// Query the order and classify its status.
    pub async fn check_status(&mut self) -> Result<TickOutcome, ProcessorError> {
        if !self.is_active() {
            return Ok(TickOutcome::Idle);
        }

        self.metrics.inc_status_checks();
        self.last_check_at = Some(Instant::now());

        let refreshed = self
            .exchange
            .query_order(&self.order.symbol, self.order.order_id)
            .await
            .map_err(|e| self.exchange_error(Operation::Query, e))?;
        self.order = refreshed;
        self.classify()
    }

    fn classify(&mut self) -> Result<TickOutcome, ProcessorError> {
        match self.order.status.class() {
            StatusClass::Open => Ok(TickOutcome::StillOpen),
            StatusClass::Closed => {
                self.stop();
                Ok(TickOutcome::Stopped)
            }
            StatusClass::Unexpected => Err(ProcessorError::UnexpectedStatus {
                symbol: self.order.symbol.clone(),
                order_id: self.order.order_id,
                status: self.order.status.to_string(),
            }),
        }
    }

    /// Cancel, confirm, create. Never creates unless the cancel is confirmed,
    /// and never cancels for a stop the price filter would reject.
    async fn replace(
        &mut self,
        price: Decimal,
        new_stop_price: Decimal,
    ) -> Result<TickOutcome, ProcessorError> {
        let quantity = self.order.remaining_qty();
        if quantity <= Decimal::ZERO {
            return self.check_status().await;
        }

        let symbol = self.order.symbol.clone();
        let tick_size = self.tick_size(&symbol).await?;
        let new_stop_price = match fit_to_tick(&symbol, price, new_stop_price, tick_size) {
            Ok(stop) => stop,
            Err(e) => return self.rejected(e),
        };
        if new_stop_price == self.order.stop_price {
            debug!(
                symbol = %symbol,
                order_id = self.order.order_id,
                stop_price = %new_stop_price,
                "Stop already on the nearest tick, nothing to move"
            );
            return Ok(TickOutcome::Idle);
        }

        self.metrics.inc_reorders_attempted();
        let old_order_id = self.order.order_id;

        let cancel_result = self.exchange.cancel_order(&symbol, old_order_id).await;
        let cancelled = match cancel_result {
            Ok(response) => response,
            Err(e) => {
                self.metrics.inc_cancel_failures();
                if e.is_order_not_found() {
                    warn!(
                        symbol = %symbol,
                        order_id = old_order_id,
                        "Order not found on cancel, refreshing status"
                    );
                    return self.check_status().await;
                }
                return Err(self.exchange_error(Operation::Cancel, e));
            }
        };

        let confirmed = if cancelled.status == OrderStatus::Canceled {
            cancelled
        } else {
            self.exchange
                .query_order(&symbol, old_order_id)
                .await
                .map_err(|e| self.exchange_error(Operation::Query, e))?
        };

        match confirmed.status {
            OrderStatus::Canceled => {}
            OrderStatus::Filled | OrderStatus::Expired | OrderStatus::Rejected => {
                info!(
                    symbol = %symbol,
                    order_id = old_order_id,
                    status = %confirmed.status,
                    "Order closed before it could be replaced"
                );
                self.order = confirmed;
                self.stop();
                return Ok(TickOutcome::Stopped);
            }
            status => {
                self.metrics.inc_cancel_failures();
                return Err(ProcessorError::CancelNotConfirmed {
                    symbol,
                    order_id: old_order_id,
                    status: status.to_string(),
                });
            }
        }

        let request = NewStopOrder::sell_stop_loss(
            symbol.clone(),
            quantity,
            new_stop_price,
            client_order_id(),
        );

        let create_result = self.exchange.create_order(&request).await;
        match create_result {
            Ok(created) => {
                let new_order_id = created.order_id;
                info!(
                    symbol = %symbol,
                    old_order_id,
                    new_order_id,
                    old_stop_price = %self.order.stop_price,
                    new_stop_price = %created.stop_price,
                    quantity = %quantity,
                    "Stop moved up"
                );
                self.order = created;
                self.last_reorder_at = Some(Instant::now());
                self.metrics.inc_reorders_completed();
                Ok(TickOutcome::Reordered {
                    old_order_id,
                    new_order_id,
                })
            }
            Err(source) => {
                self.metrics.inc_create_failures();
                error!(
                    symbol = %symbol,
                    cancelled_order_id = old_order_id,
                    quantity = %quantity,
                    stop_price = %new_stop_price,
                    error = %source,
                    "Replacement order failed after cancel, position has no stop"
                );
                Err(ProcessorError::Unprotected {
                    symbol,
                    cancelled_order_id: old_order_id,
                    quantity,
                    stop_price: new_stop_price,
                    source,
                })
            }
        }
    }

    async fn tick_size(&mut self, symbol: &str) -> Result<Option<Decimal>, ProcessorError> {
        if let Some(tick_size) = self.tick_size {
            return Ok(tick_size);
        }

        let tick_size = self
            .exchange
            .price_tick_size(symbol)
            .await
            .map_err(|e| self.exchange_error(Operation::PriceFilter, e))?;
        debug!(symbol = %symbol, tick_size = ?tick_size, "Price filter loaded");
        self.tick_size = Some(tick_size);
        Ok(tick_size)
    }

    /// A computed stop that cannot be placed. Reported once per
    /// `min_reorder_interval`; repeats inside the interval are dropped.
    fn rejected(&mut self, error: PolicyError) -> Result<TickOutcome, ProcessorError> {
        if within(self.last_rejected_at, self.config.min_reorder_interval) {
            return Ok(TickOutcome::Idle);
        }
        self.last_rejected_at = Some(Instant::now());
        Err(error.into())
    }

    fn stop(&mut self) {
        if self.state == ProcessorState::Active {
            info!(
                symbol = %self.order.symbol,
                order_id = self.order.order_id,
                status = %self.order.status,
                "Order closed, processor stopped"
            );
        }
        self.state = ProcessorState::Stopped;
    }

    fn exchange_error(&self, operation: Operation, source: ExchangeError) -> ProcessorError {
        ProcessorError::Exchange {
            operation,
            symbol: self.order.symbol.clone(),
            order_id: self.order.order_id,
            source,
        }
    }
}

fn within(last: Option<Instant>, interval: Duration) -> bool {
    last.is_some_and(|at| at.elapsed() < interval)
}

/// Client order id for replacement orders, at most 36 characters.
fn client_order_id() -> String {
    format!("tsl_{}", Uuid::new_v4().simple())
}
