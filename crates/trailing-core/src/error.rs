//! Processor error types.

use connector_core::ExchangeError;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::policy::PolicyError;

/// Exchange operation a processor was performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    Cancel,
    /// Symbol price filter lookup.
    PriceFilter,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Cancel => write!(f, "cancel"),
            Self::PriceFilter => write!(f, "price filter lookup"),
        }
    }
}

/// Failure while handling one command. The processor stays active.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("{operation} failed for {symbol} order {order_id}: {source}")]
    Exchange {
        operation: Operation,
        symbol: String,
        order_id: u64,
        #[source]
        source: ExchangeError,
    },

    /// Status the monitor does not know how to classify.
    #[error("unexpected status {status} for {symbol} order {order_id}")]
    UnexpectedStatus {
        symbol: String,
        order_id: u64,
        status: String,
    },

    /// Cancel returned, but the order is not reported cancelled.
    #[error("cancel of {symbol} order {order_id} not confirmed, status {status}")]
    CancelNotConfirmed {
        symbol: String,
        order_id: u64,
        status: String,
    },

    /// The old order is cancelled and the replacement was rejected.
    #[error(
        "{symbol} order {cancelled_order_id} cancelled but replacement failed \
         (qty {quantity}, stop {stop_price}), position unprotected: {source}"
    )]
    Unprotected {
        symbol: String,
        cancelled_order_id: u64,
        quantity: Decimal,
        stop_price: Decimal,
        #[source]
        source: ExchangeError,
    },

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl ProcessorError {
    /// Errors an operator has to act on, as opposed to attempts that the
    /// next tick simply retries.
    pub fn is_critical(&self) -> bool {
        match self {
            Self::Unprotected { .. } | Self::UnexpectedStatus { .. } | Self::Policy(_) => true,
            Self::Exchange { source, .. } => {
                !source.is_retryable() && !source.is_order_not_found()
            }
            Self::CancelNotConfirmed { .. } => false,
        }
    }
}
