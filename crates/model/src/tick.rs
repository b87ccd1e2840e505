use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One observed trade price for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: Decimal,
    /// Trade time reported by the exchange.
    pub timestamp_ms: i64,
    /// Aggregate trade id, increasing per symbol.
    pub trade_id: u64,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, price: Decimal, timestamp_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp_ms,
            trade_id: 0,
        }
    }
}
