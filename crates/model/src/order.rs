//! Order types, status enums and the order snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    StopLossLimit,
    TakeProfit,
    TakeProfitLimit,
    LimitMaker,
}

impl OrderType {
    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s {
            "MARKET" => Some(Self::Market),
            "LIMIT" => Some(Self::Limit),
            "STOP_LOSS" => Some(Self::StopLoss),
            "STOP_LOSS_LIMIT" => Some(Self::StopLossLimit),
            "TAKE_PROFIT" => Some(Self::TakeProfit),
            "TAKE_PROFIT_LIMIT" => Some(Self::TakeProfitLimit),
            "LIMIT_MAKER" => Some(Self::LimitMaker),
            _ => None,
        }
    }

    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
            Self::StopLoss => "STOP_LOSS",
            Self::StopLossLimit => "STOP_LOSS_LIMIT",
            Self::TakeProfit => "TAKE_PROFIT",
            Self::TakeProfitLimit => "TAKE_PROFIT_LIMIT",
            Self::LimitMaker => "LIMIT_MAKER",
        }
    }

    /// Stop-loss and stop-loss-limit orders are the ones we trail.
    pub fn is_stop_loss(&self) -> bool {
        matches!(self, Self::StopLoss | Self::StopLossLimit)
    }
}

/// How the monitor should treat an order in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Still resting on the book; keep monitoring.
    Open,
    /// No further transitions expected; stop monitoring.
    Closed,
    /// Status we do not know how to interpret.
    Unexpected,
}

/// Order status as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Expired,
    /// Any status string this build does not recognize.
    Unknown(String),
}

impl OrderStatus {
    /// Convert from Binance string representation. Never fails; unknown
    /// values are preserved for reporting.
    pub fn from_binance_str(s: &str) -> Self {
        match s {
            "NEW" => Self::New,
            "PARTIALLY_FILLED" => Self::PartiallyFilled,
            "FILLED" => Self::Filled,
            "CANCELED" => Self::Canceled,
            "PENDING_CANCEL" => Self::PendingCancel,
            "REJECTED" => Self::Rejected,
            "EXPIRED" => Self::Expired,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_binance_str(&self) -> &str {
        match self {
            Self::New => "NEW",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::PendingCancel => "PENDING_CANCEL",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
            Self::Unknown(raw) => raw,
        }
    }

    /// Pending-cancel counts as closed: the order is on its way out and
    /// must not be replaced a second time.
    pub fn class(&self) -> StatusClass {
        match self {
            Self::New | Self::PartiallyFilled => StatusClass::Open,
            Self::Filled
            | Self::Canceled
            | Self::PendingCancel
            | Self::Rejected
            | Self::Expired => StatusClass::Closed,
            Self::Unknown(_) => StatusClass::Unexpected,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.class() == StatusClass::Closed
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_binance_str())
    }
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good Till Canceled - remains active until filled or canceled.
    GTC,
    /// Immediate Or Cancel - fill what's possible immediately, cancel rest.
    IOC,
    /// Fill Or Kill - must be filled completely immediately or canceled.
    FOK,
}

impl TimeInForce {
    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s {
            "GTC" => Some(Self::GTC),
            "IOC" => Some(Self::IOC),
            "FOK" => Some(Self::FOK),
            _ => None,
        }
    }

    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::GTC => "GTC",
            Self::IOC => "IOC",
            Self::FOK => "FOK",
        }
    }
}

/// Snapshot of one exchange order.
///
/// Snapshots are replaced wholesale whenever the exchange is queried; the
/// monitor never patches individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    /// Exchange-assigned order id.
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    /// Limit price; zero for stop-loss market orders.
    pub price: Decimal,
    pub stop_price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub status: OrderStatus,
    /// Last update time reported by the exchange.
    pub updated_at_ms: i64,
}

impl OrderState {
    /// Quantity a replacement order has to cover.
    ///
    /// Clamped at zero in case the exchange reports more executed than
    /// ordered.
    pub fn remaining_qty(&self) -> Decimal {
        (self.orig_qty - self.executed_qty).max(Decimal::ZERO)
    }

    /// Whether the monitor should take charge of this order.
    pub fn is_trailable(&self) -> bool {
        self.order_type.is_stop_loss()
    }
}

/// Parameters of a replacement stop order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStopOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub stop_price: Decimal,
    pub time_in_force: TimeInForce,
    pub client_order_id: String,
}

impl NewStopOrder {
    /// A good-till-cancelled SELL stop-loss order.
    pub fn sell_stop_loss(
        symbol: impl Into<String>,
        quantity: Decimal,
        stop_price: Decimal,
        client_order_id: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Sell,
            order_type: OrderType::StopLoss,
            quantity,
            stop_price,
            time_in_force: TimeInForce::GTC,
            client_order_id: client_order_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stop_order(orig: Decimal, executed: Decimal) -> OrderState {
        OrderState {
            order_id: 1,
            client_order_id: "c1".into(),
            symbol: "BTCUSDT".into(),
            order_type: OrderType::StopLoss,
            side: OrderSide::Sell,
            price: Decimal::ZERO,
            stop_price: dec!(100),
            orig_qty: orig,
            executed_qty: executed,
            status: OrderStatus::New,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn test_order_side_conversion() {
        assert_eq!(OrderSide::from_binance_str("SELL"), Some(OrderSide::Sell));
        assert_eq!(OrderSide::from_binance_str("sell"), None);
        assert_eq!(OrderSide::Buy.as_binance_str(), "BUY");
    }

    #[test]
    fn test_stop_loss_types() {
        assert!(OrderType::StopLoss.is_stop_loss());
        assert!(OrderType::StopLossLimit.is_stop_loss());
        assert!(!OrderType::TakeProfit.is_stop_loss());
        assert!(!OrderType::Limit.is_stop_loss());
        assert_eq!(
            OrderType::from_binance_str("STOP_LOSS_LIMIT"),
            Some(OrderType::StopLossLimit)
        );
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(OrderStatus::New.class(), StatusClass::Open);
        assert_eq!(OrderStatus::PartiallyFilled.class(), StatusClass::Open);
        for closed in [
            OrderStatus::Filled,
            OrderStatus::Canceled,
            OrderStatus::PendingCancel,
            OrderStatus::Rejected,
            OrderStatus::Expired,
        ] {
            assert_eq!(closed.class(), StatusClass::Closed, "{closed}");
        }
        assert_eq!(
            OrderStatus::from_binance_str("EXPIRED_IN_MATCH").class(),
            StatusClass::Unexpected
        );
    }

    #[test]
    fn test_unknown_status_keeps_raw_value() {
        let status = OrderStatus::from_binance_str("SOMETHING_NEW");
        assert_eq!(status, OrderStatus::Unknown("SOMETHING_NEW".into()));
        assert_eq!(status.to_string(), "SOMETHING_NEW");
    }

    #[test]
    fn test_remaining_qty() {
        assert_eq!(stop_order(dec!(1.0), dec!(0)).remaining_qty(), dec!(1.0));
        assert_eq!(stop_order(dec!(1.0), dec!(0.3)).remaining_qty(), dec!(0.7));
        assert_eq!(stop_order(dec!(1.0), dec!(1.2)).remaining_qty(), dec!(0));
    }

    #[test]
    fn test_sell_stop_loss_defaults() {
        let order = NewStopOrder::sell_stop_loss("ETHUSDT", dec!(2), dec!(1500), "tsl_1");
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.order_type, OrderType::StopLoss);
        assert_eq!(order.time_in_force, TimeInForce::GTC);
    }
}
