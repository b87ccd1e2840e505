//! Binance API response types.

use crate::error::BinanceRestError;
use model::{OrderSide, OrderState, OrderStatus, OrderType};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Response from GET /api/v3/time.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTimeResponse {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

/// Response from GET /api/v3/exchangeInfo.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Symbol filters. Only the price filter matters for stop placement.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize", deserialize_with = "deserialize_decimal_from_str")]
        tick_size: Decimal,
    },
    #[serde(other)]
    Other,
}

impl ExchangeInfoResponse {
    /// `PRICE_FILTER.tickSize` for `symbol`. A zero tick size means the
    /// filter is disabled.
    pub fn price_tick_size(&self, symbol: &str) -> Option<Decimal> {
        self.symbols
            .iter()
            .find(|info| info.symbol == symbol)?
            .filters
            .iter()
            .find_map(|filter| match filter {
                SymbolFilter::Price { tick_size } if !tick_size.is_zero() => Some(*tick_size),
                _ => None,
            })
    }
}

/// Order payload shared by the order endpoints.
///
/// GET /api/v3/order and GET /api/v3/openOrders return every field. DELETE
/// /api/v3/order and POST /api/v3/order (RESULT) omit `time`/`updateTime`
/// and may omit `stopPrice`, so those are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: u64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub price: Decimal,
    #[serde(rename = "origQty", deserialize_with = "deserialize_decimal_from_str")]
    pub orig_qty: Decimal,
    #[serde(
        rename = "executedQty",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub executed_qty: Decimal,
    pub status: String,
    #[serde(rename = "timeInForce")]
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    #[serde(
        rename = "stopPrice",
        default,
        deserialize_with = "deserialize_optional_decimal_from_str"
    )]
    pub stop_price: Option<Decimal>,
    #[serde(rename = "updateTime", default)]
    pub update_time: Option<i64>,
    #[serde(rename = "transactTime", default)]
    pub transact_time: Option<i64>,
}

impl OrderResponse {
    /// Convert into the monitor's snapshot type.
    pub fn into_order_state(self) -> Result<OrderState, BinanceRestError> {
        let order_type = OrderType::from_binance_str(&self.order_type).ok_or_else(|| {
            BinanceRestError::Parse(format!("unknown order type '{}'", self.order_type))
        })?;
        let side = OrderSide::from_binance_str(&self.side)
            .ok_or_else(|| BinanceRestError::Parse(format!("unknown side '{}'", self.side)))?;

        Ok(OrderState {
            order_id: self.order_id,
            client_order_id: self.client_order_id,
            symbol: self.symbol,
            order_type,
            side,
            price: self.price,
            stop_price: self.stop_price.unwrap_or(Decimal::ZERO),
            orig_qty: self.orig_qty,
            executed_qty: self.executed_qty,
            status: OrderStatus::from_binance_str(&self.status),
            updated_at_ms: self.update_time.or(self.transact_time).unwrap_or(0),
        })
    }
}

fn deserialize_decimal_from_str<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    s.parse::<Decimal>().map_err(serde::de::Error::custom)
}

fn deserialize_optional_decimal_from_str<'de, D>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<&str> = Deserialize::deserialize(deserializer)?;
    s.map(|v| v.parse::<Decimal>().map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deserialize_server_time() {
        let json = r#"{"serverTime": 1499827319559}"#;
        let response: ServerTimeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.server_time, 1499827319559);
    }

    #[test]
    fn test_exchange_info_price_filter() {
        let json = r#"{
            "timezone": "UTC",
            "serverTime": 1565246363776,
            "symbols": [{
                "symbol": "ETHBTC",
                "status": "TRADING",
                "baseAsset": "ETH",
                "quoteAsset": "BTC",
                "filters": [
                    {"filterType": "PRICE_FILTER", "minPrice": "0.00000100",
                     "maxPrice": "100000.00000000", "tickSize": "0.00000100"},
                    {"filterType": "LOT_SIZE", "minQty": "0.00100000",
                     "maxQty": "100000.00000000", "stepSize": "0.00100000"},
                    {"filterType": "MAX_NUM_ALGO_ORDERS", "maxNumAlgoOrders": 5}
                ]
            }]
        }"#;

        let info: ExchangeInfoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(info.price_tick_size("ETHBTC"), Some(dec!(0.000001)));
        assert_eq!(info.price_tick_size("BTCUSDT"), None);
    }

    #[test]
    fn test_exchange_info_disabled_price_filter() {
        let json = r#"{"symbols": [{"symbol": "XYZUSDT", "filters": [
            {"filterType": "PRICE_FILTER", "minPrice": "0", "maxPrice": "0", "tickSize": "0.00000000"}
        ]}]}"#;

        let info: ExchangeInfoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(info.price_tick_size("XYZUSDT"), None);
    }

    #[test]
    fn test_query_response_to_order_state() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "orderId": 4611875134427365377,
            "orderListId": -1,
            "clientOrderId": "myOrder1",
            "price": "0.00000000",
            "origQty": "1.00000000",
            "executedQty": "0.25000000",
            "cummulativeQuoteQty": "0.00000000",
            "status": "PARTIALLY_FILLED",
            "timeInForce": "GTC",
            "type": "STOP_LOSS",
            "side": "SELL",
            "stopPrice": "100.00000000",
            "icebergQty": "0.00000000",
            "time": 1499827319559,
            "updateTime": 1499827319560,
            "isWorking": false,
            "origQuoteOrderQty": "0.00000000"
        }"#;

        let response: OrderResponse = serde_json::from_str(json).unwrap();
        let state = response.into_order_state().unwrap();

        assert_eq!(state.order_id, 4611875134427365377);
        assert_eq!(state.order_type, OrderType::StopLoss);
        assert_eq!(state.side, OrderSide::Sell);
        assert_eq!(state.stop_price, dec!(100));
        assert_eq!(state.remaining_qty(), dec!(0.75));
        assert_eq!(state.status, OrderStatus::PartiallyFilled);
        assert_eq!(state.updated_at_ms, 1499827319560);
    }

    #[test]
    fn test_cancel_response_without_update_time() {
        let json = r#"{
            "symbol": "LTCBTC",
            "origClientOrderId": "myOrder1",
            "orderId": 4,
            "orderListId": -1,
            "clientOrderId": "cancelMyOrder1",
            "transactTime": 1684804350068,
            "price": "0.00000000",
            "origQty": "10.00000000",
            "executedQty": "0.00000000",
            "cummulativeQuoteQty": "0.00000000",
            "status": "CANCELED",
            "timeInForce": "GTC",
            "type": "STOP_LOSS",
            "side": "SELL",
            "stopPrice": "0.00900000",
            "selfTradePreventionMode": "NONE"
        }"#;

        let state: OrderState = serde_json::from_str::<OrderResponse>(json)
            .unwrap()
            .into_order_state()
            .unwrap();

        assert_eq!(state.status, OrderStatus::Canceled);
        assert_eq!(state.stop_price, dec!(0.009));
        assert_eq!(state.updated_at_ms, 1684804350068);
    }

    #[test]
    fn test_new_order_result_without_stop_price() {
        let json = r#"{
            "symbol": "BTCUSDT",
            "orderId": 28,
            "orderListId": -1,
            "clientOrderId": "tsl_abc",
            "transactTime": 1507725176595,
            "price": "0.00000000",
            "origQty": "1.00000000",
            "executedQty": "0.00000000",
            "cummulativeQuoteQty": "0.00000000",
            "status": "NEW",
            "timeInForce": "GTC",
            "type": "STOP_LOSS",
            "side": "SELL",
            "workingTime": -1
        }"#;

        let response: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.stop_price, None);
        let state = response.into_order_state().unwrap();
        assert_eq!(state.stop_price, Decimal::ZERO);
        assert_eq!(state.status, OrderStatus::New);
    }

    #[test]
    fn test_unknown_order_type_is_parse_error() {
        let json = r#"{
            "symbol": "BTCUSDT", "orderId": 1, "clientOrderId": "x",
            "price": "0", "origQty": "1", "executedQty": "0",
            "status": "NEW", "timeInForce": "GTC", "type": "TRAILING_MAGIC", "side": "SELL"
        }"#;
        let response: OrderResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            response.into_order_state(),
            Err(BinanceRestError::Parse(_))
        ));
    }
}
