use model::PriceTick;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw Binance aggregate trade event (`<symbol>@aggTrade`).
#[derive(Debug, Deserialize)]
pub struct BinanceAggTradeRaw {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "a")]
    pub agg_trade_id: u64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub qty: Decimal,
    #[serde(rename = "T")]
    pub timestamp_ms: i64,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

pub enum ParsedMessage {
    Tick(PriceTick),
    Unknown,
}

impl From<BinanceAggTradeRaw> for PriceTick {
    fn from(raw: BinanceAggTradeRaw) -> Self {
        PriceTick {
            symbol: raw.symbol,
            price: raw.price,
            timestamp_ms: raw.timestamp_ms,
            trade_id: raw.agg_trade_id,
        }
    }
}

/// Parse a raw-stream text frame.
///
/// Non-trade frames (subscription acks, other event types) come back as
/// [`ParsedMessage::Unknown`].
pub fn parse_message(text: &str) -> Result<ParsedMessage, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    match value.get("e").and_then(|v| v.as_str()) {
        Some("aggTrade") => {
            let raw: BinanceAggTradeRaw = serde_json::from_value(value)?;
            Ok(ParsedMessage::Tick(raw.into()))
        }
        _ => Ok(ParsedMessage::Unknown),
    }
}
