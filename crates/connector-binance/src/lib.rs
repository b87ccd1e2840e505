mod feed;
mod parser;
mod stream;

pub use feed::BinanceTradeFeed;
pub use parser::{parse_message, ParsedMessage};
pub use stream::run_trade_stream;
