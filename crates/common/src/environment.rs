//! Binance endpoint selection.
//!
//! Production trades real funds; testnet uses the public sandbox.

use std::fmt;
use std::str::FromStr;

/// Variable that selects the environment.
const ENVIRONMENT_VAR: &str = "BINANCE_ENVIRONMENT";

/// Binance environment (production or testnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinanceEnvironment {
    /// Production environment (real money).
    #[default]
    Production,
    /// Testnet environment (fake money for testing).
    Testnet,
}

impl BinanceEnvironment {
    /// REST API base URL.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://api.binance.com",
            Self::Testnet => "https://testnet.binance.vision",
        }
    }

    /// WebSocket base URL for market data streams.
    pub fn ws_base_url(&self) -> &'static str {
        match self {
            Self::Production => "wss://stream.binance.com:9443",
            Self::Testnet => "wss://testnet.binance.vision",
        }
    }

    /// Raw stream URL carrying aggregated trades for one symbol.
    pub fn agg_trade_stream_url(&self, symbol: &str) -> String {
        format!(
            "{}/ws/{}@aggTrade",
            self.ws_base_url(),
            symbol.to_lowercase()
        )
    }

    /// Returns true if this is the production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Read `BINANCE_ENVIRONMENT`.
    ///
    /// An unset variable selects production. A value that does not name an
    /// environment is an error rather than a silent fallback, since the two
    /// environments hold different funds.
    pub fn from_env() -> Result<Self, ParseEnvironmentError> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(raw) if !raw.trim().is_empty() => raw.trim().parse(),
            _ => Ok(Self::default()),
        }
    }
}

impl fmt::Display for BinanceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for BinanceEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" | "mainnet" | "main" => Ok(Self::Production),
            "testnet" | "test" | "sandbox" => Ok(Self::Testnet),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// Error parsing environment string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid environment '{0}', expected 'production' or 'testnet'")]
pub struct ParseEnvironmentError(String);
