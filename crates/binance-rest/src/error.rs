//! Binance REST error types.

use connector_core::ExchangeError;
use thiserror::Error;

/// Errors that can occur when loading credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Errors that can occur when interacting with the Binance REST API.
#[derive(Debug, Error)]
pub enum BinanceRestError {
    /// HTTP error without a Binance error body.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Request timed out.
    #[error("Request timeout")]
    Timeout,

    /// Connection error (network issue).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Rate limited (HTTP 429) or IP banned (HTTP 418).
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Binance API error (returned by the exchange).
    #[error("Binance API error {code}: {message}")]
    Api { code: i32, message: String },

    /// Order not found.
    #[error("Order not found")]
    OrderNotFound,

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failed to build the HTTP client.
    #[error("Request build error: {0}")]
    RequestBuild(String),
}

impl BinanceRestError {
    /// Interpret a non-success response body.
    ///
    /// Binance returns errors in the format: `{"code": -1000, "msg": "..."}`
    pub fn from_error_body(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiErrorBody {
            code: i32,
            msg: String,
        }

        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) => Self::classify_api_error(err.code, err.msg),
            Err(_) => Self::Http {
                status,
                message: body.to_string(),
            },
        }
    }

    fn classify_api_error(code: i32, message: String) -> Self {
        match code {
            // -2011 "Unknown order sent." on cancel, -2013 "Order does not exist." on query
            -2011 | -2013 => Self::OrderNotFound,
            _ => Self::Api { code, message },
        }
    }
}

impl From<reqwest::Error> for BinanceRestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<BinanceRestError> for ExchangeError {
    fn from(err: BinanceRestError) -> Self {
        match err {
            BinanceRestError::Timeout => ExchangeError::Transport("request timeout".to_string()),
            BinanceRestError::Connection(msg) => ExchangeError::Transport(msg),
            BinanceRestError::Http { status, message } if status == 401 || status == 403 => {
                ExchangeError::Auth(message)
            }
            BinanceRestError::Http { status, message } => {
                ExchangeError::Transport(format!("HTTP {status}: {message}"))
            }
            BinanceRestError::RateLimited { retry_after_ms } => {
                ExchangeError::RateLimited { retry_after_ms }
            }
            // -2014 / -2015: bad API key format, or key lacks permission for this IP
            BinanceRestError::Api { code, message } if code == -2014 || code == -2015 => {
                ExchangeError::Auth(message)
            }
            BinanceRestError::Api { code, message } => ExchangeError::Api { code, message },
            BinanceRestError::OrderNotFound => ExchangeError::OrderNotFound,
            BinanceRestError::Auth(e) => ExchangeError::Auth(e.to_string()),
            BinanceRestError::Parse(msg) => ExchangeError::Parse(msg),
            BinanceRestError::RequestBuild(msg) => ExchangeError::Transport(msg),
        }
    }
}
