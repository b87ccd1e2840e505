//! Binance spot REST client for stop order management.
//!
//! Provides the signed endpoints the trailing monitor needs:
//!
//! - **Time synchronization**: adjusts for clock skew before signing
//! - **Order queries**: open orders for the account, single order by id
//! - **Order placement**: cancel by id, new stop-loss order
//!
//! [`BinanceRestClient`] implements [`connector_core::ExchangeClient`].
//!
//! # Example
//!
//! ```rust,ignore
//! use binance_rest::{ApiCredentials, BinanceRestClient};
//!
//! let credentials = ApiCredentials::from_env()?;
//! let client = BinanceRestClient::new(credentials)?;
//! client.sync_time().await?;
//!
//! let open = client.open_orders().await?;
//! ```

mod client;
mod credentials;
mod error;
mod responses;
mod signer;
mod transport;

pub use client::BinanceRestClient;
pub use credentials::ApiCredentials;
pub use error::{AuthError, BinanceRestError};
pub use responses::{ExchangeInfoResponse, OrderResponse, ServerTimeResponse, SymbolFilter, SymbolInfo};
pub use signer::RequestSigner;
