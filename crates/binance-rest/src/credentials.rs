//! API key and secret handling.
//!
//! The secret is held in a `SecretString` so it never appears in `Debug`
//! output and is zeroed on drop.

use crate::error::AuthError;
use secrecy::{ExposeSecret, SecretString};

const API_KEY_VAR: &str = "BINANCE_API_KEY";
const SECRET_KEY_VAR: &str = "BINANCE_SECRET_KEY";

/// Credentials for signed endpoints. Cancel and create need a key with
/// spot trading permission.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: SecretString,
}

impl ApiCredentials {
    /// Read `BINANCE_API_KEY` and `BINANCE_SECRET_KEY`, loading `.env` first.
    pub fn from_env() -> Result<Self, AuthError> {
        common::load_dotenv();

        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| AuthError::MissingEnvVar(API_KEY_VAR.into()))?;
        let secret_key = std::env::var(SECRET_KEY_VAR)
            .map_err(|_| AuthError::MissingEnvVar(SECRET_KEY_VAR.into()))?;

        Ok(Self::new(api_key, secret_key))
    }

    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key: SecretString::from(secret_key),
        }
    }

    /// Public half, sent as the `X-MBX-APIKEY` header.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Only for computing signatures. Never log the result.
    pub(crate) fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
