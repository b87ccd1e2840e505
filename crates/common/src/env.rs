//! Typed environment variable lookup.

use std::str::FromStr;
use thiserror::Error;

/// A configuration variable was present but could not be parsed.
#[derive(Debug, Clone, Error)]
#[error("invalid value '{value}' for {name}: {reason}")]
pub struct EnvVarError {
    /// Variable name.
    pub name: String,
    /// Raw value found in the environment.
    pub value: String,
    /// Parser message.
    pub reason: String,
}

/// Load a `.env` file from the working directory if there is one.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Parse `name` if it is set and non-empty.
///
/// Returns `Ok(None)` when the variable is absent so callers can keep their
/// defaults.
pub fn env_parse<T>(name: &str) -> Result<Option<T>, EnvVarError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| EnvVarError {
                    name: name.to_string(),
                    value: raw,
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

/// Parse `name`, falling back to `default` when it is unset.
pub fn env_or<T>(name: &str, default: T) -> Result<T, EnvVarError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_parse(name)?.unwrap_or(default))
}
