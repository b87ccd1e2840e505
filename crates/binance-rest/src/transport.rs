//! HTTP transport shared by every endpoint.

use crate::error::BinanceRestError;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Fallback wait when a 429/418 response carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_MS: u64 = 60_000;

pub(crate) struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> Result<Self, BinanceRestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BinanceRestError::RequestBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send a request and decode the JSON body.
    ///
    /// `query` is appended as-is; for signed endpoints it already carries the
    /// signature. `api_key` is sent as `X-MBX-APIKEY` when present.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<T, BinanceRestError> {
        let url = self.build_url(path, query);
        tracing::debug!(method = %method, path = %path, "REST request");

        let mut request = self.client.request(method, &url);
        if let Some(key) = api_key {
            request = request.header("X-MBX-APIKEY", key);
        }

        let response = request.send().await?;
        Self::decode(response).await
    }

    fn build_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BinanceRestError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            return Err(BinanceRestError::RateLimited { retry_after_ms });
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(BinanceRestError::from_error_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(body = %body, error = %e, "Failed to parse response");
            BinanceRestError::Parse(e.to_string())
        })
    }
}
