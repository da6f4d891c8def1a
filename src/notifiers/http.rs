use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::utils::{CircuitBreaker, CircuitBreakerConfig};
use super::errors::NotifyError;

/// JSON-over-HTTP client for one downstream store.
#[derive(Debug, Clone)]
pub struct HttpStoreClient {
    http: Client,
    breaker: CircuitBreaker,
}

impl HttpStoreClient {
    pub fn new(name: &str, timeout: Duration, breaker: CircuitBreakerConfig) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Request {
                url: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            breaker: CircuitBreaker::new(name, breaker),
        })
    }

    pub fn name(&self) -> &str {
        self.breaker.name()
    }

    /// POST `body` as JSON. Any non-2xx status is an error.
    pub async fn post_json<B: Serialize + Sync>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(body)?;

        let result = self
            .breaker
            .call(async {
                let response = self
                    .http
                    .post(url)
                    .query(query)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(payload)
                    .send()
                    .await
                    .map_err(|e| request_error(url, e))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(NotifyError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                        body,
                    });
                }

                Ok::<(), NotifyError>(())
            })
            .await;

        result.map_err(NotifyError::from)
    }
}

fn request_error(url: &str, err: reqwest::Error) -> NotifyError {
    if err.is_timeout() {
        NotifyError::Timeout { url: url.to_string() }
    } else {
        NotifyError::Request {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
