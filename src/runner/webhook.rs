//! HTTP webhook client

use crate::runner::{RunnerConfig, RunnerError, WebhookDispatcher, WebhookResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// POSTs deployment payloads as JSON
#[derive(Debug, Clone)]
pub struct HttpWebhook {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpWebhook {
    pub fn new(config: &RunnerConfig) -> Result<Self, RunnerError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| RunnerError::Internal(e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| RunnerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs: config.http_timeout_secs,
        })
    }
}

#[async_trait]
impl WebhookDispatcher for HttpWebhook {
    async fn dispatch(&self, url: &str, payload: &Value) -> Result<WebhookResponse, RunnerError> {
        // The URL itself is a secret; only the host is logged
        let host = reqwest::Url::parse(url)
            .map_err(|e| RunnerError::Http(format!("invalid webhook URL: {}", e)))?
            .host_str()
            .unwrap_or("unknown")
            .to_string();
        info!("Dispatching deployment webhook to {}", host);

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RunnerError::Timeout(self.timeout_secs)
                } else {
                    RunnerError::Http(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RunnerError::Http(e.without_url().to_string()))?;

        if !status.is_success() {
            warn!("Webhook at {} returned {}", host, status);
            return Err(RunnerError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Webhook at {} answered {} ({} bytes)", host, status, body.len());
        Ok(WebhookResponse {
            status: status.as_u16(),
            body,
        })
    }
}
