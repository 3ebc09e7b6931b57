use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::error::{HookError, Result};
use crate::models::Payload;

/// Delivers a finished payload somewhere.
pub trait Notifier {
    fn send(&self, payload: &Payload) -> Result<()>;
}

/// Posts payloads as JSON to a Slack incoming-webhook URL.
pub struct WebhookPublisher {
    client: Client,
    url: String,
}

impl WebhookPublisher {
    pub fn new(url: impl Into<String>) -> Self {
        WebhookPublisher {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        WebhookPublisher {
            client,
            url: url.into(),
        }
    }
}

impl Notifier for WebhookPublisher {
    fn send(&self, payload: &Payload) -> Result<()> {
        let body = serde_json::to_string(payload)?;
        log::debug!("posting {} bytes to webhook", body.len());

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(HookError::DeliveryError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
