use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::{config::Config, models::retry::RetryConfig, utils::retry_with_backoff};

/// Outbound email transport. Implementations deliver one message to
/// one address; retries inside a single call are the implementation's
/// business, the pipeline never re-sends.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

#[derive(Clone, Serialize)]
struct SendEmailRequest {
    to: String,
    subject: String,
    body: String,
}

/// [`EmailSender`] talking to the HTTP email gateway.
pub struct HttpMailer {
    http_client: Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl HttpMailer {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(base_url = %config.mailer_url, "Mailer client initialized");

        Ok(Self {
            http_client,
            base_url: config.mailer_url.clone(),
            retry_config: RetryConfig::from_config(config),
        })
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let url = format!("{}/api/v1/send", self.base_url);
        let request = SendEmailRequest {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        retry_with_backoff(&self.retry_config, || {
            let client = self.http_client.clone();
            let url = url.clone();
            let request = request.clone();

            async move {
                let response = client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| e.to_string())?;

                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(format!("Mailer returned status {}", status))
                }
            }
        })
        .await
        .map_err(|e| anyhow!("Failed to send email to {}: {}", to, e))?;

        debug!(to, subject, "Email handed to mailer");

        Ok(())
    }
}
