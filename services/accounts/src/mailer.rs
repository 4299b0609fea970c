//! Outbound email delivery
//!
//! Messages are posted as JSON to an HTTP mail relay. Without a relay the
//! service falls back to a mailer that only records the delivery in the logs.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("mail relay request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
}

/// Email to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

/// Mailer configuration
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// HTTP endpoint accepting JSON messages
    pub relay_url: Option<String>,
    /// Bearer key for the relay
    pub api_key: Option<String>,
    /// Sender address
    pub from: String,
}

impl MailerConfig {
    /// Create a new MailerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MAIL_RELAY_URL`: Mail relay endpoint (optional)
    /// - `MAIL_API_KEY`: Bearer key for the relay (optional)
    /// - `MAIL_FROM`: Sender address (default: "noreply@workshift.nc")
    pub fn from_env() -> Result<Self> {
        let relay_url = std::env::var("MAIL_RELAY_URL")
            .ok()
            .filter(|v| !v.is_empty());
        let api_key = std::env::var("MAIL_API_KEY").ok().filter(|v| !v.is_empty());
        let from =
            std::env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@workshift.nc".to_string());

        Ok(MailerConfig {
            relay_url,
            api_key,
            from,
        })
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mailer backed by an HTTP relay
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(relay_url: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.client.post(&self.relay_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            warn!(
                "Mail relay answered {} for message to {}",
                response.status(),
                message.to
            );
            return Err(MailerError::Rejected(response.status().as_u16()));
        }

        info!("Email '{}' sent to {}", message.subject, message.to);
        Ok(())
    }
}

/// Mailer that only logs deliveries
///
/// Bodies may carry credentials or reset links, so they are not logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), MailerError> {
        info!(
            "No mail relay configured; dropping email '{}' to {}",
            message.subject, message.to
        );
        Ok(())
    }
}

/// Build the mailer described by the configuration
pub fn from_config(config: &MailerConfig) -> Arc<dyn Mailer> {
    match &config.relay_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            config.api_key.clone(),
            config.from.clone(),
        )),
        None => {
            warn!("MAIL_RELAY_URL not set; emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}
