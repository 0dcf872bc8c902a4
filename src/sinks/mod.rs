pub mod discord;
pub mod slack;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hyper::header;

use crate::error::DeliveryError;
use crate::format::OutboundMessage;

pub const USER_AGENT: &str = "Yumechi WebHook/1.0";

/// Something that can deliver a rendered message. One call, one attempt.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

/// Body shape expected by the destination's incoming webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationFormat {
    Discord,
    Slack,
}

impl std::str::FromStr for DestinationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discord" => Ok(DestinationFormat::Discord),
            "slack" => Ok(DestinationFormat::Slack),
            other => Err(format!("unknown destination format '{other}'")),
        }
    }
}

pub fn webhook_sink(
    format: DestinationFormat,
    http_client: Arc<reqwest::Client>,
    webhook_url: String,
) -> Arc<dyn Sink> {
    match format {
        DestinationFormat::Discord => Arc::new(discord::DiscordWebhookSink::new(http_client, webhook_url)),
        DestinationFormat::Slack => Arc::new(slack::SlackWebhookSink::new(http_client, webhook_url)),
    }
}

/// Shared client for outgoing webhooks. `timeout` bounds a whole delivery.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(3).min(timeout))
        .timeout(timeout)
        .build()
}

/// POST `body` as JSON and map anything but 2xx to an error.
pub(crate) async fn post_json<T: serde::Serialize + ?Sized>(
    client: &reqwest::Client,
    webhook_url: &str,
    body: &T,
) -> Result<(), DeliveryError> {
    let response = client
        .post(webhook_url)
        .header(header::USER_AGENT, USER_AGENT)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DeliveryError::Status { status, body });
    }

    Ok(())
}
