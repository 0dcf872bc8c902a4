use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{Sink, post_json};
use crate::error::DeliveryError;
use crate::format::OutboundMessage;

#[derive(Debug, Serialize)]
pub struct WebhookBody {
    pub username: String,
    pub text: String,
}

/// Slack incoming-webhook body for `message`.
pub fn webhook_body(message: &OutboundMessage) -> WebhookBody {
    WebhookBody {
        username: message.sender.to_string(),
        text: to_mrkdwn(message),
    }
}

pub struct SlackWebhookSink {
    http_client: Arc<reqwest::Client>,
    webhook_url: String,
}

impl SlackWebhookSink {
    pub fn new(http_client: Arc<reqwest::Client>, webhook_url: String) -> Self {
        Self { http_client, webhook_url }
    }
}

#[async_trait]
impl Sink for SlackWebhookSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        post_json(&self.http_client, &self.webhook_url, &webhook_body(message)).await?;
        tracing::info!("Delivered message to Slack");
        Ok(())
    }
}

/// Escape the three characters Slack treats as control sequences.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Flatten the message and its embed into Slack mrkdwn.
pub fn to_mrkdwn(message: &OutboundMessage) -> String {
    let text = escape(&message.text);
    let Some(embed) = &message.embed else {
        return text;
    };

    let mut lines = vec![text];

    match (&embed.title, &embed.url) {
        // `|` ends the link target, so it cannot appear in the label either.
        (Some(title), Some(url)) => lines.push(format!("*<{url}|{}>*", escape(title).replace('|', "¦"))),
        (Some(title), None) => lines.push(format!("*{}*", escape(title))),
        (None, Some(url)) => lines.push(format!("<{url}>")),
        (None, None) => {}
    }

    for field in &embed.fields {
        lines.push(format!("• *{}*: {}", escape(&field.name), escape(&field.value)));
    }

    if let Some(description) = &embed.description {
        lines.push(String::new());
        lines.push(escape(description));
    }

    lines.join("\n")
}
