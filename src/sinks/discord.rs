use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{Sink, post_json};
use crate::error::DeliveryError;
use crate::format::{Embed, OutboundMessage};

pub const MAX_CONTENT_LEN: usize = 2000;
pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4096;
pub const MAX_FIELD_VALUE_LEN: usize = 1024;
pub const MAX_FIELDS: usize = 25;
/// Discord rejects an embed whose text parts add up to more than this.
pub const MAX_EMBED_TOTAL: usize = 6000;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WebhookBody {
    pub username: String,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<WireEmbed>,
}

#[derive(Debug, Serialize)]
pub struct WireEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<WireAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<WireField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub color: u32,
}

#[derive(Debug, Serialize)]
pub struct WireAuthor {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct WireField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => {
            let mut cut: String = text[..idx].chars().take(max.saturating_sub(1)).collect();
            cut.push('…');
            cut
        }
        None => text.to_string(),
    }
}

/// Clip each part to its own limit, then keep the whole embed within
/// [`MAX_EMBED_TOTAL`]. Author and title go first, then the description,
/// then fields in order until the budget runs out.
fn wire_embed(embed: &Embed) -> WireEmbed {
    let mut budget = MAX_EMBED_TOTAL;

    let author = embed.author.as_ref().map(|name| WireAuthor { name: clip(name, MAX_TITLE_LEN) });
    let title = embed.title.as_deref().map(|t| clip(t, MAX_TITLE_LEN));
    budget -= author.as_ref().map_or(0, |a| a.name.chars().count());
    budget -= title.as_ref().map_or(0, |t| t.chars().count());

    let description = embed
        .description
        .as_deref()
        .and_then(|d| clip_within(d, MAX_DESCRIPTION_LEN, budget));
    budget -= description.as_ref().map_or(0, |d| d.chars().count());

    let mut fields = Vec::new();
    for field in embed.fields.iter().filter(|f| !f.value.is_empty()).take(MAX_FIELDS) {
        let name = clip(&field.name, MAX_TITLE_LEN);
        let name_len = name.chars().count();
        let Some(value) = clip_within(&field.value, MAX_FIELD_VALUE_LEN, budget.saturating_sub(name_len))
        else {
            break;
        };
        budget -= name_len + value.chars().count();
        fields.push(WireField { name, value, inline: field.inline });
    }

    WireEmbed {
        author,
        title,
        url: embed.url.clone(),
        description,
        fields,
        timestamp: embed.timestamp.map(|t| t.to_rfc3339()),
        color: embed.color,
    }
}

/// `clip` to the smaller of `max` and `budget`; `None` when too little is
/// left to say anything.
fn clip_within(text: &str, max: usize, budget: usize) -> Option<String> {
    let limit = max.min(budget);
    if text.is_empty() || limit < 2 {
        return None;
    }
    Some(clip(text, limit))
}

/// Discord incoming-webhook body for `message`.
pub fn webhook_body(message: &OutboundMessage) -> WebhookBody {
    WebhookBody {
        username: message.sender.to_string(),
        content: clip(&message.text, MAX_CONTENT_LEN),
        embeds: message.embed.iter().map(wire_embed).collect(),
    }
}

// ---------------------------------------------------------------------------
// DiscordWebhookSink
// ---------------------------------------------------------------------------

pub struct DiscordWebhookSink {
    http_client: Arc<reqwest::Client>,
    webhook_url: String,
}

impl DiscordWebhookSink {
    pub fn new(http_client: Arc<reqwest::Client>, webhook_url: String) -> Self {
        Self { http_client, webhook_url }
    }
}

#[async_trait]
impl Sink for DiscordWebhookSink {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        post_json(&self.http_client, &self.webhook_url, &webhook_body(message)).await?;
        tracing::info!("Delivered message to Discord");
        Ok(())
    }
}
