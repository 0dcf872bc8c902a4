//! Per-request pipeline: classify, resolve the rule, render, deliver.
//!
//! Each call is independent. The only shared state is the static rule table
//! and the sinks, which are read-only.

use serde_json::Value;
use tracing::Span;
use uuid::Uuid;

use crate::error::{DeliveryError, RelayError};
use crate::format::{self, FormatContext, OutboundMessage};
use crate::rules;
use crate::sinks::Sink;
use crate::sources::kibela::KibelaEvent;
use crate::sources::{self, CategoryKey, InboundEvent, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// The rule exists but is switched off.
    Disabled,
    /// No rule for this category.
    UnknownCategory,
}

impl SuppressReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SuppressReason::Disabled => "disabled",
            SuppressReason::UnknownCategory => "unknown_category",
        }
    }
}

/// Result of everything up to (not including) delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    Suppressed(SuppressReason),
    Ready { key: CategoryKey, message: OutboundMessage },
}

/// Terminal states that answer 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Suppressed(SuppressReason),
    Delivered,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Suppressed(_) => "suppressed",
            Outcome::Delivered => "delivered",
        }
    }
}

/// Classify and render `body` without side effects.
pub fn prepare(source: Source, body: &[u8], ctx: &FormatContext) -> Result<Prepared, RelayError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| RelayError::MalformedPayload(format!("invalid JSON: {e}")))?;

    let key = sources::classify(source, &payload)?;
    Span::current().record("category", tracing::field::display(&key));

    let Some(rule) = rules::lookup(&key) else {
        return Ok(Prepared::Suppressed(SuppressReason::UnknownCategory));
    };
    if !rule.enabled {
        return Ok(Prepared::Suppressed(SuppressReason::Disabled));
    }

    let event = match key {
        CategoryKey::ConnectivityTest => InboundEvent::WikiTool(KibelaEvent::connectivity_test()),
        _ => InboundEvent::parse(source, payload)?,
    };

    let message = format::render(&event, &key, rule, ctx)?;
    Ok(Prepared::Ready { key, message })
}

/// Run the full pipeline for one inbound webhook.
///
/// `sink` is `None` when no outgoing webhook is configured for `source`;
/// that only matters once a message is ready to go out.
#[tracing::instrument(
    skip_all,
    fields(source = %source, request_id = %Uuid::new_v4(), category = tracing::field::Empty)
)]
pub async fn handle(
    source: Source,
    body: &[u8],
    ctx: &FormatContext,
    sink: Option<&dyn Sink>,
) -> Result<Outcome, RelayError> {
    let result = run(source, body, ctx, sink).await;

    match &result {
        Ok(Outcome::Delivered) => tracing::info!("Event forwarded"),
        Ok(Outcome::Suppressed(reason)) => {
            tracing::debug!(reason = reason.as_str(), "Event accepted, not forwarded");
        }
        Err(e @ RelayError::DeliveryFailed(_)) => tracing::error!(error = %e, "Event delivery failed"),
        Err(e) => tracing::warn!(error = %e, "Event rejected"),
    }

    result
}

async fn run(
    source: Source,
    body: &[u8],
    ctx: &FormatContext,
    sink: Option<&dyn Sink>,
) -> Result<Outcome, RelayError> {
    let message = match prepare(source, body, ctx)? {
        Prepared::Suppressed(reason) => return Ok(Outcome::Suppressed(reason)),
        Prepared::Ready { message, .. } => message,
    };

    tracing::debug!(priority = message.priority.as_str(), "Message rendered");

    let sink = sink.ok_or(DeliveryError::NotConfigured(source))?;
    sink.deliver(&message).await?;
    Ok(Outcome::Delivered)
}
