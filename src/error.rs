use axum::Json;
use axum::response::{IntoResponse, Response};
use hyper::StatusCode;
use serde_json::json;

use crate::sources::Source;

/// A required placeholder could not be filled from the payload.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Errors from posting a message to the chat webhook.
///
/// None of these are retried; a failed delivery is final for the event.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("no outgoing webhook configured for {0}")]
    NotConfigured(Source),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Everything that can end a relay request without a 200.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("delivery failed: {0}")]
    DeliveryFailed(#[from] DeliveryError),
}

impl RelayError {
    /// Stable, detail-free name reported back to the caller.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::MalformedPayload(_) => "malformed_payload",
            RelayError::Format(_) => "format_error",
            RelayError::DeliveryFailed(_) => "delivery_failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            RelayError::Format(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Response for `source`. The body names the outcome only.
    pub fn into_response_for(self, source: Source) -> Response {
        (
            self.status(),
            Json(json!({ "mode": source.as_str(), "outcome": self.outcome() })),
        )
            .into_response()
    }
}
