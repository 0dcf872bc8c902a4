//! `yumechi preview`: render a saved payload the way the server would,
//! without posting it anywhere.

use anyhow::{Context, Result};
use std::path::Path;

use crate::format::FormatContext;
use crate::relay::{self, Prepared};
use crate::sinks::{DestinationFormat, discord, slack};
use crate::sources::Source;

pub fn render_file(
    source: Source,
    path: &Path,
    ctx: &FormatContext,
    format: DestinationFormat,
) -> Result<String> {
    let body = std::fs::read(path)
        .with_context(|| format!("failed to read payload file: {}", path.display()))?;

    let prepared = relay::prepare(source, &body, ctx)
        .with_context(|| format!("{source} payload in {} was rejected", path.display()))?;

    match prepared {
        Prepared::Suppressed(reason) => Ok(format!("suppressed ({})", reason.as_str())),
        Prepared::Ready { key, message } => {
            let body = match format {
                DestinationFormat::Discord => serde_json::to_value(discord::webhook_body(&message))?,
                DestinationFormat::Slack => serde_json::to_value(slack::webhook_body(&message))?,
            };
            Ok(format!(
                "category: {key}\npriority: {}\n{}",
                message.priority.as_str(),
                serde_json::to_string_pretty(&body)?
            ))
        }
    }
}
