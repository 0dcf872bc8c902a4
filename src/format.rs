use chrono::{DateTime, Utc};

use crate::error::FormatError;
use crate::rules::{CategoryRule, Priority};
use crate::sources::{CategoryKey, InboundEvent};

/// Longest excerpt carried into a message, in characters.
pub const EXCERPT_LIMIT: usize = 500;
const TRUNCATED_MARKER: &str = "… (truncated)";

/// Deployment-specific values the formatter needs to build links.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    pub backlog_base_url: Option<String>,
    pub project_prefix: Option<String>,
}

/// Named slots a rule template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Actor,
    Identifier,
    Title,
    Action,
    Excerpt,
    Url,
}

impl Placeholder {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "actor" => Some(Placeholder::Actor),
            "identifier" => Some(Placeholder::Identifier),
            "title" => Some(Placeholder::Title),
            "action" => Some(Placeholder::Action),
            "excerpt" => Some(Placeholder::Excerpt),
            "url" => Some(Placeholder::Url),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Actor => "actor",
            Placeholder::Identifier => "identifier",
            Placeholder::Title => "title",
            Placeholder::Action => "action",
            Placeholder::Excerpt => "excerpt",
            Placeholder::Url => "url",
        }
    }

    /// A message without these tells the reader nothing actionable.
    pub fn is_required(self) -> bool {
        matches!(self, Placeholder::Actor | Placeholder::Identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn inline(name: &str, value: impl Into<String>) -> Self {
        Self { name: name.to_string(), value: value.into(), inline: true }
    }
}

/// Values pulled out of a payload for template substitution and the embed.
#[derive(Debug, Clone, Default)]
pub struct MessageFields {
    pub actor: Option<String>,
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub action: Option<String>,
    pub excerpt: Option<String>,
    pub url: Option<String>,
    pub details: Vec<EmbedField>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageFields {
    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        let value = match placeholder {
            Placeholder::Actor => &self.actor,
            Placeholder::Identifier => &self.identifier,
            Placeholder::Title => &self.title,
            Placeholder::Action => &self.action,
            Placeholder::Excerpt => &self.excerpt,
            Placeholder::Url => &self.url,
        };
        value.as_deref()
    }
}

/// Rich card attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub author: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    pub timestamp: Option<DateTime<Utc>>,
    pub color: u32,
}

/// A rendered message ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub sender: &'static str,
    pub text: String,
    pub priority: Priority,
    pub embed: Option<Embed>,
}

pub fn priority_color(priority: Priority) -> u32 {
    match priority {
        Priority::High => 0xE0_3E_2D,
        Priority::Medium => 0xF2_A9_00,
        Priority::Low => 0x95_A5_A6,
    }
}

/// Render `event` with `rule`'s template.
pub fn render(
    event: &InboundEvent,
    key: &CategoryKey,
    rule: &CategoryRule,
    ctx: &FormatContext,
) -> Result<OutboundMessage, FormatError> {
    let fields = match event {
        InboundEvent::IssueTracker(e) => e.message_fields(key, ctx),
        InboundEvent::WikiTool(e) => e.message_fields(key),
    };

    let text = render_template(rule.template, &fields)?;

    let embed = match key {
        CategoryKey::ConnectivityTest => None,
        _ => Some(build_embed(fields, rule.priority)),
    };

    Ok(OutboundMessage {
        sender: event.source().sender_name(),
        text,
        priority: rule.priority,
        embed,
    })
}

fn build_embed(fields: MessageFields, priority: Priority) -> Embed {
    let title = match (fields.identifier, fields.title) {
        (Some(id), Some(title)) if id != title => Some(format!("{id} {title}")),
        (Some(id), _) => Some(id),
        (None, title) => title,
    };

    Embed {
        author: fields.actor,
        title,
        url: fields.url,
        description: fields.excerpt,
        fields: fields.details,
        timestamp: fields.timestamp,
        color: priority_color(priority),
    }
}

/// Substitute `{name}` slots.
///
/// Missing optional values render empty; a missing required value is an
/// error. Unknown names are copied through untouched.
pub fn render_template(template: &str, fields: &MessageFields) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let name = &after[..end];
        match Placeholder::from_name(name) {
            Some(placeholder) => match fields.get(placeholder) {
                Some(value) => out.push_str(value),
                None if placeholder.is_required() => {
                    return Err(FormatError::MissingField(placeholder.name()));
                }
                None => {}
            },
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out.trim_end().to_string())
}

/// Cut `text` to [`EXCERPT_LIMIT`] characters, marking the cut.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_LIMIT) {
        Some((idx, _)) => format!("{}{TRUNCATED_MARKER}", &text[..idx]),
        None => text.to_string(),
    }
}

/// Excerpt of a unified diff, fenced so chat clients highlight it.
pub fn diff_excerpt(diff: &str) -> String {
    format!("```diff\n{}\n```", excerpt(diff))
}

/// `Some` only for strings with visible content.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}
