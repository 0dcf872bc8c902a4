//! Kibela (wiki/blog tool) webhook payloads.
//!
//! The resource body lives under a key named after `resource_type`
//! (`blog`, `wiki`, `comment`, `comment_reply`).

use serde::Deserialize;
use serde_json::Value;

use super::CategoryKey;
use crate::error::RelayError;
use crate::format::{EmbedField, MessageFields, diff_excerpt, excerpt, non_empty};

fn discriminator<'a>(body: &'a Value, field: &str) -> Result<&'a str, RelayError> {
    match body.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(RelayError::MalformedPayload(format!("`{field}` is not a string: {other}"))),
        None => Err(RelayError::MalformedPayload(format!("missing `{field}`"))),
    }
}

fn is_connectivity_test(resource: &str, action: &str) -> bool {
    // Kibela's test button sends action=send, resource_type=test.
    matches!((resource, action), ("send", "test") | ("test", "send"))
}

/// Read the `(resource_type, action)` discriminators.
pub fn classify(body: &Value) -> Result<CategoryKey, RelayError> {
    let resource = discriminator(body, "resource_type")?;
    let action = discriminator(body, "action")?;

    if is_connectivity_test(resource, action) {
        return Ok(CategoryKey::ConnectivityTest);
    }

    Ok(CategoryKey::WikiTool {
        resource: resource.to_string(),
        action: action.to_string(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct KibelaEvent {
    pub action: String,
    pub resource_type: String,
    #[serde(default)]
    pub action_user: Option<Account>,
    #[serde(default)]
    pub blog: Option<Article>,
    #[serde(default)]
    pub wiki: Option<Article>,
    #[serde(default)]
    pub comment: Option<Comment>,
    #[serde(default)]
    pub comment_reply: Option<Comment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Account {
    pub account: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Article {
    pub title: Option<String>,
    pub url: Option<String>,
    pub content_md: Option<String>,
    pub content_diff: Option<String>,
    pub author: Option<Account>,
    pub authors: Option<Vec<Account>>,
}

impl Article {
    /// Articles carry either `author` or `authors` depending on the event.
    pub fn author_names(&self) -> Option<String> {
        if let Some(author) = &self.author {
            return non_empty(author.account.as_deref());
        }
        let names: Vec<String> = self
            .authors
            .iter()
            .flatten()
            .filter_map(|a| non_empty(a.account.as_deref()))
            .collect();
        (!names.is_empty()).then(|| names.join(", "))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub url: Option<String>,
    pub content_md: Option<String>,
    pub author: Option<Account>,
    pub blog: Option<Article>,
    pub wiki: Option<Article>,
}

impl Comment {
    fn article(&self) -> Option<&Article> {
        self.blog.as_ref().or(self.wiki.as_ref())
    }
}

impl KibelaEvent {
    /// Stand-in for a test ping, whose body is never inspected past the
    /// discriminators.
    pub fn connectivity_test() -> Self {
        Self {
            action: "send".to_string(),
            resource_type: "test".to_string(),
            action_user: None,
            blog: None,
            wiki: None,
            comment: None,
            comment_reply: None,
        }
    }

    pub fn message_fields(&self, key: &CategoryKey) -> MessageFields {
        let mut fields = MessageFields {
            actor: self.action_user.as_ref().and_then(|u| non_empty(u.account.as_deref())),
            action: Some(format!("{} {}", self.resource_type, self.action)),
            ..Default::default()
        };

        if matches!(key, CategoryKey::ConnectivityTest) {
            return fields;
        }

        let article = match self.resource_type.as_str() {
            "blog" => self.blog.as_ref(),
            "wiki" => self.wiki.as_ref(),
            _ => None,
        };

        if let Some(article) = article {
            fields.identifier = non_empty(article.title.as_deref());
            fields.url = non_empty(article.url.as_deref());
            fields.excerpt = match self.action.as_str() {
                "create" => non_empty(article.content_md.as_deref()).map(|t| excerpt(&t)),
                "update" => non_empty(article.content_diff.as_deref()).map(|d| diff_excerpt(&d)),
                _ => None,
            };
            if let Some(author) = article.author_names() {
                fields.details.push(EmbedField::inline("Author", author));
            }
            return fields;
        }

        let comment = match self.resource_type.as_str() {
            "comment" => self.comment.as_ref(),
            "comment_reply" => self.comment_reply.as_ref(),
            _ => None,
        };

        if let Some(comment) = comment {
            let parent = comment.article();
            fields.identifier = parent.and_then(|a| non_empty(a.title.as_deref()));
            fields.url = non_empty(comment.url.as_deref())
                .or_else(|| parent.and_then(|a| non_empty(a.url.as_deref())));
            fields.excerpt = match self.action.as_str() {
                "create" | "update" => non_empty(comment.content_md.as_deref()).map(|t| excerpt(&t)),
                _ => None,
            };
            if let Some(author) = parent.and_then(Article::author_names) {
                fields.details.push(EmbedField::inline("Author", author));
            }
        }

        fields
    }
}
