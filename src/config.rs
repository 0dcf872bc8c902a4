use std::time::Duration;

use crate::format::FormatContext;
use crate::sinks::DestinationFormat;
use crate::sources::Source;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 5;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub sentry_dsn: Option<String>,
    pub environment: String,
    pub backlog_webhook_url: Option<String>,
    pub kibela_webhook_url: Option<String>,
    pub backlog_base_url: Option<String>,
    pub project_prefix: Option<String>,
    pub destination_format: DestinationFormat,
    pub delivery_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a Config from a key lookup (as env vars would be read).
    /// Used directly in tests to avoid mutating process-global environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let port = get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let destination_format = match get("DESTINATION_FORMAT").map(|v| v.parse::<DestinationFormat>()) {
            Some(Ok(format)) => format,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring DESTINATION_FORMAT, using discord");
                DestinationFormat::Discord
            }
            None => DestinationFormat::Discord,
        };

        let delivery_timeout = get("DELIVERY_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS));

        Config {
            port,
            sentry_dsn: get("SENTRY_DSN"),
            environment: get("ENVIRONMENT").unwrap_or_else(|| "local".to_string()),
            backlog_webhook_url: get("BACKLOG_WEBHOOK_URL"),
            kibela_webhook_url: get("KIBELA_WEBHOOK_URL"),
            backlog_base_url: get("BACKLOG_BASE_URL"),
            project_prefix: get("PROJECT_PREFIX"),
            destination_format,
            delivery_timeout,
        }
    }

    pub fn webhook_url(&self, source: Source) -> Option<&str> {
        match source {
            Source::IssueTracker => self.backlog_webhook_url.as_deref(),
            Source::WikiTool => self.kibela_webhook_url.as_deref(),
        }
    }

    pub fn format_context(&self) -> FormatContext {
        FormatContext {
            backlog_base_url: self.backlog_base_url.clone(),
            project_prefix: self.project_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config(&[]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.environment, "local");
        assert!(config.sentry_dsn.is_none());
        assert!(config.backlog_webhook_url.is_none());
        assert_eq!(config.destination_format, DestinationFormat::Discord);
        assert_eq!(config.delivery_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_invalid_port_uses_default() {
        assert_eq!(config(&[("PORT", "not-a-number")]).port, 8081);
    }

    #[test]
    fn test_config_valid_port() {
        assert_eq!(config(&[("PORT", "3000")]).port, 3000);
    }

    #[test]
    fn test_config_empty_values_are_unset() {
        let config = config(&[("SENTRY_DSN", ""), ("KIBELA_WEBHOOK_URL", "  ")]);
        assert!(config.sentry_dsn.is_none());
        assert!(config.kibela_webhook_url.is_none());
    }

    #[test]
    fn test_config_webhook_urls_by_source() {
        let config = config(&[
            ("BACKLOG_WEBHOOK_URL", "https://discord.test/backlog"),
            ("KIBELA_WEBHOOK_URL", "https://discord.test/kibela"),
        ]);
        assert_eq!(config.webhook_url(Source::IssueTracker), Some("https://discord.test/backlog"));
        assert_eq!(config.webhook_url(Source::WikiTool), Some("https://discord.test/kibela"));
    }

    #[test]
    fn test_config_destination_format() {
        assert_eq!(
            config(&[("DESTINATION_FORMAT", "slack")]).destination_format,
            DestinationFormat::Slack
        );
        assert_eq!(
            config(&[("DESTINATION_FORMAT", "carrier-pigeon")]).destination_format,
            DestinationFormat::Discord
        );
    }

    #[test]
    fn test_config_delivery_timeout() {
        assert_eq!(config(&[("DELIVERY_TIMEOUT_SECS", "2")]).delivery_timeout, Duration::from_secs(2));
        assert_eq!(config(&[("DELIVERY_TIMEOUT_SECS", "0")]).delivery_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_format_context() {
        let ctx = config(&[
            ("BACKLOG_BASE_URL", "https://example.backlog.com"),
            ("PROJECT_PREFIX", "PRJ"),
        ])
        .format_context();
        assert_eq!(ctx.backlog_base_url.as_deref(), Some("https://example.backlog.com"));
        assert_eq!(ctx.project_prefix.as_deref(), Some("PRJ"));
    }
}
