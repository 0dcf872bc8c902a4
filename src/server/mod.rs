pub mod middleware;
pub mod routes;

use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::format::FormatContext;
use crate::sinks::{self, Sink};
use crate::sources::Source;

#[derive(Clone)]
pub struct AppState {
    pub format_ctx: Arc<FormatContext>,
    /// Outgoing webhook per source. A missing entry means "not configured".
    pub sinks: Arc<HashMap<Source, Arc<dyn Sink>>>,
}

impl AppState {
    pub fn from_config(config: &Config, http_client: Arc<reqwest::Client>) -> Self {
        let mut sinks: HashMap<Source, Arc<dyn Sink>> = HashMap::new();
        for source in [Source::IssueTracker, Source::WikiTool] {
            match config.webhook_url(source) {
                Some(url) => {
                    sinks.insert(
                        source,
                        sinks::webhook_sink(config.destination_format, http_client.clone(), url.to_string()),
                    );
                }
                None => tracing::warn!(%source, "No outgoing webhook configured; events will fail delivery"),
            }
        }

        Self {
            format_ctx: Arc::new(config.format_context()),
            sinks: Arc::new(sinks),
        }
    }

    pub fn sink(&self, source: Source) -> Option<&dyn Sink> {
        self.sinks.get(&source).map(|s| s.as_ref())
    }
}

pub fn create_app(state: AppState) -> Router {
    routes::build_router(state)
}
