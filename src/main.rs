mod config;
mod error;
mod format;
mod preview;
mod relay;
mod rules;
mod server;
mod sinks;
mod sources;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::Request;
use clap::Parser;
use dotenvy::dotenv;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::sources::Source;

#[derive(Parser)]
#[command(name = "yumechi", about = "Relays Backlog and Kibela webhooks to a chat channel")]
enum Cli {
    /// Start the HTTP server (default when no subcommand is given)
    #[command(alias = "run")]
    Serve,
    /// Render a saved webhook payload without posting it
    Preview {
        /// Which service the payload came from: backlog or kibela
        #[arg(long)]
        source: Source,
        /// Path to the JSON payload
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Default to Serve when no subcommand is given, but keep --help working.
    let args: Vec<String> = std::env::args().collect();
    let cli = if args.len() <= 1 { Cli::Serve } else { Cli::parse() };

    match cli {
        Cli::Serve => run_server().await,
        Cli::Preview { source, file } => {
            let config = config::Config::from_env();
            let rendered = preview::render_file(
                source,
                &file,
                &config.format_context(),
                config.destination_format,
            )?;
            println!("{rendered}");
            Ok(())
        }
    }
}

async fn run_server() -> Result<()> {
    let config = config::Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("yumechi=info,tower_http=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true).with_bracketed_fields(false))
        .with(sentry::integrations::tracing::layer().event_filter(
            |metadata| match *metadata.level() {
                tracing::Level::ERROR => sentry::integrations::tracing::EventFilter::Event,
                tracing::Level::WARN | tracing::Level::INFO => {
                    sentry::integrations::tracing::EventFilter::Breadcrumb
                }
                _ => sentry::integrations::tracing::EventFilter::Ignore,
            },
        ))
        .init();

    let _guard = sentry::init((
        config.sentry_dsn.clone().unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            traces_sample_rate: 0.2,
            enable_logs: true,
            ..Default::default()
        },
    ));

    // One shared client; the overall timeout bounds each delivery.
    let http_client = Arc::new(
        sinks::http_client(config.delivery_timeout).context("failed to build HTTP client")?,
    );

    tracing::info!(
        format = ?config.destination_format,
        timeout_secs = config.delivery_timeout.as_secs(),
        "Relay configured"
    );

    let app_state = server::AppState::from_config(&config, http_client);

    let app = server::create_app(app_state)
        .layer(SentryHttpLayer::new().enable_transaction())
        .layer(NewSentryLayer::<Request<Body>>::new_from_top());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
