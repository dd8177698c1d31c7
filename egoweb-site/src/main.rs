//! egoweb-site - personalized CMS page service
//!
//! Serves marketing pages assembled from CMS entries, applying
//! audience-targeted variant content resolved per request.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use egoweb_common::config::SiteConfig;
use egoweb_site::cms::CmsClient;
use egoweb_site::personalization::build_decision_source;
use egoweb_site::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "egoweb-site", version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "EGOWEB_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting egoweb site service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    let mut config = SiteConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let content = Arc::new(CmsClient::new(config.cms.clone())?);
    let decisions = build_decision_source(&config.personalization)?;
    match &decisions {
        Some(source) => info!(strategy = source.name(), "personalization enabled"),
        None => info!("personalization disabled; all modules render baseline"),
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, content, decisions);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("egoweb-site listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
