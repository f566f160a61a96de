//! Saga server entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use saga_core::KnowledgeBase;
use saga_server::{create_router, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Saga: knowledge-graph server for world-building projects
#[derive(Parser, Debug)]
#[command(name = "saga")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to ./saga.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding the config file
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overriding the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, source) = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Saga server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        source = ?source,
        schema_policy = ?config.knowledge.schema_policy,
        radius_per_node = config.knowledge.layout.radius_per_node,
        "Configuration loaded"
    );

    let knowledge = Arc::new(KnowledgeBase::new(config.knowledge.clone()));
    let app = create_router(knowledge, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, prefix = %config.server.api_prefix, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
