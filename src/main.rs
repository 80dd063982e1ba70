//! Yatra Sevak HTTP server
//!
//! Starts an Axum web server that fans chat requests out to the configured
//! LLM providers.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use yatra_sevak::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        return write_template(output.as_deref());
    }

    let config = Arc::new(Config::from_file(&cli.config)?);

    telemetry::init(&config.observability.log_level);

    let state = AppState::new(config.clone())?;
    let enabled = state.orchestrator().providers().enabled_count();
    if enabled == 0 {
        tracing::warn!(
            "No provider has credentials configured; every chat request will fail \
            until at least one provider's api_key_env is set"
        );
    }

    let app = handlers::router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!(
        config_path = %cli.config,
        enabled_providers = enabled,
        "Starting Yatra Sevak on {}",
        addr
    );
    tracing::info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn write_template(output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let template = generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)?;
            eprintln!("Wrote template configuration to {}", path);
        }
        None => print!("{}", template),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
