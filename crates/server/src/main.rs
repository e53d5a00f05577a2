use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use taggate_gateway::GatewayBuilder;
use taggate_server::api::{AppState, router};
use taggate_server::auth::AuthKeys;
use taggate_server::config::TaggateConfig;
use taggate_server::error::ServerError;
use taggate_server::factory;

/// Taggate gateway HTTP server.
#[derive(Parser, Debug)]
#[command(name = "taggate-server", about = "HTTP server for the Taggate gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "taggate.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber from RUST_LOG or default to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does
    // not exist.
    let config: TaggateConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        TaggateConfig::default()
    };

    // Create the backends.
    let state = factory::create_state(&config.state)?;
    info!(backend = %config.state.backend, "state store initialized");

    let tiers = factory::create_tiers(&config.tiers).await?;
    info!(backend = %config.tiers.backend, "tier store initialized");

    let tokens = factory::create_token_provider(&config.identity)?;

    // Build the gateway; this also validates the throttle/limiter
    // configuration relationship.
    let gateway = GatewayBuilder::new()
        .state(state)
        .tiers(tiers)
        .tokens(tokens)
        .executor_config(config.executor.resolve())
        .rate_limit_config(config.rate_limit.clone())
        .cache_config(config.cache.resolve())
        .build()
        .map_err(|e| ServerError::Config(e.to_string()))?;

    if config.auth.keys.is_empty() {
        tracing::warn!("no bearer keys configured; every request will be rejected");
    }

    let app_state = AppState {
        gateway: Arc::new(gateway),
        keys: Arc::new(AuthKeys::new(&config.auth.keys)),
    };
    let app = router(app_state);

    // Resolve the bind address (CLI overrides take precedence).
    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "taggate-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("taggate-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful
/// shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
