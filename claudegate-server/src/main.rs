//! Claudegate Server - Headless Daemon
//!
//! Serves `/v1/chat/completions` and `/v1/models` for OpenAI-shaped clients
//! and forwards each exchange to Claude on Vertex AI or the Anthropic API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

mod cli;

use claudegate_core::modules::{config, logger};
use claudegate_core::proxy::common::client_builder::build_http_client;
use claudegate_core::proxy::common::model_mapping::listed_models;
use claudegate_core::proxy::mappers::bridge::{Bridge, BridgeSettings};
use claudegate_core::proxy::{
    AppState, AxumServer, FanoutObserver, JsonlObserver, ServerStartConfig, TracingObserver,
    TransformObserver, UpstreamClient,
};
use claudegate_types::GatewayConfig;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::CheckConfig) => check_config(cli.config),
        Some(Commands::InitConfig { force }) => init_config(cli.config, force),
        Some(Commands::Serve { port, host }) => serve(cli.config, &cli.log_level, port, host).await,
        None => serve(cli.config, &cli.log_level, None, None).await,
    }
}

/// File config, then `CLAUDEGATE_*` environment overrides.
fn effective_config(path: Option<PathBuf>) -> Result<GatewayConfig> {
    let mut cfg = config::load_config(path.as_deref())?;
    config::apply_env_overrides(&mut cfg, |name| std::env::var(name).ok())?;
    Ok(cfg)
}

fn check_config(path: Option<PathBuf>) -> Result<()> {
    let cfg = effective_config(path)?;
    config::validate_config(&cfg)?;
    println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path
        .or_else(config::default_config_path)
        .context("no config path given and the platform has no config directory")?;
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save_config(&path, &GatewayConfig::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn serve(path: Option<PathBuf>, log_level: &str, port: Option<u16>, host: Option<String>) -> Result<()> {
    let mut cfg = effective_config(path)?;
    if let Some(port) = port {
        cfg.port = port;
    }
    if let Some(host) = host {
        cfg.host = host;
    }
    config::validate_config(&cfg)?;

    let _log_guard = logger::init_logging(log_level, cfg.log_dir.as_deref())?;
    info!("Claudegate v{} starting on {}", env!("CARGO_PKG_VERSION"), cfg.get_socket_addr());
    info!(
        backend = %cfg.backend.kind,
        base_url = %cfg.backend.resolved_base_url(),
        mappings = cfg.model_mapping.len(),
        "Backend configured"
    );

    let http_client = build_http_client(cfg.request_timeout_secs)?;
    let upstream = UpstreamClient::new(http_client, cfg.backend.clone())?;

    let mut observers: Vec<Arc<dyn TransformObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(log_path) = &cfg.request_log {
        match JsonlObserver::open(log_path) {
            Ok(sink) => observers.push(Arc::new(sink)),
            Err(e) => warn!("Exchange log disabled, cannot open {}: {}", log_path.display(), e),
        }
    }

    let bridge = Bridge::new(BridgeSettings::from_config(&cfg), Arc::new(FanoutObserver::new(observers)));
    let models = listed_models(&cfg.model_mapping, cfg.backend.kind);
    let state = AppState::new(bridge, Arc::new(upstream), models);

    let server = AxumServer::new(ServerStartConfig { host: cfg.host.clone(), port: cfg.port, state });
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    server
        .run_with(|router| router.layer(cors))
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}
