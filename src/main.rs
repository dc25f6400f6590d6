//! Bellwether node binary.
//!
//! Joins the election namespace, serves the HTTP control surface, and
//! supervises the engine task. Configuration is layered environment < TOML
//! file < CLI flags and validated before any session is opened.
//!
//! The coordination backend is constructed behind the connector seam: this
//! binary ships the embedded deterministic backend; a remote backend plugs
//! into the same seam without touching the rest of the node.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use bellwether::config::NodeConfig;
use bellwether::server;
use bellwether_core::CoordinationConnector;
use bellwether_election::ElectionEngine;
use bellwether_election::ElectionError;
use bellwether_election::ExpiryPolicy;
use bellwether_testing::DeterministicCoordinationService;
use clap::Parser;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Leader election node with an HTTP control surface.
#[derive(Parser, Debug)]
#[command(name = "bellwether", version, about)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Coordination service endpoint address.
    #[arg(long)]
    endpoint: Option<String>,

    /// Namespace prefix for the peers/leader paths.
    #[arg(long)]
    namespace: Option<String>,

    /// Self-description registered alongside this node's identity.
    #[arg(long)]
    description: Option<String>,

    /// Coordination session timeout in milliseconds.
    #[arg(long)]
    session_timeout_ms: Option<u64>,

    /// Bounded wait for the initial connection, in milliseconds.
    #[arg(long)]
    connection_timeout_ms: Option<u64>,

    /// Start passively observing instead of contending for leadership.
    #[arg(long)]
    watch_only: bool,

    /// Recovery policy for session expiry: fail-fast or self-heal.
    #[arg(long)]
    expiry_policy: Option<ExpiryPolicy>,

    /// HTTP control-surface port.
    #[arg(long)]
    http_port: Option<u16>,

    /// HTTP control-surface bind address.
    #[arg(long)]
    http_bind_addr: Option<String>,
}

/// Initialize tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

/// Build node configuration, layered environment < file < CLI flags.
fn load_config(args: &Args) -> Result<NodeConfig> {
    let mut config = NodeConfig::from_env();
    if let Some(path) = &args.config {
        config.apply_file(path).context("applying config file")?;
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(namespace) = &args.namespace {
        config.namespace = Some(namespace.clone());
    }
    if let Some(description) = &args.description {
        config.description = description.clone();
    }
    if let Some(value) = args.session_timeout_ms {
        config.session_timeout_ms = value;
    }
    if let Some(value) = args.connection_timeout_ms {
        config.connection_timeout_ms = value;
    }
    if args.watch_only {
        config.contend_on_start = false;
    }
    if let Some(policy) = args.expiry_policy {
        config.expiry_policy = policy;
    }
    if let Some(port) = args.http_port {
        config.http.port = port;
    }
    if let Some(bind_addr) = &args.http_bind_addr {
        config.http.bind_addr = bind_addr.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;
    config.validate().context("invalid configuration")?;

    info!(
        endpoint = %config.endpoint,
        namespace = ?config.namespace,
        session_timeout_ms = config.session_timeout_ms,
        "starting bellwether node"
    );

    // Embedded deterministic backend behind the connector seam.
    let service = DeterministicCoordinationService::new();
    let connector: Arc<dyn CoordinationConnector> = Arc::new(service.connector());

    let (handle, mut engine_task) = ElectionEngine::start(connector, config.election_config())
        .await
        .context("starting election engine")?;

    let addr: SocketAddr = format!("{}:{}", config.http.bind_addr, config.http.port)
        .parse()
        .context("invalid http bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "control surface listening");
    let router = server::build_router(handle.clone());

    tokio::select! {
        result = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()) => {
            result.context("http server failed")?;
            let _ = handle.stop();
            match (&mut engine_task).await {
                Ok(Ok(())) => info!("election engine stopped"),
                Ok(Err(err)) => error!(%err, "election engine failed during shutdown"),
                Err(join_error) => error!(%join_error, "election engine task panicked"),
            }
        }
        result = &mut engine_task => {
            match result {
                Ok(Ok(())) => info!("election engine stopped"),
                Ok(Err(err)) => {
                    error!(%err, "election engine failed");
                    // Fail-fast expiry: exit so a supervisor restarts the
                    // process with a clean session.
                    if matches!(err, ElectionError::SessionExpired) {
                        std::process::exit(2);
                    }
                    return Err(err.into());
                }
                Err(join_error) => return Err(anyhow!("election engine task panicked: {join_error}")),
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
