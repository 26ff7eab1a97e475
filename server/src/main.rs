use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use smartchef_core::store::SledStore;
use smartchef_core::EngineConfig;
use smartchef_server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Directory for interactions and shopping lists
    #[arg(long, default_value = "./data/store")]
    store: PathBuf,
    /// Optional engine config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path).with_context(|| format!("reading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let store = SledStore::open(&args.store).with_context(|| format!("opening store {}", args.store.display()))?;
    let app: Router = build_app(args.index.clone(), store, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
