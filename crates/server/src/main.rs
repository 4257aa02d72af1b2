//! Self-hosted gallery for interactive prototype bundles.
//!
//! Operators upload zip bundles through the API; each bundle is extracted
//! under the managed directory and served at `/project/{id}/`.

mod routes;
mod state;

use anyhow::Context;
use clap::Parser;
use registry::{ProjectRegistry, ProjectService, ProjectStorage};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "gallery")]
#[command(version, about = "Self-hosted gallery for prototype bundles", long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0:80")]
    listen: SocketAddr,

    /// Destination folder for extracted projects (default: next to the executable)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Registry document (default: db.json next to the executable)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Front-end assets (default: web/ next to the executable)
    #[arg(long)]
    web: Option<PathBuf>,

    /// Maximum upload size in bytes
    #[arg(long, default_value = "104857600")]
    max_upload: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Self-hosted prototype gallery {}", env!("CARGO_PKG_VERSION"));

    let app_dir = app_dir()?;
    let project_dir = cli.dir.unwrap_or_else(|| app_dir.clone());
    let db_path = cli.db.unwrap_or_else(|| app_dir.join("db.json"));
    let web_dir = cli.web.unwrap_or_else(|| app_dir.join("web"));

    let registry = ProjectRegistry::open(&db_path)
        .with_context(|| format!("failed to load registry {}", db_path.display()))?;
    let storage = ProjectStorage::new(&project_dir);
    let state = AppState::new(ProjectService::new(registry, storage), web_dir);

    let app = routes::router(state, cli.max_upload);
    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    info!(
        addr = %cli.listen,
        projects = %project_dir.display(),
        "Listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Directory containing the running executable.
fn app_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    Ok(exe
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".")))
}
