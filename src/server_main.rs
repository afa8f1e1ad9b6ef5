//! Memordo backend server: the per-user visit history REST API.

use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;

use memordo::config::ServerConfig;
use memordo::database::Database;
use memordo::server::routes::{router, AppState};

#[derive(Parser)]
#[command(name = "memordo-server", version, about = "Memordo visit history server")]
struct Cli {
    /// Path to a JSON server config
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bind address, overrides config and MEMORDO_BIND
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("memordo-server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("memordo.db"));
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(&db_path)?;
    info!("Database ready at {}", db_path.display());

    let app = router(AppState::new(db, config.token_policy()));
    let listener = TcpListener::bind(&config.bind).await?;
    info!("Memordo server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
