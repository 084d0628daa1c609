use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use tagfinder::app::App;
use tagfinder::config::{self, Config};

/// tagfinder: find posts with tags your users follow and bring them home.
///
/// Connects to the public stream of every listed server. Any post carrying a
/// tag followed by a listed user is resolved on that user's home server, so
/// it shows up in their home feed.
#[derive(Parser)]
#[command(name = "tagfinder", version, about)]
struct Cli {
    /// List of servers to connect to, one per line
    server_list_file: PathBuf,

    /// List of users, one "server,access_token" per line (token needs read:follows and read:search)
    user_list_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tagfinder=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let servers = config::load_servers(&cli.server_list_file)?;
    let users = config::load_users(&cli.user_list_file)?;

    info!(
        servers = servers.len(),
        users = users.len(),
        "Starting tagfinder"
    );

    App::new(config, &servers, &users)?.run().await
}
