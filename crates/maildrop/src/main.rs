//! `maildrop` - POP3 server daemon
//!
//! Serves in-memory maildrops over RFC 1939 POP3, plain TCP or
//! implicit TLS, configured from a JSON file.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod server;
mod tls;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maildrop_store::{MemoryAuthorizator, MemoryBackend};

use config::ServerConfig;
use server::Server;

/// POP3 server daemon.
#[derive(Debug, Parser)]
#[command(name = "maildrop", version, about)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file.
    #[arg(long)]
    listen: Option<String>,

    /// Permit USER/PASS on unencrypted connections.
    #[arg(long)]
    allow_insecure_auth: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maildrop=debug,maildrop_pop3=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if args.allow_insecure_auth {
        config.allow_insecure_auth = true;
    }

    info!("Starting maildrop");

    let backend = MemoryBackend::new();
    let mut authorizator = MemoryAuthorizator::new();
    for user in &config.users {
        backend.add_user(&user.username);
        authorizator = authorizator.with_user(&user.username, &user.password);
    }

    Server::new(config, Arc::new(backend), Arc::new(authorizator))?
        .run()
        .await
}
