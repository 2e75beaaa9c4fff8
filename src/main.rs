use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sole_protocol::api::{self, AppState};
use sole_protocol::auth::hosted::HostedAuth;
use sole_protocol::auth::memory::InMemoryAuth;
use sole_protocol::auth::AuthProvider;
use sole_protocol::config::BackendKind;
use sole_protocol::hosted::HostedClient;
use sole_protocol::storage::hosted::HostedStorage;
use sole_protocol::storage::memory::InMemoryStore;
use sole_protocol::storage::postgres::PostgresStorage;
use sole_protocol::storage::Storage;
use sole_protocol::Config;

#[derive(Parser)]
#[command(name = "sole-protocol")]
#[command(about = "Agent mission tracking and audit service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        #[arg(short, long, help = "Port to listen on (overrides config)")]
        port: Option<u16>,
        #[arg(short, long, help = "Path to a TOML config file")]
        config: Option<PathBuf>,
    },
    /// Validate configuration and print the masked connection info
    CheckConfig {
        #[arg(short, long, help = "Path to a TOML config file")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => {
            let config = Config::load(config.as_deref())?;
            config.validate()?;
            let port = port.unwrap_or(config.port);

            let (storage, provider) = build_backends(&config).await?;
            log::info!("Using {} backend", config.backend.as_str());

            api::serve(AppState::new(storage, provider, config), port).await?;
        }
        Commands::CheckConfig { config } => {
            let config = Config::load(config.as_deref())?;
            config.validate()?;

            println!("backend:     {}", config.backend.as_str());
            println!(
                "backend url: {}",
                config.masked_backend_url().unwrap_or_else(|| "-".to_string())
            );
            println!(
                "backend key: {}",
                config.masked_backend_key().unwrap_or_else(|| "-".to_string())
            );
            println!("port:        {}", config.port);
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sole_protocol=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn hosted_client(config: &Config) -> Option<HostedClient> {
    match (&config.backend_url, &config.backend_key) {
        (Some(url), Some(key)) => Some(HostedClient::new(url.clone(), key.clone())),
        _ => None,
    }
}

async fn build_backends(
    config: &Config,
) -> Result<(Arc<dyn Storage>, Arc<dyn AuthProvider>)> {
    match config.backend {
        BackendKind::Memory => {
            let storage: Arc<dyn Storage> = Arc::new(InMemoryStore::new());
            let provider: Arc<dyn AuthProvider> = Arc::new(InMemoryAuth::new());
            Ok((storage, provider))
        }
        BackendKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL not set"))?;
            let storage = PostgresStorage::new(url).await?;
            storage.run_migrations().await?;

            let provider: Arc<dyn AuthProvider> = match hosted_client(config) {
                Some(client) => Arc::new(HostedAuth::new(client)),
                None => {
                    log::warn!("No hosted auth configured, identities are kept in memory");
                    Arc::new(InMemoryAuth::new())
                }
            };
            let storage: Arc<dyn Storage> = Arc::new(storage);
            Ok((storage, provider))
        }
        BackendKind::Hosted => {
            let client = hosted_client(config)
                .ok_or_else(|| anyhow!("SUPABASE_URL and SUPABASE_ANON_KEY must be set"))?;
            let storage: Arc<dyn Storage> = Arc::new(HostedStorage::new(client.clone()));
            let provider: Arc<dyn AuthProvider> = Arc::new(HostedAuth::new(client));
            Ok((storage, provider))
        }
    }
}
