//! Cafes - a small HTTP API over a catalog of cafes

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cafes::api::{self, AppState};
use cafes::config::{Config, DEFAULT_CONFIG_FILE};
use cafes::store::CafeStore;

#[derive(Parser)]
#[command(name = "cafes")]
#[command(about = "Small HTTP API over a catalog of cafes")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./cafes.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Where to write the config file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },

    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List cafes
    List {
        /// Only cafes at this exact location
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Show catalog statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment before logging so RUST_LOG from .env applies
    let _ = dotenvy::dotenv();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("cafes={},tower_http=debug", log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { path } => {
            if path.exists() {
                anyhow::bail!("Config file already exists at {}", path.display());
            }

            config.save(&path)?;
            CafeStore::open(&config.database_path)?;

            println!("✓ Config written to {}", path.display());
            println!("✓ Database ready at {}", config.database_path.display());
            if config.api_key.is_none() {
                println!("\nNext steps:");
                println!("  1. Set `api_key` in {} (or CAFES_API_KEY)", path.display());
                println!("  2. Run `cafes serve` to start the API server");
            }
        }

        Commands::Serve { port } => {
            let api_key = config.require_api_key()?.to_string();
            let port = port.unwrap_or(config.http_port);

            let store = Arc::new(CafeStore::open(&config.database_path)?);
            tracing::info!(
                "Opened {} with {} cafes",
                config.database_path.display(),
                store.count()?
            );

            let state = AppState::new(store, api_key);
            let router = api::create_router(state, config.static_dir.clone());

            tracing::info!("Starting HTTP server on port {}", port);
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

            println!("Cafes server running at http://localhost:{}", port);
            println!("  API:      http://localhost:{}/all", port);
            println!("  API Docs: http://localhost:{}/api/docs", port);
            println!("  Health:   http://localhost:{}/health", port);

            axum::serve(listener, router).await?;
        }

        Commands::List { location } => {
            let store = CafeStore::open(&config.database_path)?;
            let cafes = match &location {
                Some(loc) => store.list_by_location(loc)?,
                None => store.list_all()?,
            };

            if cafes.is_empty() {
                println!("No cafes found");
            } else {
                for cafe in cafes {
                    let price = cafe.coffee_price.as_deref().unwrap_or("?");
                    let mut amenities = Vec::new();
                    if cafe.has_wifi {
                        amenities.push("wifi");
                    }
                    if cafe.has_sockets {
                        amenities.push("sockets");
                    }
                    if cafe.has_toilet {
                        amenities.push("toilet");
                    }
                    if cafe.can_take_calls {
                        amenities.push("calls");
                    }

                    println!(
                        "{:>4}. {} ({}) {} [{}]",
                        cafe.id,
                        cafe.name,
                        cafe.location,
                        price,
                        amenities.join(", ")
                    );
                }
            }
        }

        Commands::Stats => {
            let store = CafeStore::open(&config.database_path)?;
            let cafes = store.list_all()?;

            let mut locations: Vec<&str> = cafes.iter().map(|c| c.location.as_str()).collect();
            locations.sort();
            locations.dedup();

            println!("Cafe Statistics");
            println!("===============");
            println!("Database:  {}", config.database_path.display());
            println!();
            println!("Cafes:     {}", cafes.len());
            println!("Locations: {}", locations.len());
            println!("With wifi: {}", cafes.iter().filter(|c| c.has_wifi).count());
        }
    }

    Ok(())
}
