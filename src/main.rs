use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meeting_intel::api::{self, middleware::SecurityConfig, AppState};
use meeting_intel::config::AppConfig;
use meeting_intel::db;

#[derive(Parser)]
#[command(name = "mintel")]
#[command(about = "Meeting intelligence server: specs, plans and backlogs from meeting summaries")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Apply pending database migrations and exit
    Migrate,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "meeting_intel=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &AppConfig) -> anyhow::Result<db::Database> {
    let db = match &config.database_path {
        Some(path) => db::Database::open(path.clone())?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(config: AppConfig, host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting Meeting Intel server on port {}", port);

    let db = open_database(&config)?;
    if config.llm_api_key.is_none() {
        tracing::warn!("No completion API key configured, generation endpoints will fail");
    }

    let security = SecurityConfig::from_env();
    if let Some(limiter) = security.rate_limiter.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        });
    }

    let state = AppState::new(db, config.synthesizer(), config.transcript_client());
    let app = api::create_router(state, security);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("Meeting Intel listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::from_env();

    match cli.command {
        Some(Commands::Serve { port, host }) => serve(config, &host, port).await?,
        Some(Commands::Migrate) => {
            open_database(&config)?;
            tracing::info!("Database is up to date");
        }
        None => serve(config, "127.0.0.1", 3000).await?,
    }

    Ok(())
}
