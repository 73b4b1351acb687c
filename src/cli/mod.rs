use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::app::{router, AppState};
use crate::config::{self, AppConfig};
use crate::models::default_catalog;
use crate::store::{MemoryStore, PgStore, SideEffectCatalog, Store};

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Medication tracking API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Override PORT")]
        port: Option<u16>,

        #[arg(long, help = "Keep all data in process memory instead of PostgreSQL")]
        in_memory: bool,
    },

    #[command(about = "Apply the embedded database migrations")]
    Migrate,

    #[command(about = "Insert the default side-effect catalog")]
    Seed,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::config().clone();
    config.validate().context("invalid configuration")?;

    match cli.command {
        Commands::Serve { port, in_memory } => serve(config, port, in_memory).await,
        Commands::Migrate => {
            let store = connect(&config).await?;
            store.run_migrations().await.context("migration failed")?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Commands::Seed => {
            let store = connect(&config).await?;
            let added = store
                .seed_side_effect_types(default_catalog())
                .await
                .context("seeding the side-effect catalog failed")?;
            tracing::info!(added, "side-effect catalog seeded");
            Ok(())
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgStore> {
    PgStore::connect(&config.database)
        .await
        .context("failed to connect to the database")
}

async fn serve(mut config: AppConfig, port: Option<u16>, in_memory: bool) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let store: Arc<dyn Store> = if in_memory {
        tracing::warn!("using the in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let store = connect(&config).await?;
        store.run_migrations().await.context("migration failed")?;
        Arc::new(store)
    };

    let bind_addr = format!("{}:{}", config.server.bind_address, config.server.port);
    tracing::info!(
        environment = ?config.environment,
        auth = ?config.auth.strategy,
        store = store.backend(),
        "starting medtrack api"
    );

    let app = router(AppState::new(config, store));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
