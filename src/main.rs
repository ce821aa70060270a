use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snpgetr::{
    Cli, builder,
    catalog::Catalog,
    config::{Command, CreateArgs, ServeArgs},
    handlers::{AppState, create_router},
    release,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| cli.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Create(args) => create(args).await,
        Command::Serve(args) => serve(args).await,
    }
}

async fn create(args: CreateArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    let releases = release::load(&args.resource).await?;

    std::fs::create_dir_all(&args.directory)
        .with_context(|| format!("creating {}", args.directory.display()))?;

    let report = tokio::task::spawn_blocking(move || {
        builder::create(
            &releases,
            args.version_filter(),
            args.species_filter(),
            &args.directory,
        )
    })
    .await??;

    tracing::info!("creation time: {:?}", started.elapsed());

    if !report.is_success() {
        for (version, species, e) in &report.failed {
            tracing::error!("{} {}: {}", version, species, e);
        }
        anyhow::bail!(
            "{} of {} stores failed to build",
            report.failed.len(),
            report.failed.len() + report.built.len()
        );
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let catalog = Catalog::scan(&args.db_dir)
        .with_context(|| format!("scanning {}", args.db_dir.display()))?;
    if catalog.is_empty() {
        tracing::warn!("no stores found in {:?}", args.db_dir);
    }

    let state = AppState {
        catalog: Arc::new(catalog),
    };

    let app = create_router(state);
    let app = if args.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let addr = args.bind_address();
    tracing::info!("Starting snpgetr server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
