// Notel - headless maintenance entry point
// Opens the data directory, reports what it holds and sweeps orphaned blobs

use anyhow::Context;
use notel::app;
use notel::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notel=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Notel maintenance");

    let config = AppConfig::from_env();
    let state = app::setup(config)
        .await
        .context("failed to initialize data directory")?;

    let topics = state.notes.list_topics().await?;
    let notes = state.notes.list_notes().await?;
    let unfiled = state.notes.list_unfiled_notes().await?;
    tracing::info!(
        "{} topic(s), {} note(s), {} unfiled",
        topics.len(),
        notes.len(),
        unfiled.len()
    );

    let removed = state.sweep_blobs().await.context("blob sweep failed")?;
    tracing::info!("Maintenance finished, {} blob(s) reclaimed", removed);

    Ok(())
}
