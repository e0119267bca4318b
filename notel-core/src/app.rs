//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::AppConfig;
use crate::database::{create_pool, Repository};
use crate::editor::{EditingSession, StrokeSurface};
use crate::error::Result;
use crate::services::{AttachmentsService, NotesService, RecordingsService};
use crate::storage::BlobStore;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repo: Repository,
    pub blob_store: BlobStore,
    pub notes: NotesService,
    pub attachments: AttachmentsService,
    pub recordings: RecordingsService,
}

impl AppState {
    pub fn new(config: AppConfig, repo: Repository, blob_store: BlobStore) -> Self {
        Self {
            notes: NotesService::new(repo.clone()),
            attachments: AttachmentsService::new(repo.clone(), blob_store.clone()),
            recordings: RecordingsService::new(repo.clone(), blob_store.clone()),
            config,
            repo,
            blob_store,
        }
    }

    /// Start editing a note on `initial_page`, else its first page
    pub async fn open_session<S: StrokeSurface>(
        &self,
        note_id: &str,
        initial_page: Option<&str>,
        surface: S,
    ) -> Result<EditingSession<S>> {
        EditingSession::open(
            self.repo.clone(),
            self.blob_store.clone(),
            note_id,
            initial_page,
            surface,
            self.config.history_size,
        )
        .await
    }

    /// Delete blobs no row points at any more
    pub async fn sweep_blobs(&self) -> Result<usize> {
        let referenced = self.repo.referenced_blob_hashes().await?;
        self.blob_store.sweep_unreferenced(&referenced).await
    }
}

/// Application setup - called once on startup
pub async fn setup(config: AppConfig) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", config.data_dir);

    // Create necessary directories
    std::fs::create_dir_all(&config.data_dir)?;

    let pool = create_pool(&config.database_path()).await?;
    let repo = Repository::new(pool);

    let blob_store = BlobStore::new(config.blobs_dir());
    blob_store.initialize().await?;

    let state = AppState::new(config, repo, blob_store);

    tracing::info!("Application initialized successfully");

    Ok(state)
}
