//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{BACKUPS_DIR_NAME, DATABASE_FILE_NAME, PREF_LAUNCH_COUNT};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{BackupService, CategoryService, JournalService, PreferenceService};
use std::path::{Path, PathBuf};

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub repo: Repository,
    pub preferences: PreferenceService,
    pub journal: JournalService,
    pub categories: CategoryService,
    pub backups: BackupService,
}

impl AppState {
    /// Open the journal stored in `app_data_dir`, creating it on first launch
    pub async fn initialize(app_data_dir: &Path) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("App data directory: {:?}", app_data_dir);

        // Create necessary directories
        std::fs::create_dir_all(app_data_dir)?;
        std::fs::create_dir_all(app_data_dir.join(BACKUPS_DIR_NAME))?;

        let pool = create_pool(&app_data_dir.join(DATABASE_FILE_NAME)).await?;
        let repo = Repository::new(pool);

        let preferences = PreferenceService::open(app_data_dir).await?;
        // Count this launch before anything else can read the counter
        let launch_count = preferences.get_u64(PREF_LAUNCH_COUNT).await + 1;
        preferences
            .set(PREF_LAUNCH_COUNT, launch_count.to_string())
            .await?;

        // Built-in categories must exist before the first reconciliation
        let journal = JournalService::new(repo.clone());
        let seeded = journal.seed_default_categories().await?;
        if seeded > 0 {
            tracing::info!("Seeded {} default categories", seeded);
        }

        let state = Self {
            app_data_dir: app_data_dir.to_path_buf(),
            categories: CategoryService::new(repo.clone()),
            backups: BackupService::new(repo.clone(), preferences.clone()),
            journal,
            preferences,
            repo,
        };

        tracing::info!("Application initialized (launch {})", launch_count);
        Ok(state)
    }

    /// Default directory for exported backups
    pub fn backups_dir(&self) -> PathBuf {
        self.app_data_dir.join(BACKUPS_DIR_NAME)
    }

    /// Close the database pool
    pub async fn shutdown(self) {
        self.repo.pool().close().await;
        tracing::info!("Application shut down");
    }
}
