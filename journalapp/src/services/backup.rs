//! Backup service
//!
//! Snapshots the journal into a [`BackupFile`] and swaps a backup back into
//! the store. Replacing the data sets happens inside one unit of work, so a
//! failed import leaves the previous journal untouched.

use crate::config::{BACKED_UP_PREFERENCE_KEYS, PREF_LAST_EXPORT};
use crate::database::{DataPoint, Day, Repository, StoreCounts, UnitOfWork};
use crate::error::{AppError, Result};
use crate::services::preferences::PreferenceService;
use crate::storage::archive::{self, BackupFile, PreferenceBackup};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Backup service
#[derive(Clone)]
pub struct BackupService {
    repo: Repository,
    preferences: PreferenceService,
}

impl BackupService {
    pub fn new(repo: Repository, preferences: PreferenceService) -> Self {
        Self { repo, preferences }
    }

    /// Snapshot every day, category and point plus the backed-up preferences.
    ///
    /// All three tables are read in one transaction, so a concurrent
    /// reconciliation is either fully in the snapshot or not at all.
    pub async fn create_backup(&self) -> Result<BackupFile> {
        tracing::info!("Creating backup snapshot");

        let mut uow = self.repo.begin().await?;
        let days = uow.list_days().await?;
        let categories = uow.list_categories().await?;
        let points = uow.list_points().await?;
        // Read-only, nothing to keep
        uow.rollback().await?;

        let preferences = self.get_preference_backups().await;

        tracing::info!(
            "Snapshot holds {} days, {} categories, {} points",
            days.len(),
            categories.len(),
            points.len()
        );

        Ok(BackupFile::new(days, categories, points, preferences))
    }

    /// Remove all points, categories and days. Emptying an empty store is a no-op.
    pub async fn delete_db_sets(&self) -> Result<StoreCounts> {
        let mut uow = self.repo.begin().await?;
        let removed = uow.delete_all().await?;
        uow.commit().await?;

        tracing::info!(
            "Deleted {} days, {} categories, {} points",
            removed.days,
            removed.categories,
            removed.points
        );
        Ok(removed)
    }

    /// Insert the backup's days, categories and points
    pub async fn restore_db_sets(&self, backup: &BackupFile) -> Result<StoreCounts> {
        let mut uow = self.repo.begin().await?;
        let restored = restore_into(&mut uow, backup).await?;
        uow.commit().await?;
        Ok(restored)
    }

    /// Delete everything and restore `backup` as one transaction.
    ///
    /// Any failure rolls back to the prior journal and is reported as
    /// [`AppError::ReplaceFailed`].
    pub async fn replace_db_sets(&self, backup: &BackupFile) -> Result<StoreCounts> {
        tracing::info!("Replacing journal with backup");

        let mut uow = self
            .repo
            .begin()
            .await
            .map_err(|e| AppError::ReplaceFailed(e.to_string()))?;

        // Both steps share one transaction; nothing is visible until commit
        let replaced = async {
            uow.delete_all().await?;
            restore_into(&mut uow, backup).await
        }
        .await;

        match replaced {
            Ok(restored) => {
                uow.commit()
                    .await
                    .map_err(|e| AppError::ReplaceFailed(e.to_string()))?;
                tracing::info!("Journal replaced from backup");
                Ok(restored)
            }
            Err(e) => {
                tracing::error!("Replacing journal failed, rolling back: {}", e);
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::error!("Rollback failed: {}", rollback_err);
                }
                Err(AppError::ReplaceFailed(e.to_string()))
            }
        }
    }

    /// Backed-up preference keys that currently have a value
    pub async fn get_preference_backups(&self) -> Vec<PreferenceBackup> {
        let mut backups = Vec::new();
        for key in BACKED_UP_PREFERENCE_KEYS {
            if let Some(value) = self.preferences.get(key).await {
                backups.push(PreferenceBackup {
                    name: key.to_string(),
                    value,
                });
            }
        }
        backups
    }

    /// Write backed-up preferences, overwriting current values.
    ///
    /// Names outside the backed-up key set are ignored.
    pub async fn set_preferences(&self, preferences: &[PreferenceBackup]) -> Result<usize> {
        let mut written = 0;
        for preference in preferences {
            if !BACKED_UP_PREFERENCE_KEYS.contains(&preference.name.as_str()) {
                tracing::warn!("Ignoring unknown preference in backup: {}", preference.name);
                continue;
            }
            self.preferences
                .set(&preference.name, preference.value.as_str())
                .await?;
            written += 1;
        }
        Ok(written)
    }

    /// Export a backup archive into `dir` named for `today`.
    ///
    /// The archive already carries `today` as its last export date, and the
    /// local preference is updated once the file is in place.
    pub async fn export_to_dir(&self, dir: &Path, today: NaiveDate) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;

        let mut backup = self.create_backup().await?;
        backup.set_preference(PREF_LAST_EXPORT, today.to_string());
        let path = dir.join(archive::backup_file_name(today));

        // zip and the file writes are blocking
        let target = path.clone();
        tokio::task::spawn_blocking(move || archive::write_to_path(&backup, &target))
            .await
            .map_err(|e| AppError::Generic(format!("Export task failed: {}", e)))??;

        self.preferences.set(PREF_LAST_EXPORT, today.to_string()).await?;

        tracing::info!("Exported backup to {:?}", path);
        Ok(path)
    }

    /// Read the archive at `path`, replace the journal with it and restore
    /// its preferences.
    ///
    /// Preferences are written after the data commits. If that write fails
    /// the error is [`AppError::PreferencesNotRestored`] and the imported
    /// data stays.
    pub async fn import_from_path(&self, path: &Path) -> Result<StoreCounts> {
        tracing::info!("Importing backup from {:?}", path);

        let source = path.to_path_buf();
        let backup = tokio::task::spawn_blocking(move || archive::read_from_path(&source))
            .await
            .map_err(|e| AppError::Generic(format!("Import task failed: {}", e)))??;

        let restored = self.replace_db_sets(&backup).await?;

        if let Err(e) = self.set_preferences(backup.preferences()).await {
            tracing::error!("Journal imported but preferences were not restored: {}", e);
            return Err(AppError::PreferencesNotRestored(e.to_string()));
        }

        Ok(restored)
    }
}

/// Stage the backup's entities inside `uow`
async fn restore_into(uow: &mut UnitOfWork, backup: &BackupFile) -> Result<StoreCounts> {
    let (days, remapped) = merge_duplicate_dates(backup.days());

    // Parents before children so the foreign keys hold
    for day in &days {
        uow.insert_day(day).await?;
    }
    for category in backup.categories() {
        uow.insert_category(category).await?;
    }
    for point in backup.points() {
        match remapped.get(&point.day_id) {
            Some(&day_id) => {
                let moved = DataPoint {
                    day_id,
                    ..point.clone()
                };
                uow.insert_point(&moved).await?;
            }
            None => uow.insert_point(point).await?,
        }
    }

    tracing::debug!(
        "Restored {} days, {} categories, {} points",
        days.len(),
        backup.categories().len(),
        backup.points().len()
    );

    Ok(StoreCounts {
        days: days.len() as i64,
        categories: backup.categories().len() as i64,
        points: backup.points().len() as i64,
    })
}

/// Keep the first day per date. Returns the kept days and a map from each
/// dropped day ID to the ID of the day that absorbed it.
fn merge_duplicate_dates(days: &[Day]) -> (Vec<Day>, HashMap<Uuid, Uuid>) {
    let mut kept: Vec<Day> = Vec::with_capacity(days.len());
    let mut by_date: HashMap<NaiveDate, usize> = HashMap::new();
    let mut remapped = HashMap::new();

    for day in days {
        match by_date.get(&day.date) {
            Some(&slot) => {
                let survivor = &mut kept[slot];
                if survivor.text.is_none() {
                    survivor.text = day.text.clone();
                }
                remapped.insert(day.id, survivor.id);
            }
            None => {
                by_date.insert(day.date, kept.len());
                kept.push(day.clone());
            }
        }
    }

    if !remapped.is_empty() {
        tracing::warn!("Merged {} days sharing a date", remapped.len());
    }

    (kept, remapped)
}
