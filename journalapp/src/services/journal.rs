//! Journal service
//!
//! Entry points the UI layer calls for day-level work. Each call runs in its
//! own unit of work and commits before returning. Calls that may create a
//! day start over when another context wins the write race, so both end up
//! with the same row.

use crate::database::{retry_on_write_conflict, DataPoint, Day, Repository};
use crate::dates::date_range;
use crate::error::{AppError, Result};
use crate::services::reconcile::{self, ReconciledDay};
use chrono::NaiveDate;
use rand::RngCore;

/// Totals of a range backfill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillSummary {
    pub days_created: usize,
    pub points_added: usize,
}

/// Service for reconciling days and recording entries
#[derive(Clone)]
pub struct JournalService {
    repo: Repository,
}

impl JournalService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Insert any missing built-in categories
    pub async fn seed_default_categories(&self) -> Result<usize> {
        let mut uow = self.repo.begin().await?;
        let added = reconcile::seed_default_categories(&mut uow).await?;
        uow.commit().await?;
        Ok(added)
    }

    /// Get the day for `date` with a point for every tracked category
    pub async fn get_or_create_day(&self, date: NaiveDate) -> Result<ReconciledDay> {
        retry_on_write_conflict(|| async move {
            let mut uow = self.repo.begin().await?;
            let day = reconcile::get_or_create_day_and_add_points(&mut uow, date, None).await?;
            uow.commit().await?;
            Ok::<_, AppError>(day)
        })
        .await
    }

    /// Reconcile every day from `start` to `end` with random values.
    ///
    /// Demo and debug seeding only. The whole range commits at once.
    pub async fn fill_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        rng: &mut (dyn RngCore + Send),
    ) -> Result<FillSummary> {
        tracing::info!("Filling demo data from {} to {}", start, end);

        let mut uow = self.repo.begin().await?;
        let mut summary = FillSummary::default();

        for date in date_range(start, end) {
            let day =
                reconcile::get_or_create_day_and_add_points(&mut uow, date, Some(&mut *rng)).await?;
            if day.created_day {
                summary.days_created += 1;
            }
            summary.points_added += day.added.len();
        }

        uow.commit().await?;

        tracing::info!(
            "Demo fill complete: {} days created, {} points added",
            summary.days_created,
            summary.points_added
        );
        Ok(summary)
    }

    /// Add a note to the day for `date`, creating the day if needed
    pub async fn create_note(&self, date: NaiveDate, text: &str) -> Result<DataPoint> {
        retry_on_write_conflict(|| async move {
            let mut uow = self.repo.begin().await?;
            let (day, _) = uow.get_or_insert_day(date).await?;
            let note = reconcile::create_note(&mut uow, &day, Some(text)).await?;
            uow.commit().await?;
            Ok::<_, AppError>(note)
        })
        .await
    }

    /// Persist edited point values
    pub async fn save_point(&self, point: &DataPoint) -> Result<()> {
        let mut uow = self.repo.begin().await?;
        uow.update_point(point).await?;
        uow.commit().await
    }

    /// Load a day and its points without reconciling it
    pub async fn get_day(&self, date: NaiveDate) -> Result<Option<(Day, Vec<DataPoint>)>> {
        self.repo.get_day_with_points(date).await
    }
}
