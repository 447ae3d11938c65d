//! Repository layer for database operations
//!
//! `Repository` serves read-only snapshot queries straight from the pool.
//! Writes go through a [`UnitOfWork`]: a request-scoped transaction whose
//! changes become durable only when [`UnitOfWork::commit`] is called.
//! Dropping a unit of work without committing rolls it back.

use super::models::*;
use crate::config::WRITE_ATTEMPTS;
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Row counts of the three journal tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub days: i64,
    pub categories: i64,
    pub points: i64,
}

impl StoreCounts {
    pub fn is_empty(&self) -> bool {
        self.days == 0 && self.categories == 0 && self.points == 0
    }
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a new unit of work.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork { tx })
    }

    /// List all days, oldest first
    pub async fn list_days(&self) -> Result<Vec<Day>> {
        let days = sqlx::query_as::<_, Day>("SELECT * FROM days ORDER BY date ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(days)
    }

    /// List all categories, including deleted ones, in display order
    pub async fn list_categories(&self) -> Result<Vec<DataPointCategory>> {
        let categories = sqlx::query_as::<_, DataPointCategory>(
            "SELECT * FROM categories ORDER BY group_name ASC, sort_index ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// List all points, including deleted ones
    pub async fn list_points(&self) -> Result<Vec<DataPoint>> {
        let points =
            sqlx::query_as::<_, DataPoint>("SELECT * FROM points ORDER BY created_at ASC, rowid ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(points)
    }

    /// Get the day recorded for `date`, if any
    pub async fn get_day_by_date(&self, date: NaiveDate) -> Result<Option<Day>> {
        let day = sqlx::query_as::<_, Day>("SELECT * FROM days WHERE date = ?")
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(day)
    }

    /// Get a day together with its points
    pub async fn get_day_with_points(&self, date: NaiveDate) -> Result<Option<(Day, Vec<DataPoint>)>> {
        let Some(day) = self.get_day_by_date(date).await? else {
            return Ok(None);
        };

        let points = self.points_for_day(day.id).await?;
        Ok(Some((day, points)))
    }

    /// List the points recorded for a day
    pub async fn points_for_day(&self, day_id: Uuid) -> Result<Vec<DataPoint>> {
        let points = sqlx::query_as::<_, DataPoint>(
            "SELECT * FROM points WHERE day_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(day_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }

    /// Get a category by ID
    pub async fn get_category(&self, id: Uuid) -> Result<DataPointCategory> {
        sqlx::query_as::<_, DataPointCategory>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::CategoryNotFound(id))
    }

    /// Count the rows of each journal table
    pub async fn counts(&self) -> Result<StoreCounts> {
        let (days, categories, points): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM days),
                (SELECT COUNT(*) FROM categories),
                (SELECT COUNT(*) FROM points)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreCounts {
            days,
            categories,
            points,
        })
    }
}

/// Run a unit of work, starting it over when it loses a write race.
///
/// `op` must open its own [`UnitOfWork`] so every attempt reads fresh data.
/// Any other error, or a conflict on the last attempt, is returned as-is.
pub async fn retry_on_write_conflict<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_write_conflict() && attempt < WRITE_ATTEMPTS => {
                tracing::warn!("Write conflict on attempt {}, retrying: {}", attempt, e);
                // Back off a little more each time
                tokio::time::sleep(Duration::from_millis(10 * attempt as u64)).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// A request-scoped set of reads and writes against one transaction
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Make every staged change durable.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Discard every staged change.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    // ===== Days =====

    /// List all days, oldest first
    pub async fn list_days(&mut self) -> Result<Vec<Day>> {
        let days = sqlx::query_as::<_, Day>("SELECT * FROM days ORDER BY date ASC")
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(days)
    }

    pub async fn find_day_by_date(&mut self, date: NaiveDate) -> Result<Option<Day>> {
        let day = sqlx::query_as::<_, Day>("SELECT * FROM days WHERE date = ?")
            .bind(date)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(day)
    }

    pub async fn get_day(&mut self, id: Uuid) -> Result<Day> {
        sqlx::query_as::<_, Day>("SELECT * FROM days WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(AppError::DayNotFound(id))
    }

    /// Insert a day, failing if its ID or date already exists
    pub async fn insert_day(&mut self, day: &Day) -> Result<()> {
        sqlx::query("INSERT INTO days (id, date, text) VALUES (?, ?, ?)")
            .bind(day.id)
            .bind(day.date)
            .bind(&day.text)
            .execute(&mut *self.tx)
            .await?;

        tracing::debug!("Inserted day {} for {}", day.id, day.date);
        Ok(())
    }

    /// Return the day for `date`, inserting a new one when none exists.
    ///
    /// The boolean is true when this call created the row. A concurrent
    /// insert of the same date resolves to the row that won.
    pub async fn get_or_insert_day(&mut self, date: NaiveDate) -> Result<(Day, bool)> {
        if let Some(day) = self.find_day_by_date(date).await? {
            return Ok((day, false));
        }

        let candidate = Day::new(date);
        let inserted = sqlx::query(
            "INSERT INTO days (id, date, text) VALUES (?, ?, ?) ON CONFLICT(date) DO NOTHING",
        )
        .bind(candidate.id)
        .bind(candidate.date)
        .bind(&candidate.text)
        .execute(&mut *self.tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            tracing::debug!("Created day {} for {}", candidate.id, date);
            return Ok((candidate, true));
        }

        tracing::warn!("Day for {} was created concurrently, reusing it", date);
        let day = self
            .find_day_by_date(date)
            .await?
            .ok_or_else(|| AppError::Generic(format!("Day for {} vanished after conflict", date)))?;
        Ok((day, false))
    }

    // ===== Categories =====

    pub async fn list_categories(&mut self) -> Result<Vec<DataPointCategory>> {
        let categories = sqlx::query_as::<_, DataPointCategory>(
            "SELECT * FROM categories ORDER BY group_name ASC, sort_index ASC, rowid ASC",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(categories)
    }

    pub async fn find_category(&mut self, id: Uuid) -> Result<Option<DataPointCategory>> {
        let category = sqlx::query_as::<_, DataPointCategory>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(category)
    }

    pub async fn get_category(&mut self, id: Uuid) -> Result<DataPointCategory> {
        self.find_category(id)
            .await?
            .ok_or(AppError::CategoryNotFound(id))
    }

    /// Highest index used in `group`, or 0 when the group is empty
    pub async fn max_category_index(&mut self, group: Option<&str>) -> Result<i64> {
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_index), 0) FROM categories WHERE group_name IS ?",
        )
        .bind(group)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(max)
    }

    pub async fn insert_category(&mut self, category: &DataPointCategory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (
                id, group_name, name, sort_index, status, read_only, enabled, data_type,
                medication_dose, medication_unit, medication_every_day_since, details
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id)
        .bind(&category.group)
        .bind(&category.name)
        .bind(category.index)
        .bind(category.status)
        .bind(category.read_only)
        .bind(category.enabled)
        .bind(category.data_type)
        .bind(category.medication_dose)
        .bind(&category.medication_unit)
        .bind(category.medication_every_day_since)
        .bind(&category.details)
        .execute(&mut *self.tx)
        .await?;

        tracing::debug!("Inserted category {} ({})", category.id, category.name);
        Ok(())
    }

    pub async fn update_category(&mut self, category: &DataPointCategory) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE categories SET
                group_name = ?, name = ?, sort_index = ?, status = ?, read_only = ?,
                enabled = ?, data_type = ?, medication_dose = ?, medication_unit = ?,
                medication_every_day_since = ?, details = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.group)
        .bind(&category.name)
        .bind(category.index)
        .bind(category.status)
        .bind(category.read_only)
        .bind(category.enabled)
        .bind(category.data_type)
        .bind(category.medication_dose)
        .bind(&category.medication_unit)
        .bind(category.medication_every_day_since)
        .bind(&category.details)
        .bind(category.id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::CategoryNotFound(category.id));
        }

        Ok(())
    }

    pub async fn set_category_index(&mut self, id: Uuid, index: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE categories SET sort_index = ? WHERE id = ?")
            .bind(index)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    // ===== Points =====

    /// List all points, including deleted ones
    pub async fn list_points(&mut self) -> Result<Vec<DataPoint>> {
        let points =
            sqlx::query_as::<_, DataPoint>("SELECT * FROM points ORDER BY created_at ASC, rowid ASC")
                .fetch_all(&mut *self.tx)
                .await?;

        Ok(points)
    }

    pub async fn points_for_day(&mut self, day_id: Uuid) -> Result<Vec<DataPoint>> {
        let points = sqlx::query_as::<_, DataPoint>(
            "SELECT * FROM points WHERE day_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(day_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(points)
    }

    /// Number of points ever recorded per category
    pub async fn point_counts_by_category(&mut self) -> Result<HashMap<Uuid, i64>> {
        let rows: Vec<(Uuid, i64)> =
            sqlx::query_as("SELECT category_id, COUNT(*) FROM points GROUP BY category_id")
                .fetch_all(&mut *self.tx)
                .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn insert_point(&mut self, point: &DataPoint) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO points (
                id, day_id, category_id, created_at, data_type, deleted, mood, sleep_hours,
                scale_index, bool_value, number, text, medication_dose
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(point.id)
        .bind(point.day_id)
        .bind(point.category_id)
        .bind(point.created_at)
        .bind(point.data_type)
        .bind(point.deleted)
        .bind(&point.mood)
        .bind(point.sleep_hours)
        .bind(point.scale_index)
        .bind(point.bool_value)
        .bind(point.number)
        .bind(&point.text)
        .bind(point.medication_dose)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Persist the value fields of an existing point
    pub async fn update_point(&mut self, point: &DataPoint) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE points SET
                deleted = ?, mood = ?, sleep_hours = ?, scale_index = ?, bool_value = ?,
                number = ?, text = ?, medication_dose = ?
            WHERE id = ?
            "#,
        )
        .bind(point.deleted)
        .bind(&point.mood)
        .bind(point.sleep_hours)
        .bind(point.scale_index)
        .bind(point.bool_value)
        .bind(point.number)
        .bind(&point.text)
        .bind(point.medication_dose)
        .bind(point.id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::PointNotFound(point.id));
        }

        Ok(())
    }

    // ===== Bulk =====

    /// Delete every point, category and day. Returns what was removed.
    pub async fn delete_all(&mut self) -> Result<StoreCounts> {
        let points = sqlx::query("DELETE FROM points")
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        let categories = sqlx::query("DELETE FROM categories")
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        let days = sqlx::query("DELETE FROM days")
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(StoreCounts {
            days: days as i64,
            categories: categories as i64,
            points: points as i64,
        })
    }
}
