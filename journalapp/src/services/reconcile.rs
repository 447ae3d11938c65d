//! Day reconciliation
//!
//! Makes sure a day exists and carries exactly one point for every tracked
//! category. The decision of *which* points are missing is a pure function
//! over loaded rows ([`missing_points`]); [`get_or_create_day_and_add_points`]
//! loads those rows and stages the result inside the caller's unit of work.
//! Nothing is durable until the caller commits.

use crate::config::{
    ANXIETY_CATEGORY_ID, ENERGY_CATEGORY_ID, HEADACHE_CATEGORY_ID, MAX_SCALE_INDEX, MOOD_EMOJIS,
    NOTES_CATEGORY_ID, NOTES_GROUP, OVERALL_MOOD_CATEGORY_ID, SLEEP_CATEGORY_ID, SLEEP_STEP_HOURS,
    WELCOME_NOTE_TEXT,
};
use crate::database::{DataPoint, DataPointCategory, DataType, Day, UnitOfWork};
use crate::error::{AppError, Result};
use crate::services::categories::add_category;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::collections::HashMap;
use uuid::Uuid;

/// Outcome of reconciling one date
#[derive(Debug, Clone)]
pub struct ReconciledDay {
    pub day: Day,
    /// True when this reconciliation created the day row
    pub created_day: bool,
    /// Every point of the day, existing ones first
    pub points: Vec<DataPoint>,
    /// IDs of the points this reconciliation added
    pub added: Vec<Uuid>,
}

/// Points `day` is missing for the given categories.
///
/// - The notes category only produces a single welcome note, and only while
///   it has no points at all (`category_point_counts` is the store-wide
///   count per category before this call). Its enabled and deleted flags
///   are not consulted.
/// - Disabled and deleted categories outside the notes group never produce
///   points.
/// - Any other category produces a point unless the day already has one
///   with the same category and type.
/// - Medication categories taken "every day since" a date mark the new
///   point as taken on and after that date.
/// - `rng` fills plausible random values for demo data. Pass `None` for
///   real reconciliation.
pub fn missing_points(
    day: &Day,
    day_points: &[DataPoint],
    categories: &[DataPointCategory],
    category_point_counts: &HashMap<Uuid, i64>,
    mut rng: Option<&mut (dyn RngCore + Send)>,
) -> Vec<DataPoint> {
    let mut missing = Vec::new();

    for category in categories {
        if category.in_group(Some(NOTES_GROUP)) {
            let has_points = category_point_counts.get(&category.id).copied().unwrap_or(0) > 0
                || day_points.iter().any(|p| p.category_id == category.id);

            if !has_points {
                let mut note = DataPoint::new(day, category);
                note.data_type = DataType::Note;
                note.text = Some(WELCOME_NOTE_TEXT.to_string());
                missing.push(note);
            }
            continue;
        }

        if !category.is_tracked() || day_points.iter().any(|p| p.belongs_to(category)) {
            continue;
        }

        let mut point = DataPoint::new(day, category);

        if category.data_type == DataType::Medication {
            let taken_every_day = category
                .medication_every_day_since
                .is_some_and(|since| day.date >= since.date_naive());
            if taken_every_day {
                point.bool_value = Some(true);
            }
        }

        if let Some(rng) = rng.as_deref_mut() {
            randomize(&mut point, rng);
        }

        missing.push(point);
    }

    missing
}

fn randomize(point: &mut DataPoint, rng: &mut (dyn RngCore + Send)) {
    match point.data_type {
        DataType::Mood => point.mood = MOOD_EMOJIS.choose(rng).map(|m| m.to_string()),
        DataType::Sleep => {
            let half_hours: i32 = rng.gen_range(8..=20);
            point.sleep_hours = Some(f64::from(half_hours) * SLEEP_STEP_HOURS);
        }
        DataType::Scale | DataType::LowToHigh | DataType::MildToSevere => {
            point.scale_index = Some(rng.gen_range(1..=MAX_SCALE_INDEX));
        }
        DataType::Bool => point.bool_value = Some(rng.gen_bool(0.5)),
        DataType::Number => {
            let value: i32 = rng.gen_range(0..=10);
            point.number = Some(f64::from(value));
        }
        DataType::Medication => {
            if point.bool_value.is_none() {
                point.bool_value = Some(rng.gen_bool(0.8));
            }
        }
        DataType::Text | DataType::Note => {}
    }
}

/// Return the day for `date`, creating it if needed, and stage a point for
/// every tracked category it is missing.
///
/// Calling this again for the same date adds nothing: the day is looked up
/// before it is created and points are matched on category and type.
pub async fn get_or_create_day_and_add_points(
    uow: &mut UnitOfWork,
    date: NaiveDate,
    rng: Option<&mut (dyn RngCore + Send)>,
) -> Result<ReconciledDay> {
    let (day, created_day) = uow.get_or_insert_day(date).await?;

    // A fresh day has no points yet
    let mut points = if created_day {
        Vec::new()
    } else {
        uow.points_for_day(day.id).await?
    };

    let categories = uow.list_categories().await?;
    // Store-wide counts decide whether the welcome note is still due
    let counts = uow.point_counts_by_category().await?;

    let missing = missing_points(&day, &points, &categories, &counts, rng);
    let mut added = Vec::with_capacity(missing.len());

    for point in missing {
        uow.insert_point(&point).await?;
        added.push(point.id);
        points.push(point);
    }

    if !added.is_empty() {
        tracing::debug!("Reconciled {}: added {} points", date, added.len());
    }

    Ok(ReconciledDay {
        day,
        created_day,
        points,
        added,
    })
}

/// Stage a new note on `day`.
///
/// Fails with an invalid-operation error when the built-in notes category
/// is missing, which only happens if seeding never ran.
pub async fn create_note(uow: &mut UnitOfWork, day: &Day, text: Option<&str>) -> Result<DataPoint> {
    let category = uow.find_category(NOTES_CATEGORY_ID).await?.ok_or_else(|| {
        AppError::InvalidOperation("the notes category does not exist".to_string())
    })?;

    let mut note = DataPoint::new(day, &category);
    note.data_type = DataType::Note;
    note.text = text.map(str::to_string);

    uow.insert_point(&note).await?;

    tracing::debug!("Created note {} on {}", note.id, day.date);
    Ok(note)
}

/// Built-in categories, identified by fixed IDs so they survive reinstall
/// and import.
pub fn default_categories() -> Vec<DataPointCategory> {
    let builtin = |id: Uuid, group: Option<&str>, name: &str, data_type: DataType| DataPointCategory {
        id,
        read_only: true,
        ..DataPointCategory::new(group, name, data_type)
    };

    vec![
        builtin(OVERALL_MOOD_CATEGORY_ID, None, "Overall mood", DataType::Mood),
        builtin(SLEEP_CATEGORY_ID, None, "Sleep", DataType::Sleep),
        builtin(ENERGY_CATEGORY_ID, None, "Energy", DataType::LowToHigh),
        builtin(ANXIETY_CATEGORY_ID, Some("Symptoms"), "Anxiety", DataType::MildToSevere),
        builtin(HEADACHE_CATEGORY_ID, Some("Symptoms"), "Headache", DataType::MildToSevere),
        builtin(NOTES_CATEGORY_ID, Some(NOTES_GROUP), "Notes", DataType::Note),
    ]
}

/// Stage every built-in category that is not in the store yet.
/// Returns how many were added.
pub async fn seed_default_categories(uow: &mut UnitOfWork) -> Result<usize> {
    let mut added = 0;

    for category in default_categories() {
        if uow.find_category(category.id).await?.is_some() {
            continue;
        }

        add_category(uow, category).await?;
        added += 1;
    }

    if added > 0 {
        tracing::info!("Seeded {} built-in categories", added);
    }

    Ok(added)
}
