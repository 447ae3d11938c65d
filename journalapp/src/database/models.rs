//! Database models
//!
//! Rust structs representing the journal's persisted entities.
//! Relationships are plain foreign-key fields; related rows are loaded
//! explicitly through the repository rather than navigated lazily.

use crate::config::MEDICATIONS_GROUP;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of value a category tracks. Points copy it when they are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DataType {
    Mood,
    Sleep,
    Scale,
    LowToHigh,
    MildToSevere,
    Bool,
    Number,
    Text,
    Note,
    Medication,
}

impl DataType {
    /// Types answered with a scale index.
    pub fn is_scale(self) -> bool {
        matches!(self, Self::Scale | Self::LowToHigh | Self::MildToSevere)
    }
}

/// Lifecycle of a category. Deleted categories keep their points but are
/// hidden and carry no ordering index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CategoryStatus {
    #[default]
    Active,
    Deleted,
}

/// One calendar date's journal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Day {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            text: None,
        }
    }
}

/// A tracked metric or question, built in or user defined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DataPointCategory {
    pub id: Uuid,
    #[sqlx(rename = "group_name")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub name: String,
    /// Position within the group, 1-based and dense among active categories.
    /// `None` until assigned, and always `None` once deleted.
    #[sqlx(rename = "sort_index")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default)]
    pub status: CategoryStatus,
    pub read_only: bool,
    pub enabled: bool,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_dose: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_unit: Option<String>,
    /// Points created on or after this date are marked as taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_every_day_since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl DataPointCategory {
    /// New enabled, active category without an index.
    pub fn new(group: Option<&str>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: Uuid::new_v4(),
            group: group.map(str::to_string),
            name: name.into(),
            index: None,
            status: CategoryStatus::Active,
            read_only: false,
            enabled: true,
            data_type,
            medication_dose: None,
            medication_unit: None,
            medication_every_day_since: None,
            details: None,
        }
    }

    /// New medication category in the medications group.
    pub fn medication(name: impl Into<String>, dose: Option<f64>, unit: Option<&str>) -> Self {
        Self {
            medication_dose: dose,
            medication_unit: unit.map(str::to_string),
            ..Self::new(Some(MEDICATIONS_GROUP), name, DataType::Medication)
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == CategoryStatus::Deleted
    }

    /// Whether reconciliation should produce points for this category.
    pub fn is_tracked(&self) -> bool {
        self.enabled && !self.is_deleted()
    }

    pub fn in_group(&self, group: Option<&str>) -> bool {
        self.group.as_deref() == group
    }
}

/// One category's recorded value for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DataPoint {
    pub id: Uuid,
    pub day_id: Uuid,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_index: Option<i64>,
    #[serde(rename = "bool", default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication_dose: Option<f64>,
}

impl DataPoint {
    /// Empty point for `category` on `day`. Medication points start at the
    /// category's default dose.
    pub fn new(day: &Day, category: &DataPointCategory) -> Self {
        let medication_dose = match category.data_type {
            DataType::Medication => category.medication_dose,
            _ => None,
        };

        Self {
            id: Uuid::new_v4(),
            day_id: day.id,
            category_id: category.id,
            created_at: Utc::now(),
            data_type: category.data_type,
            deleted: false,
            mood: None,
            sleep_hours: None,
            scale_index: None,
            bool_value: None,
            number: None,
            text: None,
            medication_dose,
        }
    }

    /// True when this point answers `category` in its current shape.
    pub fn belongs_to(&self, category: &DataPointCategory) -> bool {
        self.category_id == category.id && self.data_type == category.data_type
    }
}
