//! Typed value accessors for data points
//!
//! A point stores every kind of value in sparse optional columns. These
//! accessors check the point's type before touching a column, so calling
//! the sleep stepper on a mood point fails instead of writing garbage.

use crate::config::{MAX_SLEEP_HOURS, MIN_SLEEP_HOURS, SLEEP_STEP_HOURS};
use crate::database::{DataPoint, DataPointCategory, DataType};
use crate::error::{AppError, Result};

impl DataPoint {
    fn require_type(&self, accepts: fn(DataType) -> bool, operation: &str) -> Result<()> {
        if accepts(self.data_type) {
            return Ok(());
        }

        Err(AppError::InvalidOperation(format!(
            "{} is not valid for a {:?} point",
            operation, self.data_type
        )))
    }

    pub fn mood(&self) -> Result<Option<&str>> {
        self.require_type(|t| t == DataType::Mood, "mood")?;
        Ok(self.mood.as_deref())
    }

    pub fn set_mood(&mut self, mood: Option<&str>) -> Result<()> {
        self.require_type(|t| t == DataType::Mood, "set_mood")?;

        if mood.is_some_and(|m| m.trim().is_empty()) {
            return Err(AppError::invalid_argument("mood", "must not be blank"));
        }

        self.mood = mood.map(str::to_string);
        Ok(())
    }

    /// Add half an hour of sleep, stopping at 24 hours. Returns the new value.
    pub fn increment_sleep(&mut self) -> Result<f64> {
        self.step_sleep(SLEEP_STEP_HOURS, "increment_sleep")
    }

    /// Remove half an hour of sleep, stopping at zero. Returns the new value.
    pub fn decrement_sleep(&mut self) -> Result<f64> {
        self.step_sleep(-SLEEP_STEP_HOURS, "decrement_sleep")
    }

    fn step_sleep(&mut self, delta: f64, operation: &str) -> Result<f64> {
        self.require_type(|t| t == DataType::Sleep, operation)?;

        let current = self.sleep_hours.unwrap_or(MIN_SLEEP_HOURS);
        let next = (current + delta).clamp(MIN_SLEEP_HOURS, MAX_SLEEP_HOURS);
        self.sleep_hours = Some(next);
        Ok(next)
    }

    pub fn set_sleep_hours(&mut self, hours: f64) -> Result<()> {
        self.require_type(|t| t == DataType::Sleep, "set_sleep_hours")?;

        if !(MIN_SLEEP_HOURS..=MAX_SLEEP_HOURS).contains(&hours) {
            return Err(AppError::invalid_argument(
                "hours",
                format!("{} is outside {}..={}", hours, MIN_SLEEP_HOURS, MAX_SLEEP_HOURS),
            ));
        }

        self.sleep_hours = Some(hours);
        Ok(())
    }

    /// Selected scale position. An unanswered scale reads as 0.
    pub fn scale_index(&self) -> Result<i64> {
        self.require_type(DataType::is_scale, "scale_index")?;
        Ok(self.scale_index.unwrap_or(0))
    }

    /// Select a scale position. 0 clears the answer.
    pub fn set_scale_index(&mut self, value: i64) -> Result<()> {
        self.require_type(DataType::is_scale, "set_scale_index")?;

        if value < 0 {
            return Err(AppError::invalid_argument("value", "scale index must not be negative"));
        }

        self.scale_index = (value != 0).then_some(value);
        Ok(())
    }

    /// Record whether a medication was taken.
    ///
    /// Marking it as not taken resets the dose to the category default, so a
    /// custom dose does not come back when it is marked as taken again.
    pub fn medication_taken_changed(
        &mut self,
        category: &DataPointCategory,
        taken: Option<bool>,
    ) -> Result<()> {
        self.require_type(|t| t == DataType::Medication, "medication_taken_changed")?;

        if category.id != self.category_id {
            return Err(AppError::invalid_argument(
                "category",
                format!("point {} does not belong to category {}", self.id, category.id),
            ));
        }

        self.bool_value = taken;

        if taken == Some(true) {
            if self.medication_dose.is_none() {
                self.medication_dose = category.medication_dose;
            }
        } else {
            self.medication_dose = category.medication_dose;
        }

        Ok(())
    }
}
