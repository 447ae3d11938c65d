//! Error types for the journal data layer
//!
//! All errors use thiserror for structured error handling.
//! They serialize to their message so a UI layer can show them as-is.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("No valid backup found")]
    NoValidBackup,

    #[error("Invalid backup: {0}")]
    InvalidBackup(String),

    #[error("Invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    #[error("Day not found: {0}")]
    DayNotFound(Uuid),

    #[error("Point not found: {0}")]
    PointNotFound(Uuid),

    /// The delete-and-restore transaction failed. The transaction was rolled
    /// back, but a failure here means the store itself is misbehaving.
    #[error("Replacing journal data failed, the app may need reinstalling: {0}")]
    ReplaceFailed(String),

    /// The journal data was replaced, but writing the backed-up preferences
    /// failed afterwards.
    #[error("Journal data imported, but preferences were not restored: {0}")]
    PreferencesNotRestored(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Shorthand for [`AppError::InvalidArgument`].
    pub fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    /// True for failures caused by the archive itself (missing entry, bad zip,
    /// bad JSON). These never touch stored data.
    pub fn is_archive_error(&self) -> bool {
        matches!(
            self,
            Self::NoValidBackup | Self::InvalidBackup(_) | Self::Zip(_) | Self::Serialization(_)
        )
    }

    /// True when the store may be in an unexpected state.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::ReplaceFailed(_))
    }

    /// True when SQLite refused a write because another connection holds or
    /// has just released the write lock (`SQLITE_BUSY`, `SQLITE_BUSY_SNAPSHOT`).
    /// Re-running the whole unit of work is safe.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(e)) => {
                matches!(e.code().as_deref(), Some("5") | Some("517"))
            }
            _ => false,
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_errors_are_classified() {
        assert!(AppError::NoValidBackup.is_archive_error());
        assert!(AppError::InvalidBackup("bad".into()).is_archive_error());
        assert!(!AppError::ReplaceFailed("disk full".into()).is_archive_error());
        assert!(AppError::ReplaceFailed("disk full".into()).is_critical());
    }

    #[test]
    fn test_partial_import_is_neither_archive_nor_critical() {
        let err = AppError::PreferencesNotRestored("read-only".into());
        assert!(!err.is_archive_error());
        assert!(!err.is_critical());
        assert!(err.to_string().starts_with("Journal data imported"));
    }

    #[test]
    fn test_only_database_errors_are_write_conflicts() {
        assert!(!AppError::Generic("database is locked".into()).is_write_conflict());
        assert!(!AppError::Database(sqlx::Error::RowNotFound).is_write_conflict());
    }

    #[test]
    fn test_invalid_argument_names_parameter() {
        let err = AppError::invalid_argument("value", "must not be negative");
        assert_eq!(err.to_string(), "Invalid argument `value`: must not be negative");
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&AppError::NoValidBackup).unwrap();
        assert_eq!(json, "\"No valid backup found\"");

        let json = serde_json::to_value(AppError::DayNotFound(Uuid::nil())).unwrap();
        assert_eq!(json, serde_json::json!(format!("Day not found: {}", Uuid::nil())));
    }
}
