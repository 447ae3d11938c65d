//! Storage module
//!
//! On-disk formats that live outside the database: the backup archive.

pub mod archive;

pub use archive::{backup_file_name, BackupFile, PreferenceBackup};
