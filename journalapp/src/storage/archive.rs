//! Backup archive codec
//!
//! A backup is a ZIP file holding a single JSON entry
//! (`journalapp-data.json`). Entities are written once each in flat tables;
//! points refer to their day and category by ID only. Reading rebuilds the
//! ID lookup tables, keeps the first copy of any repeated ID, and rejects
//! points whose day or category is not in the archive.
//!
//! ```text
//! backup-2024-03-01.journalapp
//! └── journalapp-data.json  { format_version, created_at, days, categories, points, preferences }
//! ```

use crate::config::{
    ARCHIVE_ENTRY_NAME, ARCHIVE_FORMAT_VERSION, BACKUP_FILE_EXTENSION, BACKUP_FILE_PREFIX,
};
use crate::database::{DataPoint, DataPointCategory, Day};
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use uuid::Uuid;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A backed-up preference value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceBackup {
    pub name: String,
    pub value: String,
}

/// Snapshot of the whole journal plus selected preferences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupFile {
    days: Vec<Day>,
    categories: Vec<DataPointCategory>,
    points: Vec<DataPoint>,
    preferences: Vec<PreferenceBackup>,
}

impl BackupFile {
    pub fn new(
        days: Vec<Day>,
        categories: Vec<DataPointCategory>,
        points: Vec<DataPoint>,
        preferences: Vec<PreferenceBackup>,
    ) -> Self {
        Self {
            days,
            categories,
            points,
            preferences,
        }
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn categories(&self) -> &[DataPointCategory] {
        &self.categories
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn preferences(&self) -> &[PreferenceBackup] {
        &self.preferences
    }

    /// Set a carried preference, replacing any entry with the same name
    pub fn set_preference(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.preferences.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.preferences.push(PreferenceBackup {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Points recorded for one day
    pub fn points_for_day(&self, day_id: Uuid) -> impl Iterator<Item = &DataPoint> {
        self.points.iter().filter(move |p| p.day_id == day_id)
    }

    /// Points recorded for one category
    pub fn points_for_category(&self, category_id: Uuid) -> impl Iterator<Item = &DataPoint> {
        self.points.iter().filter(move |p| p.category_id == category_id)
    }

    /// True when the snapshot holds no journal entities
    pub fn is_empty(&self) -> bool {
        self.days.is_empty() && self.categories.is_empty() && self.points.is_empty()
    }

    pub fn into_parts(
        self,
    ) -> (
        Vec<Day>,
        Vec<DataPointCategory>,
        Vec<DataPoint>,
        Vec<PreferenceBackup>,
    ) {
        (self.days, self.categories, self.points, self.preferences)
    }
}

#[derive(Serialize)]
struct ArchiveDocumentRef<'a> {
    format_version: u32,
    created_at: DateTime<Utc>,
    days: &'a [Day],
    categories: &'a [DataPointCategory],
    points: &'a [DataPoint],
    preferences: &'a [PreferenceBackup],
}

#[derive(Deserialize)]
struct ArchiveDocument {
    format_version: u32,
    #[serde(default)]
    days: Vec<Day>,
    #[serde(default)]
    categories: Vec<DataPointCategory>,
    #[serde(default)]
    points: Vec<DataPoint>,
    #[serde(default)]
    preferences: Vec<PreferenceBackup>,
}

/// File name the export flow gives a backup taken on `date`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!(
        "{}{}.{}",
        BACKUP_FILE_PREFIX,
        date.format("%Y-%m-%d"),
        BACKUP_FILE_EXTENSION
    )
}

/// Write `backup` as a ZIP archive into `writer`, returning the writer.
pub fn write_to<W: Write + Seek>(backup: &BackupFile, writer: W) -> Result<W> {
    let document = ArchiveDocumentRef {
        format_version: ARCHIVE_FORMAT_VERSION,
        created_at: Utc::now(),
        days: &backup.days,
        categories: &backup.categories,
        points: &backup.points,
        preferences: &backup.preferences,
    };

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(ARCHIVE_ENTRY_NAME, options)?;
    serde_json::to_writer_pretty(&mut zip, &document)?;

    let writer = zip.finish()?;

    tracing::debug!(
        "Wrote archive: {} days, {} categories, {} points, {} preferences",
        backup.days.len(),
        backup.categories.len(),
        backup.points.len(),
        backup.preferences.len()
    );

    Ok(writer)
}

/// Read a backup from a ZIP archive.
///
/// Fails with [`AppError::NoValidBackup`] when the archive lacks the data
/// entry, and with [`AppError::InvalidBackup`] when the entry does not
/// describe a consistent journal.
pub fn read_from<R: Read + Seek>(reader: R) -> Result<BackupFile> {
    let mut archive = ZipArchive::new(reader)?;

    // The entry borrows the archive, so parse it in its own scope
    let document: ArchiveDocument = {
        let entry = match archive.by_name(ARCHIVE_ENTRY_NAME) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Err(AppError::NoValidBackup),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_reader(BufReader::new(entry))?
    };

    if document.format_version > ARCHIVE_FORMAT_VERSION {
        return Err(AppError::InvalidBackup(format!(
            "format version {} is newer than the supported version {}",
            document.format_version, ARCHIVE_FORMAT_VERSION
        )));
    }

    rebuild_graph(document)
}

/// Write `backup` to a new file at `path`.
///
/// The archive is written next to the target first and renamed into place,
/// so an existing file is never left half-written.
pub fn write_to_path(backup: &BackupFile, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    // Write to temp file first
    let written = File::create(&temp_path)
        .map_err(AppError::from)
        .and_then(|file| write_to(backup, BufWriter::new(file)))
        .and_then(|writer| {
            let file = writer
                .into_inner()
                .map_err(|e| AppError::Io(e.into_error()))?;
            file.sync_all()?;
            Ok(())
        });

    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    // Atomic rename
    std::fs::rename(&temp_path, path)?;

    tracing::info!("Backup archive written to {:?}", path);
    Ok(())
}

/// Read a backup from the archive file at `path`
pub fn read_from_path(path: &Path) -> Result<BackupFile> {
    let file = File::open(path)?;
    read_from(BufReader::new(file))
}

fn dedupe_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> Uuid, kind: &str) -> Vec<T> {
    let before = items.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<T> = items.into_iter().filter(|item| seen.insert(id(item))).collect();

    if unique.len() != before {
        tracing::warn!("Dropped {} repeated {} in backup", before - unique.len(), kind);
    }

    unique
}

fn rebuild_graph(document: ArchiveDocument) -> Result<BackupFile> {
    let days = dedupe_by_id(document.days, |d| d.id, "days");
    let categories = dedupe_by_id(document.categories, |c| c.id, "categories");
    let points = dedupe_by_id(document.points, |p| p.id, "points");

    let day_ids: HashSet<Uuid> = days.iter().map(|d| d.id).collect();
    let category_ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();

    for point in &points {
        if !day_ids.contains(&point.day_id) {
            return Err(AppError::InvalidBackup(format!(
                "point {} refers to missing day {}",
                point.id, point.day_id
            )));
        }
        if !category_ids.contains(&point.category_id) {
            return Err(AppError::InvalidBackup(format!(
                "point {} refers to missing category {}",
                point.id, point.category_id
            )));
        }
    }

    Ok(BackupFile {
        days,
        categories,
        points,
        preferences: document.preferences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DataType;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn sample_backup() -> BackupFile {
        let day = Day::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let mood = DataPointCategory::new(None, "Mood", DataType::Mood);
        let pill = DataPointCategory::medication("Melatonin", Some(3.0), Some("mg"));

        let mut mood_point = DataPoint::new(&day, &mood);
        mood_point.mood = Some("😊".to_string());
        let pill_point = DataPoint::new(&day, &pill);

        BackupFile::new(
            vec![day],
            vec![mood, pill],
            vec![mood_point, pill_point],
            vec![PreferenceBackup {
                name: "safety_plan".to_string(),
                value: "Breathe".to_string(),
            }],
        )
    }

    fn archive_with_entry(name: &str, body: &str) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_stream_round_trip() {
        let backup = sample_backup();

        let mut cursor = write_to(&backup, Cursor::new(Vec::new())).unwrap();
        cursor.set_position(0);
        let restored = read_from(cursor).unwrap();

        assert_eq!(restored, backup);
        let day_id = backup.days()[0].id;
        assert_eq!(restored.points_for_day(day_id).count(), 2);
    }

    #[test]
    fn test_path_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(backup_file_name(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        let backup = sample_backup();

        write_to_path(&backup, &path).unwrap();
        let restored = read_from_path(&path).unwrap();

        assert_eq!(restored, backup);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_archive_has_single_pretty_entry_without_nulls() {
        let cursor = write_to(&sample_backup(), Cursor::new(Vec::new())).unwrap();
        let mut archive = ZipArchive::new(cursor).unwrap();

        assert_eq!(archive.len(), 1);
        let mut body = String::new();
        archive
            .by_name(ARCHIVE_ENTRY_NAME)
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();

        assert!(body.contains("\n  "));
        assert!(!body.contains("null"));
        assert!(body.contains("\"day_id\""));
    }

    #[test]
    fn test_missing_entry_is_no_valid_backup() {
        let cursor = archive_with_entry("something-else.json", "{}");

        let result = read_from(cursor);

        assert!(matches!(result, Err(AppError::NoValidBackup)));
    }

    #[test]
    fn test_not_a_zip_is_archive_error() {
        let result = read_from(Cursor::new(b"definitely not a zip".to_vec()));

        let err = result.unwrap_err();
        assert!(err.is_archive_error());
    }

    #[test]
    fn test_corrupt_json_is_archive_error() {
        let cursor = archive_with_entry(ARCHIVE_ENTRY_NAME, "{\"format_version\": 1, \"days\": [");

        let err = read_from(cursor).unwrap_err();

        assert!(matches!(err, AppError::Serialization(_)));
        assert!(err.is_archive_error());
    }

    #[test]
    fn test_empty_document_reads_as_empty_backup() {
        let cursor = archive_with_entry(ARCHIVE_ENTRY_NAME, "{\"format_version\": 1}");

        let backup = read_from(cursor).unwrap();

        assert!(backup.is_empty());
        assert!(backup.preferences().is_empty());
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let cursor = archive_with_entry(ARCHIVE_ENTRY_NAME, "{\"format_version\": 99}");

        assert!(matches!(read_from(cursor), Err(AppError::InvalidBackup(_))));
    }

    #[test]
    fn test_dangling_point_is_rejected() {
        let backup = sample_backup();
        let (_, categories, points, preferences) = backup.into_parts();
        let broken = BackupFile::new(Vec::new(), categories, points, preferences);

        let mut cursor = write_to(&broken, Cursor::new(Vec::new())).unwrap();
        cursor.set_position(0);

        assert!(matches!(read_from(cursor), Err(AppError::InvalidBackup(_))));
    }

    #[test]
    fn test_repeated_ids_collapse_to_one_instance() {
        let backup = sample_backup();
        let (days, categories, points, preferences) = backup.clone().into_parts();
        let doubled = BackupFile::new(
            days.iter().chain(days.iter()).cloned().collect(),
            categories.iter().chain(categories.iter()).cloned().collect(),
            points,
            preferences,
        );

        let mut cursor = write_to(&doubled, Cursor::new(Vec::new())).unwrap();
        cursor.set_position(0);
        let restored = read_from(cursor).unwrap();

        assert_eq!(restored, backup);
    }

    #[test]
    fn test_set_preference_replaces_by_name() {
        let mut backup = sample_backup();

        backup.set_preference("safety_plan", "Call Sam");
        backup.set_preference("theme", "dark");

        assert_eq!(
            backup.preferences(),
            &[
                PreferenceBackup {
                    name: "safety_plan".to_string(),
                    value: "Call Sam".to_string(),
                },
                PreferenceBackup {
                    name: "theme".to_string(),
                    value: "dark".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(backup_file_name(date), "backup-2024-03-01.journalapp");
    }
}
