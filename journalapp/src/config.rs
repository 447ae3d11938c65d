//! Application configuration constants
//!
//! Central location for file names, well-known identifiers, value bounds
//! and preference keys used throughout the data layer.

use uuid::Uuid;

// ===== Storage =====

/// SQLite database file name inside the app data directory
pub const DATABASE_FILE_NAME: &str = "journalapp.db";

/// Preference file name inside the app data directory
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Sub-directory of the app data directory that receives exports by default
pub const BACKUPS_DIR_NAME: &str = "backups";

/// Times a unit of work is started before a write conflict is reported
pub const WRITE_ATTEMPTS: usize = 5;

// ===== Backup Archive =====

/// Name of the single JSON entry stored inside a backup archive
pub const ARCHIVE_ENTRY_NAME: &str = "journalapp-data.json";

/// File extension used by backup archives (without the dot)
pub const BACKUP_FILE_EXTENSION: &str = "journalapp";

/// Prefix of backup file names produced by the export flow
pub const BACKUP_FILE_PREFIX: &str = "backup-";

/// Highest archive document version this build can read
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

// ===== Categories =====

/// Group holding the free-text notes category
pub const NOTES_GROUP: &str = "Notes";

/// Group holding medication categories
pub const MEDICATIONS_GROUP: &str = "Medications";

/// Well-known category: overall mood
pub const OVERALL_MOOD_CATEGORY_ID: Uuid = Uuid::from_u128(0xd90d89fb_f5b9_47cf_ae4e_3ec0f635e783);

/// Well-known category: hours slept
pub const SLEEP_CATEGORY_ID: Uuid = Uuid::from_u128(0xd8fe6b4d_2f33_4c0e_a4f0_1a6ed2a1e7c1);

/// Well-known category: notes. `create_note` depends on it existing.
pub const NOTES_CATEGORY_ID: Uuid = Uuid::from_u128(0x01da0cf5_53c9_4b73_9b2b_8a9a0d1c5f22);

/// Well-known category: daily energy level
pub const ENERGY_CATEGORY_ID: Uuid = Uuid::from_u128(0x4b1e9f2a_6c1d_4d8e_9a53_2f7c0b8e6d10);

/// Well-known category: anxiety
pub const ANXIETY_CATEGORY_ID: Uuid = Uuid::from_u128(0x7c3a5e11_0d4f_4a2b_8e6c_91b2d3f4a5c6);

/// Well-known category: headache
pub const HEADACHE_CATEGORY_ID: Uuid = Uuid::from_u128(0x2e8d4c7b_9a1f_4e3d_b5c6_0f1a2b3c4d5e);

/// Welcome text of the note seeded the first time the notes category is reconciled
pub const WELCOME_NOTE_TEXT: &str = "Welcome to your journal! Notes you write for a day show up here.";

// ===== Value Bounds =====

/// Minimum recordable sleep in hours
pub const MIN_SLEEP_HOURS: f64 = 0.0;

/// Maximum recordable sleep in hours
pub const MAX_SLEEP_HOURS: f64 = 24.0;

/// Sleep increment/decrement step in hours
pub const SLEEP_STEP_HOURS: f64 = 0.5;

/// Highest scale index offered by the scale pickers. 0 means "not answered".
pub const MAX_SCALE_INDEX: i64 = 5;

/// Moods offered by the mood grid, most positive first
pub const MOOD_EMOJIS: &[&str] = &["🤩", "😁", "😊", "😐", "😕", "😢", "😭", "😡", "😴", "🤒"];

// ===== Preferences =====

pub const PREF_SAFETY_PLAN: &str = "safety_plan";
pub const PREF_MOOD_PALETTE: &str = "mood_palette";
pub const PREF_LAST_EXPORT: &str = "last_export";
pub const PREF_THEME: &str = "theme";

/// Launch counter, bumped once per process start. Not backed up.
pub const PREF_LAUNCH_COUNT: &str = "launch_count";

/// Preference keys carried inside backup archives
pub const BACKED_UP_PREFERENCE_KEYS: &[&str] =
    &[PREF_SAFETY_PLAN, PREF_MOOD_PALETTE, PREF_LAST_EXPORT, PREF_THEME];
