//! Services module
//!
//! Business logic that coordinates between the CLI and the repository.

pub mod backup;
pub mod categories;
pub mod journal;
pub mod points;
pub mod preferences;
pub mod reconcile;

pub use backup::BackupService;
pub use categories::CategoryService;
pub use journal::{FillSummary, JournalService};
pub use preferences::PreferenceService;
pub use reconcile::ReconciledDay;
