//! Journal data core
//!
//! Day/category/point storage, daily reconciliation, category ordering and
//! zip backups for the journal app.

pub mod app;
pub mod config;
pub mod database;
pub mod dates;
pub mod error;
pub mod services;
pub mod storage;
