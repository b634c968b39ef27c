//! Core of the study tracker.
//!
//! - `catalog` and `validation`: static course data and resolution of typed input
//! - `tracker`: the persisted progress document, backups and undo history
//! - `deadlines`: summaries derived from the two
//! - `calendar`: reconciliation of deadlines and study blocks with an external calendar

pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod date_range;
pub mod deadlines;
pub mod error;
pub mod status;
pub mod study_dir;
pub mod tracker;
pub mod validation;

pub use error::{StudyError, StudyResult};
pub use status::Status;
