//! Conversational job-application intake.
//!
//! The crate owns the dialog state machine, the per-user session store, the
//! nearest-site ranking math, and the geocoding fallback chain. External
//! collaborators (the chat transport, the spreadsheet-backed site directory,
//! and the staff notifier) are reached through the seams in [`dialog`].

pub mod config;
pub mod dialog;
pub mod error;
pub mod geo;
pub mod telemetry;

pub use error::AppError;
