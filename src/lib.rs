pub mod auth;
pub mod client;
pub mod config;
pub mod detail;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod flatten;
pub mod models;
pub mod query;
pub mod repository;
pub mod writer;

pub use auth::AuthToken;
pub use client::XrayClient;
pub use config::Config;
pub use error::Error;
pub use models::*;
pub use repository::TestRepository;

// Pipeline re-exports
pub use diagnostics::{DiagnosticReport, DiagnosticRow, diagnose, diagnostic_rows};
pub use export::{ExportReport, SkippedIssue, collect_rows};
pub use flatten::{Cell, ExportRow, export_header, flatten};
pub use query::search_all;

// Spreadsheet output re-exports
pub use writer::{validate_output_path, write_diagnostics, write_export};
