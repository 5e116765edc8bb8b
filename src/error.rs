use thiserror::Error;

use crate::columns::ColumnRole;

/// Errors that stop a report from being produced.
///
/// Data-quality problems (bad dates, unknown variants, odd quantities) never
/// show up here: they are recovered in place and counted in `SourceStats`.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("source '{source_name}': no '{role}' column (looked for headers containing {keywords})")]
    MissingColumn {
        source_name: String,
        role: ColumnRole,
        keywords: String,
    },

    #[error("unknown variant '{0}'")]
    UnknownVariant(String),

    #[error("invalid period '{0}' (expected e.g. 2025-11, 11/2025 or NOV 2025)")]
    InvalidPeriod(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
