//! Forecast vs order-intake reconciliation for a vehicle dealership.
//!
//! Raw trim/model names from two sheets are normalized onto a fixed lineup
//! of reporting variants, summed per variant, and merged with the operator's
//! likely-closing estimate into one comparison table.
pub mod columns;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod normalizer;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use config::{ClosingMode, LineupConfig};
pub use error::{ReportError, Result};
pub use filter::Period;
pub use normalizer::Normalizer;
pub use reports::{generate_report, LikelyClosing};
pub use types::{Cell, ReportTable, RowKind, SourceTable};
