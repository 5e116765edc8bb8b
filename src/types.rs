use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use tabled::Tabled;

use crate::util::format_number;

/// An uploaded sheet as plain text cells. Header names are free-form.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    /// Label used in errors and diagnostics ("forecast", "actual").
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SourceTable {
    pub fn new(name: &str, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Cell text, or "" for short rows.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// One row pulled out of a `SourceTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub variant: String,
    /// `None` when the sheet has no quantity column (or the cell is unusable).
    pub quantity: Option<u64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub raw_variant: String,
    pub canonical: String,
    /// Column position of `canonical` in the lineup.
    pub variant_index: usize,
    pub quantity: u64,
    pub date: Option<NaiveDate>,
}

/// Per-source counters for the data-quality problems that are recovered
/// instead of failing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Tabled)]
pub struct SourceStats {
    #[serde(rename = "Source")]
    #[tabled(rename = "Source")]
    pub source: String,
    #[serde(rename = "RowsRead")]
    #[tabled(rename = "RowsRead")]
    pub rows_read: usize,
    #[serde(rename = "RowsKept")]
    #[tabled(rename = "RowsKept")]
    pub rows_kept: usize,
    #[serde(rename = "OutsidePeriod")]
    #[tabled(rename = "OutsidePeriod")]
    pub outside_period: usize,
    #[serde(rename = "BadDates")]
    #[tabled(rename = "BadDates")]
    pub unparseable_dates: usize,
    #[serde(rename = "Fallback")]
    #[tabled(rename = "Fallback")]
    pub fallback_rows: usize,
    #[serde(rename = "BadQuantities")]
    #[tabled(rename = "BadQuantities")]
    pub invalid_quantities: usize,
    #[serde(rename = "QuantityColumn")]
    #[tabled(rename = "QuantityColumn", display_with = "display_column")]
    pub quantity_column: Option<String>,
}

fn display_column(col: &Option<String>) -> String {
    col.clone().unwrap_or_else(|| "(row count)".to_string())
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Forecast,
    ActualToDate,
    LikelyClosing,
    MonthClosing,
    Achievement,
}

impl RowKind {
    /// Count rows get a summed Grand Total; the percentage row does not.
    pub fn is_count(&self) -> bool {
        !matches!(self, Self::Achievement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Count(u64),
    Percent(f64),
    /// Percentage with a zero forecast.
    Placeholder,
}

impl Cell {
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Percent(p) => write!(f, "{}", format_number(*p, 1)),
            Self::Placeholder => write!(f, "-"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => serializer.serialize_u64(*n),
            Self::Percent(p) => serializer.serialize_f64(*p),
            Self::Placeholder => serializer.serialize_str("-"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub kind: RowKind,
    /// One cell per lineup variant, in lineup order.
    pub cells: Vec<Cell>,
    pub grand_total: Cell,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub lineup: String,
    /// Month label such as "NOV 2025" when a period filter was applied.
    pub period: Option<String>,
    pub closing_mode: String,
    /// Lineup variants in declared order.
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub sources: Vec<SourceStats>,
}

impl ReportTable {
    pub const GRAND_TOTAL: &'static str = "Grand Total";

    pub fn row(&self, kind: RowKind) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.kind == kind)
    }

    /// Cell lookup by row kind and variant name.
    pub fn cell(&self, kind: RowKind, variant: &str) -> Option<Cell> {
        let col = self.columns.iter().position(|c| c == variant)?;
        self.row(kind).and_then(|r| r.cells.get(col).copied())
    }
}
