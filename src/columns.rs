// Locate the columns that play each role in a sheet with free-form headers.
use std::fmt;

use serde::Serialize;

use crate::config::ColumnKeywords;
use crate::error::{ReportError, Result};
use crate::types::SourceTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Variant,
    Quantity,
    Date,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variant => write!(f, "variant"),
            Self::Quantity => write!(f, "quantity"),
            Self::Date => write!(f, "date"),
        }
    }
}

impl ColumnKeywords {
    pub fn for_role(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::Variant => &self.variant,
            ColumnRole::Quantity => &self.quantity,
            ColumnRole::Date => &self.date,
        }
    }
}

/// Column indexes per role. Only `variant` is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub variant: usize,
    pub quantity: Option<usize>,
    pub date: Option<usize>,
}

/// First header (left to right) containing any of `keywords`, ignoring case.
pub fn resolve_role(headers: &[String], keywords: &[String]) -> Option<usize> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    headers.iter().position(|h| {
        let h = h.to_lowercase();
        keywords.iter().any(|k| h.contains(k.as_str()))
    })
}

/// Resolve all roles for one source. The variant column is mandatory, and so
/// is the date column when `need_date` is set (a period filter is active).
pub fn resolve_columns(
    table: &SourceTable,
    keywords: &ColumnKeywords,
    need_date: bool,
) -> Result<ResolvedColumns> {
    let lookup = |role: ColumnRole| resolve_role(&table.headers, keywords.for_role(role));
    let missing = |role: ColumnRole| ReportError::MissingColumn {
        source_name: table.name.clone(),
        role,
        keywords: keywords
            .for_role(role)
            .iter()
            .map(|k| format!("'{k}'"))
            .collect::<Vec<_>>()
            .join(" or "),
    };

    let variant = lookup(ColumnRole::Variant).ok_or_else(|| missing(ColumnRole::Variant))?;
    let quantity = lookup(ColumnRole::Quantity);
    let date = lookup(ColumnRole::Date);
    if need_date && date.is_none() {
        return Err(missing(ColumnRole::Date));
    }

    tracing::debug!(
        source = %table.name,
        variant = %table.headers[variant],
        quantity = ?quantity.map(|i| &table.headers[i]),
        date = ?date.map(|i| &table.headers[i]),
        "resolved columns"
    );
    Ok(ResolvedColumns {
        variant,
        quantity,
        date,
    })
}
