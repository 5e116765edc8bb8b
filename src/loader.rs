use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;

use crate::columns::{resolve_columns, ResolvedColumns};
use crate::config::LineupConfig;
use crate::error::Result;
use crate::filter::Period;
use crate::normalizer::Normalizer;
use crate::types::{NormalizedRecord, RawRecord, SourceStats, SourceTable};
use crate::util::{parse_date_safe, parse_quantity_safe};

/// Read a CSV export into a `SourceTable`.
pub fn load_table(name: &str, path: &Path) -> Result<SourceTable> {
    let file = std::fs::File::open(path)?;
    let table = read_table(name, file)?;
    tracing::info!(
        source = name,
        path = %path.display(),
        rows = table.rows.len(),
        "loaded sheet"
    );
    Ok(table)
}

/// Read CSV from any reader. Ragged rows are allowed; short rows read as
/// empty cells, fully blank rows are skipped.
pub fn read_table<R: Read>(name: &str, reader: R) -> Result<SourceTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        rows.push(row);
    }

    Ok(SourceTable::new(name, headers, rows))
}

/// Date cell, or a month-only cell ("Nov-2025", "2025-11") read as the
/// first day of that month.
pub fn parse_cell_date(cell: &str) -> Option<NaiveDate> {
    parse_date_safe(Some(cell)).or_else(|| {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        Period::parse(cell).ok().and_then(|p| p.first_day())
    })
}

/// Records of one source after column resolution, period filtering and
/// variant normalization.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub records: Vec<NormalizedRecord>,
    pub stats: SourceStats,
}

/// Pull raw records out of a table. Missing mandatory columns fail here,
/// before anything is aggregated.
pub fn extract_records(
    table: &SourceTable,
    columns: &ResolvedColumns,
    stats: &mut SourceStats,
) -> Vec<RawRecord> {
    (0..table.rows.len())
        .map(|i| {
            let quantity = columns.quantity.and_then(|c| {
                let cell = table.cell(i, c);
                let q = parse_quantity_safe(Some(cell));
                if q.is_none() {
                    stats.invalid_quantities += 1;
                    tracing::debug!(source = %table.name, row = i + 2, value = cell, "unusable quantity, counting row as 1");
                }
                q
            });
            RawRecord {
                variant: table.cell(i, columns.variant).to_string(),
                quantity,
                date: columns.date.and_then(|c| parse_cell_date(table.cell(i, c))),
            }
        })
        .collect()
}

pub fn prepare_source(
    table: &SourceTable,
    config: &LineupConfig,
    normalizer: &Normalizer<'_>,
    period: Option<Period>,
) -> Result<PreparedSource> {
    let columns = resolve_columns(table, &config.columns, period.is_some())?;

    let mut stats = SourceStats {
        source: table.name.clone(),
        rows_read: table.rows.len(),
        quantity_column: columns.quantity.map(|c| table.headers[c].clone()),
        ..SourceStats::default()
    };

    let raw = extract_records(table, &columns, &mut stats);
    let mut records = Vec::with_capacity(raw.len());
    for (i, rec) in raw.into_iter().enumerate() {
        if let Some(p) = period {
            match rec.date {
                Some(d) if p.contains(d) => {}
                Some(_) => {
                    stats.outside_period += 1;
                    continue;
                }
                None => {
                    stats.unparseable_dates += 1;
                    tracing::debug!(source = %table.name, row = i + 2, "unparseable date, row skipped");
                    continue;
                }
            }
        }

        let resolved = normalizer.resolve(&rec.variant);
        if resolved.is_fallback() {
            stats.fallback_rows += 1;
            tracing::debug!(source = %table.name, raw = %rec.variant, fallback = resolved.canonical, "no rule matched");
        }
        records.push(NormalizedRecord {
            raw_variant: rec.variant,
            canonical: resolved.canonical.to_string(),
            variant_index: resolved.index,
            quantity: rec.quantity.unwrap_or(1),
            date: rec.date,
        });
    }
    stats.rows_kept = records.len();

    if stats.fallback_rows > 0 {
        tracing::warn!(
            source = %table.name,
            rows = stats.fallback_rows,
            fallback = %config.fallback,
            "rows defaulted to fallback variant"
        );
    }
    if stats.unparseable_dates > 0 {
        tracing::warn!(source = %table.name, rows = stats.unparseable_dates, "rows with unparseable dates excluded");
    }
    tracing::info!(
        source = %table.name,
        read = stats.rows_read,
        kept = stats.rows_kept,
        outside_period = stats.outside_period,
        "prepared source"
    );

    Ok(PreparedSource { records, stats })
}
