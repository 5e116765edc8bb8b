use std::path::Path;

use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table};

use crate::error::Result;
use crate::types::{ReportTable, SourceStats};

/// Header row followed by one record per report row, all as display text.
pub fn report_records(report: &ReportTable) -> Vec<Vec<String>> {
    let mut header = Vec::with_capacity(report.columns.len() + 2);
    header.push(String::new());
    header.extend(report.columns.iter().cloned());
    header.push(ReportTable::GRAND_TOTAL.to_string());

    let mut records = vec![header];
    for row in &report.rows {
        let mut rec = Vec::with_capacity(row.cells.len() + 2);
        rec.push(row.label.clone());
        rec.extend(row.cells.iter().map(|c| c.to_string()));
        rec.push(row.grand_total.to_string());
        records.push(rec);
    }
    records
}

pub fn write_report_csv(path: &Path, report: &ReportTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for rec in report_records(report) {
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn render_report(report: &ReportTable) -> String {
    let mut builder = Builder::default();
    for rec in report_records(report) {
        builder.push_record(rec);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_report(report: &ReportTable) {
    println!("Forecast vs Order Intake ({})", report.lineup);
    if let Some(p) = &report.period {
        println!("(Period: {p}, closing mode: {})", report.closing_mode);
    } else {
        println!("(All dates, closing mode: {})", report.closing_mode);
    }
    println!("");
    println!("{}\n", render_report(report));
}

pub fn preview_sources(stats: &[SourceStats]) {
    if stats.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(stats).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
