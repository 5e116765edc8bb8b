use std::collections::HashMap;

use crate::config::{ClosingMode, LineupConfig};
use crate::error::{ReportError, Result};
use crate::filter::Period;
use crate::loader::{prepare_source, PreparedSource};
use crate::normalizer::Normalizer;
use crate::types::{Cell, NormalizedRecord, ReportRow, ReportTable, RowKind, SourceTable};
use crate::util::round1;

pub const ACTUAL_LABEL: &str = "Actual OI - Till Date";
pub const LIKELY_LABEL: &str = "Likely Closing (N)";
pub const MONTH_CLOSING_LABEL: &str = "Actual Month Closing";
pub const ACHIEVEMENT_LABEL: &str = "% Achievement";

/// Operator-entered likely closing per canonical variant.
#[derive(Debug, Clone, Default)]
pub struct LikelyClosing {
    entries: HashMap<String, u64>,
}

impl LikelyClosing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only lineup variants are accepted.
    pub fn set(&mut self, config: &LineupConfig, variant: &str, units: u64) -> Result<()> {
        if config.variant_index(variant).is_none() {
            return Err(ReportError::UnknownVariant(variant.to_string()));
        }
        self.entries.insert(variant.to_string(), units);
        Ok(())
    }

    pub fn from_pairs<'a, I>(config: &LineupConfig, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut likely = Self::new();
        for (variant, units) in pairs {
            likely.set(config, variant, units)?;
        }
        Ok(likely)
    }

    /// Missing entries read as 0.
    pub fn get(&self, variant: &str) -> u64 {
        self.entries.get(variant).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Sum quantities per variant column. The result always has one slot per
/// lineup variant, zero where nothing was recorded.
pub fn aggregate(records: &[NormalizedRecord], variant_count: usize) -> Vec<u64> {
    let mut sums = vec![0u64; variant_count];
    for r in records {
        if let Some(slot) = sums.get_mut(r.variant_index) {
            *slot = slot.saturating_add(r.quantity);
        }
    }
    sums
}

fn forecast_label(period: Option<Period>) -> String {
    match period {
        Some(p) => format!("{} - Forecast", p.month_abbrev()),
        None => "Forecast".to_string(),
    }
}

fn total(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

fn count_row(label: &str, kind: RowKind, values: &[u64]) -> ReportRow {
    ReportRow {
        label: label.to_string(),
        kind,
        cells: values.iter().map(|v| Cell::Count(*v)).collect(),
        grand_total: Cell::Count(total(values)),
    }
}

fn achievement(achieved: u64, forecast: u64) -> Cell {
    if forecast == 0 {
        Cell::Placeholder
    } else {
        Cell::Percent(round1(achieved as f64 / forecast as f64 * 100.0))
    }
}

/// Assemble the comparison table from prepared sources.
///
/// Count rows total across the variants. The achievement row's Grand Total
/// is the percentage of the count totals, never a sum of percentages.
pub fn build_report(
    config: &LineupConfig,
    forecast: &PreparedSource,
    actual: &PreparedSource,
    likely: &LikelyClosing,
    period: Option<Period>,
) -> ReportTable {
    let n = config.variants.len();
    let forecast_sums = aggregate(&forecast.records, n);
    let actual_sums = aggregate(&actual.records, n);
    let likely_vals: Vec<u64> = config.variants.iter().map(|v| likely.get(v)).collect();

    let mut rows = vec![
        count_row(&forecast_label(period), RowKind::Forecast, &forecast_sums),
        count_row(ACTUAL_LABEL, RowKind::ActualToDate, &actual_sums),
        count_row(LIKELY_LABEL, RowKind::LikelyClosing, &likely_vals),
    ];

    let achieved: Vec<u64> = match config.report.closing_mode {
        ClosingMode::Standalone => actual_sums.clone(),
        ClosingMode::Incremental => {
            let closing: Vec<u64> = actual_sums
                .iter()
                .zip(&likely_vals)
                .map(|(a, l)| a.saturating_add(*l))
                .collect();
            rows.push(count_row(MONTH_CLOSING_LABEL, RowKind::MonthClosing, &closing));
            closing
        }
    };

    rows.push(ReportRow {
        label: ACHIEVEMENT_LABEL.to_string(),
        kind: RowKind::Achievement,
        cells: achieved
            .iter()
            .zip(&forecast_sums)
            .map(|(a, f)| achievement(*a, *f))
            .collect(),
        grand_total: achievement(total(&achieved), total(&forecast_sums)),
    });

    tracing::info!(
        lineup = %config.name,
        mode = %config.report.closing_mode,
        forecast = total(&forecast_sums),
        actual = total(&actual_sums),
        "report built"
    );

    ReportTable {
        lineup: config.name.clone(),
        period: period.map(|p| p.to_string()),
        closing_mode: config.report.closing_mode.to_string(),
        columns: config.variants.clone(),
        rows,
        sources: vec![forecast.stats.clone(), actual.stats.clone()],
    }
}

/// Full run: resolve, filter and normalize both sheets, then build the table.
///
/// Both sources are prepared before anything is assembled, so a missing
/// column in either one returns an error and no partial table.
pub fn generate_report(
    config: &LineupConfig,
    forecast: &SourceTable,
    actual: &SourceTable,
    likely: &LikelyClosing,
    period: Option<Period>,
) -> Result<ReportTable> {
    let normalizer = Normalizer::new(config)?;
    let forecast = prepare_source(forecast, config, &normalizer, period)?;
    let actual = prepare_source(actual, config, &normalizer, period)?;
    Ok(build_report(config, &forecast, &actual, likely, period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnRole;
    use crate::loader::read_table;

    fn sheet(name: &str, csv: &str) -> SourceTable {
        read_table(name, csv.as_bytes()).unwrap()
    }

    fn builtin() -> LineupConfig {
        LineupConfig::builtin().unwrap()
    }

    fn count(report: &ReportTable, kind: RowKind, variant: &str) -> u64 {
        report.cell(kind, variant).and_then(|c| c.count()).unwrap()
    }

    #[test]
    fn cross_scenario() {
        let config = builtin();
        let forecast = sheet("forecast", "Variant\nCROSS 164D 1.8X\nCROSS 164D 1.8X\nCROSS 164D 1.8X\n");
        let actual = sheet("actual", "Variant\nCROSS 164D 1.8X\nCROSS 164D 1.8X\n");
        let likely = LikelyClosing::from_pairs(&config, [("CROSS", 1)]).unwrap();

        let report = generate_report(&config, &forecast, &actual, &likely, None).unwrap();

        assert_eq!(count(&report, RowKind::Forecast, "CROSS"), 3);
        assert_eq!(count(&report, RowKind::ActualToDate, "CROSS"), 2);
        assert_eq!(count(&report, RowKind::LikelyClosing, "CROSS"), 1);
        assert_eq!(count(&report, RowKind::Forecast, "1.3 GLI MT"), 0);

        let totals: Vec<Cell> = report.rows.iter().map(|r| r.grand_total).collect();
        assert_eq!(
            totals,
            vec![Cell::Count(3), Cell::Count(2), Cell::Count(1), Cell::Percent(66.7)]
        );
        assert_eq!(report.cell(RowKind::Achievement, "CROSS"), Some(Cell::Percent(66.7)));
    }

    #[test]
    fn columns_follow_lineup_order_even_without_data() {
        let config = builtin();
        let forecast = sheet("forecast", "Variant\n");
        let actual = sheet("actual", "Model\nFORTUNER 481D GR-S\n");
        let report =
            generate_report(&config, &forecast, &actual, &LikelyClosing::new(), None).unwrap();
        assert_eq!(report.columns, config.variants);
        for row in &report.rows {
            assert_eq!(row.cells.len(), config.variants.len());
        }
        assert_eq!(report.rows[0].label, "Forecast");
        assert_eq!(report.rows[1].label, ACTUAL_LABEL);
        assert_eq!(report.rows[2].label, LIKELY_LABEL);
        assert_eq!(report.rows[3].label, ACHIEVEMENT_LABEL);
    }

    #[test]
    fn zero_forecast_gives_placeholder() {
        let config = builtin();
        let forecast = sheet("forecast", "Variant\nCROSS 164D 1.8\n");
        let actual = sheet("actual", "Variant\nFORTUNER 481D GR-S\nCROSS 164D 1.8\nCROSS 164D 1.8\n");
        let report =
            generate_report(&config, &forecast, &actual, &LikelyClosing::new(), None).unwrap();
        assert_eq!(report.cell(RowKind::Achievement, "Fortuner"), Some(Cell::Placeholder));
        assert_eq!(report.cell(RowKind::Achievement, "1.8L"), Some(Cell::Placeholder));
        assert_eq!(report.cell(RowKind::Achievement, "CROSS"), Some(Cell::Percent(200.0)));
        let ach = report.row(RowKind::Achievement).unwrap();
        assert_eq!(ach.grand_total, Cell::Percent(300.0));
        assert_eq!(ach.grand_total.to_string(), "300.0");
        assert_eq!(Cell::Placeholder.to_string(), "-");
    }

    #[test]
    fn empty_everything_gives_placeholder_total() {
        let config = builtin();
        let empty = sheet("forecast", "Variant\n");
        let report = generate_report(&config, &empty, &empty, &LikelyClosing::new(), None).unwrap();
        let ach = report.row(RowKind::Achievement).unwrap();
        assert!(ach.cells.iter().all(|c| *c == Cell::Placeholder));
        assert_eq!(ach.grand_total, Cell::Placeholder);
    }

    #[test]
    fn unknown_variant_lands_in_fallback_column() {
        let config = builtin();
        let forecast = sheet("forecast", "Variant\nUNKNOWN MODEL XYZ\n");
        let actual = sheet("actual", "Variant\n");
        let report =
            generate_report(&config, &forecast, &actual, &LikelyClosing::new(), None).unwrap();
        assert_eq!(count(&report, RowKind::Forecast, "IMV-I"), 1);
        assert_eq!(report.rows[0].grand_total, Cell::Count(1));
        assert_eq!(report.sources[0].fallback_rows, 1);
    }

    #[test]
    fn grand_total_is_row_sum() {
        let config = builtin();
        let forecast = sheet(
            "forecast",
            "Model,Qty\nYARIS 046D 1.3 H MT,4\nALTIS 1.6 MT M20,2\nREVO 481D ROCCO,5\nmystery,1\n",
        );
        let actual = sheet("actual", "Model\nYARIS 046D 1.3 H MT\n");
        let likely =
            LikelyClosing::from_pairs(&config, [("1.3 ATIV MT", 2), ("IMV-III", 3)]).unwrap();
        let report = generate_report(&config, &forecast, &actual, &likely, None).unwrap();
        for row in report.rows.iter().filter(|r| r.kind.is_count()) {
            let sum: u64 = row.cells.iter().filter_map(Cell::count).sum();
            assert_eq!(row.grand_total, Cell::Count(sum), "row {}", row.label);
        }
        assert_eq!(report.rows[0].grand_total, Cell::Count(12));
        assert_eq!(count(&report, RowKind::Forecast, "1.3 ATIV MT"), 4);
        assert_eq!(count(&report, RowKind::Forecast, "1.3 GLI MT"), 0);
    }

    #[test]
    fn row_count_semantics_without_quantity() {
        let config = builtin();
        let csv = "Variant\nREVO 481D GR-S\nREVO 481D 4X4 V AT\nFORTUNER481D4X4VAT\n";
        let forecast = sheet("forecast", csv);
        let normalizer = Normalizer::new(&config).unwrap();
        let prepared = prepare_source(&forecast, &config, &normalizer, None).unwrap();
        let sums = aggregate(&prepared.records, config.variants.len());
        assert_eq!(sums.iter().sum::<u64>(), forecast.rows.len() as u64);
        assert_eq!(sums[config.variant_index("IMV-III").unwrap()], 2);
        assert_eq!(sums[config.variant_index("Fortuner").unwrap()], 1);
    }

    #[test]
    fn incremental_mode_adds_month_closing() {
        let mut config = builtin();
        config.report.closing_mode = ClosingMode::Incremental;
        let forecast = sheet("forecast", "Variant\nCROSS 164D 1.8X\nCROSS 164D 1.8X\nCROSS 164D 1.8X\nCROSS 164D 1.8X\n");
        let actual = sheet("actual", "Variant\nCROSS 164D 1.8X\n");
        let likely = LikelyClosing::from_pairs(&config, [("CROSS", 2), ("Fortuner", 1)]).unwrap();
        let report = generate_report(&config, &forecast, &actual, &likely, None).unwrap();

        let labels: Vec<&str> = report.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Forecast", ACTUAL_LABEL, LIKELY_LABEL, MONTH_CLOSING_LABEL, ACHIEVEMENT_LABEL]
        );
        assert_eq!(count(&report, RowKind::MonthClosing, "CROSS"), 3);
        assert_eq!(count(&report, RowKind::MonthClosing, "Fortuner"), 1);
        assert_eq!(report.cell(RowKind::Achievement, "CROSS"), Some(Cell::Percent(75.0)));
        let ach = report.row(RowKind::Achievement).unwrap();
        assert_eq!(ach.grand_total, Cell::Percent(100.0));
        assert_eq!(report.closing_mode, "incremental");
    }

    #[test]
    fn period_filter_and_forecast_label() {
        let config = builtin();
        let forecast = sheet("forecast", "Variant,Month\nCROSS 164D 1.8X,01/11/2025\nCROSS 164D 1.8X,01/10/2025\n");
        let actual = sheet("actual", "Variant,Date\nCROSS 164D 1.8X,2025-10-15\nCROSS 164D 1.8X,2025-11-03\n");
        let period = Period::parse("NOV 2025").unwrap();
        let report =
            generate_report(&config, &forecast, &actual, &LikelyClosing::new(), Some(period))
                .unwrap();
        assert_eq!(report.rows[0].label, "NOV - Forecast");
        assert_eq!(report.period.as_deref(), Some("NOV 2025"));
        assert_eq!(count(&report, RowKind::Forecast, "CROSS"), 1);
        assert_eq!(count(&report, RowKind::ActualToDate, "CROSS"), 1);
        assert_eq!(report.sources[1].outside_period, 1);
    }

    #[test]
    fn missing_column_stops_the_run() {
        let config = builtin();
        let forecast = sheet("forecast", "Variant\nCROSS 164D 1.8X\n");
        let actual = sheet("actual", "Customer,Qty\nAli,1\n");
        let err = generate_report(&config, &forecast, &actual, &LikelyClosing::new(), None)
            .unwrap_err();
        match err {
            ReportError::MissingColumn { source_name, role, .. } => {
                assert_eq!(source_name, "actual");
                assert_eq!(role, ColumnRole::Variant);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn oversized_quantities_do_not_overflow() {
        let config = builtin();
        let forecast = sheet(
            "forecast",
            "Variant,Qty\nCROSS 164D 1.8X,18446744073709551615\nCROSS 164D 1.8X,5\n",
        );
        let actual = sheet("actual", "Variant\n");
        let report =
            generate_report(&config, &forecast, &actual, &LikelyClosing::new(), None).unwrap();
        // the oversized cell is unusable and counts as one unit
        assert_eq!(count(&report, RowKind::Forecast, "CROSS"), 6);
        assert_eq!(report.sources[0].invalid_quantities, 1);

        let records = vec![
            NormalizedRecord {
                raw_variant: "CROSS".into(),
                canonical: "CROSS".into(),
                variant_index: 0,
                quantity: u64::MAX,
                date: None,
            };
            2
        ];
        assert_eq!(aggregate(&records, 1), vec![u64::MAX]);
        assert_eq!(count_row("x", RowKind::Forecast, &[u64::MAX, 1]).grand_total, Cell::Count(u64::MAX));
    }

    #[test]
    fn likely_closing_rejects_unknown_variant() {
        let config = builtin();
        let mut likely = LikelyClosing::new();
        assert!(likely.set(&config, "CROSS", 4).is_ok());
        let err = likely.set(&config, "COROLLA", 1).unwrap_err();
        assert!(matches!(err, ReportError::UnknownVariant(ref v) if v == "COROLLA"));
        assert_eq!(likely.get("CROSS"), 4);
        assert_eq!(likely.get("1.8L"), 0);
        likely.clear();
        assert_eq!(likely.get("CROSS"), 0);
    }
}
