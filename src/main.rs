// Entry point and console flow.
//
// - Option [1] loads the forecast and actual-order sheets (CSV exports).
// - Option [2] takes the operator's likely-closing numbers per variant.
// - Option [3] picks the month to report on.
// - Option [4] builds the comparison table, previews it and exports it.
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use clap::Parser;
use once_cell::sync::Lazy;

use oi_forecast::error::Result;
use oi_forecast::types::SourceTable;
use oi_forecast::util::format_int;
use oi_forecast::{generate_report, loader, logging, output, LikelyClosing, LineupConfig, Period};

#[derive(Parser, Debug)]
#[command(name = "oi-forecast", version, about = "Forecast vs order intake dashboard")]
struct Args {
    /// Lineup TOML; the built-in lineup is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "forecast.csv")]
    forecast: PathBuf,
    #[arg(long, default_value = "actual.csv")]
    actual: PathBuf,
    /// Month to report on, e.g. "NOV 2025" or "2025-11".
    #[arg(long)]
    period: Option<String>,
    /// Where report.csv and report.json are written.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

// Per-session state: one console session per process.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    forecast: Option<SourceTable>,
    actual: Option<SourceTable>,
    likely: LikelyClosing,
    period: Option<Period>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Print `label` and read one trimmed line.
fn prompt(label: &str) -> String {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(forecast_path: &Path, actual_path: &Path) {
    let loaded = loader::load_table("forecast", forecast_path)
        .and_then(|f| loader::load_table("actual", actual_path).map(|a| (f, a)));
    match loaded {
        Ok((forecast, actual)) => {
            println!(
                "Loaded {} forecast rows and {} order intake rows.\n",
                format_int(forecast.rows.len()),
                format_int(actual.rows.len())
            );
            let mut st = state();
            st.forecast = Some(forecast);
            st.actual = Some(actual);
            // likely closing belongs to the previous upload
            st.likely.clear();
            println!("Likely closing entries reset; enter them again with option 2.\n");
        }
        Err(e) => eprintln!("Failed to load file: {}\n", e),
    }
}

fn handle_likely(config: &LineupConfig) {
    println!("Manual Likely Closing Input (blank keeps the current value)");
    let mut st = state();
    for variant in &config.variants {
        loop {
            let current = st.likely.get(variant);
            let input = prompt(&format!("  {variant} [{current}]: "));
            if input.is_empty() {
                break;
            }
            match input.parse::<u64>() {
                Ok(units) => {
                    if let Err(e) = st.likely.set(config, variant, units) {
                        eprintln!("{e}");
                    }
                    break;
                }
                Err(_) => println!("Please enter a whole number of units (0 or more)."),
            }
        }
    }
    println!("");
}

fn handle_period() {
    let input = prompt("Period (e.g. NOV 2025, blank for all dates): ");
    let mut st = state();
    if input.is_empty() {
        st.period = None;
        println!("Reporting on all dates.\n");
        return;
    }
    match Period::parse(&input) {
        Ok(p) => {
            println!("Reporting on {p}.\n");
            st.period = Some(p);
        }
        Err(e) => println!("{e}\n"),
    }
}

fn export(out_dir: &Path, report: &oi_forecast::ReportTable) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    output::write_report_csv(&out_dir.join("report.csv"), report)?;
    output::write_json(&out_dir.join("report.json"), report)?;
    Ok(())
}

fn handle_generate(config: &LineupConfig, out_dir: &Path) {
    let st = state();
    let (Some(forecast), Some(actual)) = (&st.forecast, &st.actual) else {
        println!("Error: upload both sheets first (option 1).\n");
        return;
    };

    let report = match generate_report(config, forecast, actual, &st.likely, st.period) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Cannot build report: {e}\n");
            return;
        }
    };

    output::preview_report(&report);
    println!("Source diagnostics:\n");
    output::preview_sources(&report.sources);
    for s in report.sources.iter().filter(|s| s.fallback_rows > 0) {
        println!(
            "Note: {} {} rows defaulted to {}.",
            format_int(s.fallback_rows),
            s.source,
            config.fallback
        );
    }

    match export(out_dir, &report) {
        Ok(()) => println!("(Report exported to {})\n", out_dir.join("report.csv").display()),
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

fn main() {
    logging::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LineupConfig::load(path),
        None => LineupConfig::builtin(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid lineup: {e}");
            std::process::exit(2);
        }
    };

    if let Some(sel) = &args.period {
        match Period::parse(sel) {
            Ok(p) => state().period = Some(p),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        }
    }

    loop {
        println!("Forecast vs Order Intake ({})", config.name);
        println!("[1] Load forecast and actual files");
        println!("[2] Enter likely closing");
        println!("[3] Select period");
        println!("[4] Generate report\n");
        match prompt("Enter choice: ").as_str() {
            "1" => handle_load(&args.forecast, &args.actual),
            "2" => handle_likely(&config),
            "3" => handle_period(),
            "4" => {
                println!("");
                handle_generate(&config, &args.out_dir);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2, 3 or 4.\n"),
        }
    }
}
