//! Command-line front end: CSV in, capability tables out.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::info;

use cpk_analytics::config::{ClassificationMode, ColumnRoles, ConfigFile, Grouping};
use cpk_analytics::logging::init_logging;
use cpk_analytics::pivot::{PivotCell, PivotTable};
use cpk_analytics::record::Quarter;
use cpk_analytics::report::{round_to, CapabilityReport, StatisticsTable};
use cpk_analytics::{CapabilityEngine, RawTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

/// Compute process capability (Cpk) per product type from test records.
#[derive(Debug, Parser)]
#[command(name = "cpk-report", version, about)]
struct Cli {
    /// CSV file with one row per test.
    #[arg(short, long)]
    input: PathBuf,

    /// TOML file with `[engine]` and `[columns]` tables.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Product type column.
    #[arg(long)]
    type_col: Option<String>,
    /// Unit serial number column.
    #[arg(long)]
    sn_col: Option<String>,
    /// Test date column.
    #[arg(long)]
    date_col: Option<String>,
    /// Test time column.
    #[arg(long)]
    time_col: Option<String>,
    /// Measured value column.
    #[arg(long)]
    value_col: Option<String>,
    /// Upper specification limit column.
    #[arg(long)]
    upper_col: Option<String>,
    /// Lower specification limit column.
    #[arg(long)]
    lower_col: Option<String>,

    /// Group by calendar quarter as well as product type.
    #[arg(long)]
    quarterly: bool,

    /// Classify undefined Cpk as reduced sampling, like the legacy report.
    #[arg(long)]
    lenient: bool,

    /// Only report these quarters, e.g. `2024Q1,2024Q2`.
    #[arg(long, value_delimiter = ',')]
    periods: Vec<Quarter>,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn default_roles() -> ColumnRoles {
    ColumnRoles {
        product_type: "Type".into(),
        unit_id: "SN".into(),
        date: "Date".into(),
        time: "Time".into(),
        value: "Value".into(),
        upper_limit: "Upper Limit".into(),
        lower_limit: "Lower Limit".into(),
    }
}

fn apply_overrides(mut roles: ColumnRoles, cli: &Cli) -> ColumnRoles {
    let pairs = [
        (&mut roles.product_type, &cli.type_col),
        (&mut roles.unit_id, &cli.sn_col),
        (&mut roles.date, &cli.date_col),
        (&mut roles.time, &cli.time_col),
        (&mut roles.value, &cli.value_col),
        (&mut roles.upper_limit, &cli.upper_col),
        (&mut roles.lower_limit, &cli.lower_col),
    ];
    for (slot, flag) in pairs {
        if let Some(name) = flag {
            slot.clone_from(name);
        }
    }
    roles
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => ConfigFile::default(),
    };
    let mut config = file.engine;
    if cli.quarterly {
        config.grouping = Grouping::ProductQuarter;
    }
    if cli.lenient {
        config.classification = ClassificationMode::Lenient;
    }
    check_periods(config.grouping, &cli.periods)?;
    let roles = apply_overrides(file.columns.unwrap_or_else(default_roles), &cli);
    let decimals = config.display_decimals;

    let table = RawTable::from_csv_path(&cli.input)
        .with_context(|| format!("failed to read '{}'", cli.input.display()))?;
    info!(rows = table.len(), path = %cli.input.display(), "loaded input table");

    let engine = CapabilityEngine::new(config)?;
    let mut report = engine.run(&table, &roles)?;
    if !cli.periods.is_empty() {
        report = report.for_periods(&cli.periods);
    }

    match cli.format {
        Format::Json => {
            let shown = CapabilityReport {
                statistics: report.statistics.rounded(decimals),
                ..report
            };
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        Format::Table => print!("{}", render_report(&report, decimals)),
    }
    Ok(())
}

/// Period filtering only selects quarterly groups.
fn check_periods(grouping: Grouping, periods: &[Quarter]) -> Result<()> {
    if !periods.is_empty() && grouping != Grouping::ProductQuarter {
        bail!("--periods requires quarterly grouping (pass --quarterly or set grouping = \"product_quarter\")");
    }
    Ok(())
}

fn number(v: Option<f64>, decimals: u32) -> String {
    v.map_or_else(
        || "-".to_owned(),
        |x| format!("{:.prec$}", round_to(x, decimals), prec = decimals as usize),
    )
}

fn render_report(report: &CapabilityReport, decimals: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total Tests: {}", report.totals.total_tests);
    let _ = writeln!(out, "Unique SN Count: {}", report.totals.unique_unit_count);
    if report.skipped_rows > 0 {
        let _ = writeln!(out, "Skipped rows (blank type or SN): {}", report.skipped_rows);
    }
    if report.unperiodized_records > 0 {
        let _ = writeln!(out, "Records without timestamp: {}", report.unperiodized_records);
    }
    out.push('\n');
    out.push_str(&render_statistics(&report.statistics, decimals));
    if let Some(pivot) = &report.pivot {
        out.push('\n');
        out.push_str(&render_pivot(pivot));
    }
    out
}

fn render_statistics(stats: &StatisticsTable, decimals: u32) -> String {
    let header = [
        "type", "period", "mean", "std", "upper", "lower", "cpk_upper", "cpk_lower", "cpk",
        "tests", "units", "code", "rate",
    ];
    let rows: Vec<Vec<String>> = stats
        .rows
        .iter()
        .map(|r| {
            vec![
                r.key.product_type.clone(),
                r.key.period.map_or_else(String::new, |p| p.to_string()),
                number(r.mean, decimals),
                number(r.std, decimals),
                number(r.upper_limit_avg, decimals),
                number(r.lower_limit_avg, decimals),
                number(r.cpk_upper, decimals),
                number(r.cpk_lower, decimals),
                number(r.cpk, decimals),
                r.total_tests.to_string(),
                r.unique_unit_count.to_string(),
                r.code.to_string(),
                r.rate.to_string(),
            ]
        })
        .collect();
    render_grid(&header.map(str::to_owned), &rows)
}

fn render_pivot(pivot: &PivotTable) -> String {
    let mut header = vec!["type".to_owned()];
    header.extend(pivot.columns.iter().cloned());
    let rows: Vec<Vec<String>> = pivot
        .rows
        .iter()
        .map(|row| {
            let mut line = vec![row.product_type.clone()];
            line.extend(row.cells.iter().map(|cell| match cell {
                None => String::new(),
                Some(PivotCell::Number(v)) => v.to_string(),
                Some(PivotCell::Count(n)) => n.to_string(),
                Some(PivotCell::Text(t)) => t.clone(),
                Some(PivotCell::Undefined) => "-".to_owned(),
            }));
            line
        })
        .collect();
    render_grid(&header, &rows)
}

fn render_grid(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut line = |cells: &[String]| {
        let joined: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", joined.join("  ").trim_end());
    };
    line(header);
    for row in rows {
        line(row.as_slice());
    }
    out
}
