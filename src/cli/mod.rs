//! Sales forecasting CLI
//!
//! Command-line interface for walk-forward cross-validation experiments.

use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ExperimentConfig;
use crate::evaluation::MetricSummary;
use crate::timeseries::CrossValidator;
use crate::training::{ModelType, METRIC_NAMES};
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sales-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Walk-forward cross-validation for weekly sales forecasting")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every experiment command. Flags override the config file.
#[derive(Args, Debug, Clone)]
pub struct ExperimentArgs {
    /// Input data file (CSV or TSV)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Experiment config (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target column name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Model type (linear, ridge, lasso)
    #[arg(short, long)]
    pub model: Option<ModelType>,

    /// Regularization strength for ridge and lasso
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Number of folds
    #[arg(long)]
    pub n_splits: Option<usize>,

    /// Periods per test window
    #[arg(long)]
    pub test_size: Option<usize>,

    /// Periods the test window advances per fold
    #[arg(long)]
    pub step_size: Option<usize>,

    /// Comma-separated columns to standardize
    #[arg(long, value_delimiter = ',')]
    pub scale: Option<Vec<String>>,
}

impl ExperimentArgs {
    /// Config file (or defaults) with flag overrides applied
    pub fn resolve(&self) -> anyhow::Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };

        if let Some(target) = &self.target {
            config = config.with_target(target);
        }
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        if let Some(alpha) = self.alpha {
            config = config.with_alpha(alpha);
        }
        if let Some(cols) = &self.scale {
            config = config.with_cols_to_scale(Some(cols.clone()));
        }
        let n_splits = self.n_splits.unwrap_or(config.n_splits);
        let test_size = self.test_size.unwrap_or(config.test_size);
        let step_size = self.step_size.unwrap_or(config.step_size);
        config = config.with_splits(n_splits, test_size, step_size);

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cross-validate the forecasting pipeline
    CrossValidate {
        #[command(flatten)]
        args: ExperimentArgs,

        /// Write the metric summary table as CSV
        #[arg(long)]
        summary_out: Option<PathBuf>,

        /// Write per-row true/pred values for every fold as CSV
        #[arg(long)]
        eval_out: Option<PathBuf>,

        /// Evaluate folds in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Show fold windows without fitting
    Splits {
        #[command(flatten)]
        args: ExperimentArgs,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

pub fn load_data(path: &Path) -> anyhow::Result<DataFrame> {
    load_with(&DataLoader::new(), path)
}

fn load_with(loader: &DataLoader, path: &Path) -> anyhow::Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "tsv" | "txt" => Ok(loader.load_auto(path)?),
        _ => anyhow::bail!("Unsupported file format: {}", ext),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_cross_validate(
    args: &ExperimentArgs,
    summary_out: Option<&Path>,
    eval_out: Option<&Path>,
    parallel: bool,
) -> anyhow::Result<()> {
    let mut config = args.resolve()?;
    if parallel {
        config = config.with_parallel(true);
    }

    print_experiment_box(&config);
    section("Cross-validate");

    step_run("Loading data");
    let start = Instant::now();
    let df = load_data(&args.data)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let mut factory = config.factory()?;

    step_run("Indexing by period");
    let table = factory.preprocessing(&df)?;
    let (x, y) = factory.split_target(&table)?;
    step_done(&format!("{} feature cols", x.value_columns().len()));

    let cv = config.splitter()?;
    step_run(&format!("Running {} folds", cv.get_n_splits()));
    let start = Instant::now();
    let output = factory.cross_validate(&x, &y, &cv, config.cv_options())?;
    step_done(&format!("{:?}", start.elapsed()));

    print_summary(&output.metric_summary);

    if let Some(path) = summary_out {
        DataSaver::save_csv(&output.metric_summary.to_dataframe()?, path)?;
        step_ok(&format!("Summary → {}", path.display()));
    }
    if let Some(path) = eval_out {
        if let Some(eval) = output.eval_frame()? {
            DataSaver::save_csv(&eval, path)?;
            step_ok(&format!("Eval table → {} ({} rows)", path.display(), eval.height()));
        }
    }

    println!();
    Ok(())
}

pub fn cmd_splits(args: &ExperimentArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    section("Splits");

    step_run("Loading data");
    let df = load_data(&args.data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let table = config.indexer().transform(&df)?;
    let cv = config.splitter()?;
    let folds = cv.split(&table)?;

    println!();
    println!("  {}", kv("Periods", &folds.time_range().len().to_string()));
    println!("  {}", kv("Needed ", &(cv.min_required_size()? + 1).to_string()));
    println!();
    println!(
        "  {:<6} {:<17} {:<17} {:>7} {:>7}",
        muted("Fold"), muted("Train"), muted("Test"), muted("Rows"), muted("Rows")
    );
    println!("  {}", dim(&"─".repeat(58)));

    for fold in folds {
        println!(
            "  {:<6} {:<17} {:<17} {:>7} {:>7}",
            fold.fold + 1,
            period_span(&fold.train_periods),
            period_span(&fold.test_periods),
            fold.train_indices.len(),
            fold.test_indices.len()
        );
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    // types are reported for the whole file, not a sample
    let df = load_with(&DataLoader::new().with_infer_schema_length(None), data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);

    match ExperimentConfig::default().indexer().transform(&df) {
        Ok(table) => {
            let periods = table
                .data()
                .column(crate::timeseries::DEFAULT_TIME_INDEX)?
                .n_unique()?;
            println!("  {:<12} {}", muted("Periods"), periods);
        }
        Err(e) => println!("  {:<12} {}", muted("Periods"), dim(&e.to_string())),
    }
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    println!();
    Ok(())
}

// ─── Output ────────────────────────────────────────────────────────────────────

fn print_experiment_box(config: &ExperimentConfig) {
    let scaled = match &config.cols_to_scale {
        Some(cols) => cols.join(", "),
        None => "all features".to_string(),
    };

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Sales Forecast".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Target ", &config.target));
    line_box(&kv("Model  ", &config.model.to_string()));
    line_box(&kv("Scale  ", &scaled));
    line_box(&kv(
        "Splits ",
        &format!(
            "n={} test={} step={} on {}",
            config.n_splits, config.test_size, config.step_size, config.time_index_name
        ),
    ));
    line_box_empty();
    line_box_bottom();
}

fn print_summary(summary: &MetricSummary) {
    section("Metric summary");

    let mut header = format!("  {:<8}", muted("metric"));
    for name in summary.fold_columns() {
        header.push_str(&format!(" {:>14}", muted(&name)));
    }
    header.push_str(&format!(" {:>14}", muted("avg")));
    println!("{}", header);
    println!("  {}", dim(&"─".repeat(8 + 15 * (summary.n_folds() + 1))));

    let averages = summary.averages();
    for (row, metric) in METRIC_NAMES.iter().enumerate() {
        let mut line = format!("  {:<8}", metric);
        for fold in summary.folds() {
            line.push_str(&format!(" {:>14.4}", fold.values()[row]));
        }
        line.push_str(&format!(" {:>14}", format!("{:.4}", averages[row]).white().bold()));
        println!("{}", line);
    }
}

fn period_span(periods: &[i64]) -> String {
    match (periods.first(), periods.last()) {
        (Some(first), Some(last)) => format!("{}..{}", first, last),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unsupported_format() {
        assert!(load_data(Path::new("sales.parquet")).is_err());
    }

    #[test]
    fn test_info_scans_whole_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Store,Date,Weekly_Sales,CPI").unwrap();
        for w in 0..150 {
            writeln!(file, "1,{:02}-01-2011,100,{}", w % 28 + 1, 211).unwrap();
        }
        writeln!(file, "1,29-01-2011,100,211.5").unwrap();

        let df = load_with(&DataLoader::new().with_infer_schema_length(None), file.path()).unwrap();
        assert_eq!(df.column("CPI").unwrap().dtype(), &DataType::Float64);
        assert!(cmd_info(file.path()).is_ok());
    }
}
