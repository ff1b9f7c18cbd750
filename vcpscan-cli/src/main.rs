//! vcpscan CLI: analyze, scan, monitor and config commands.
//!
//! Commands:
//! - `analyze`: run the full pipeline on one symbol and print the Decision as JSON
//! - `scan`: analyze every symbol in a scan TOML, print a summary CSV, optionally save artifacts
//! - `monitor`: replay a held position through later bars and print the transition tape
//! - `config`: print the effective engine configuration and its hash
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use vcpscan_core::data::{FundamentalsProvider, MarketDataProvider};
use vcpscan_core::domain::Series;
use vcpscan_core::{Analyzer, EngineConfig, Verdict};
use vcpscan_runner::config::DEFAULT_LOOKBACK_DAYS;
use vcpscan_runner::{
    export_summary_csv, export_transitions_csv, load_position, replay_position, run_scan, save_report, CsvProvider,
    JsonFundamentalsProvider, ScanConfig,
};

#[derive(Parser)]
#[command(name = "vcpscan", about = "vcpscan: trend template and VCP breakout analysis")]
struct Cli {
    /// Emit debug-level logs on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single symbol and print its Decision as JSON.
    Analyze {
        /// Symbol to analyze; bars are read from `<data-dir>/<SYMBOL>.csv`.
        symbol: String,

        /// Directory of per-symbol CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Benchmark symbol for relative strength.
        #[arg(long)]
        benchmark: Option<String>,

        /// Engine configuration TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fundamentals JSON keyed by symbol.
        #[arg(long)]
        fundamentals: Option<PathBuf>,

        /// Number of most recent bars to analyze.
        #[arg(long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
        lookback: usize,
    },
    /// Scan the symbols listed in a scan TOML.
    Scan {
        /// Path to the scan TOML.
        #[arg(long)]
        config: PathBuf,

        /// Write report.json and summary.csv here.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Force sequential analysis regardless of the config.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Replay a position JSON through the bars after its entry date.
    Monitor {
        /// Position JSON file.
        #[arg(long)]
        position: PathBuf,

        /// Directory of per-symbol CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Benchmark symbol for the RS-deterioration rule.
        #[arg(long)]
        benchmark: Option<String>,

        /// Engine configuration TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the final position as JSON after the tape.
        #[arg(long, default_value_t = false)]
        show_position: bool,
    },
    /// Print the effective engine configuration as TOML, with its hash.
    Config {
        /// Engine configuration TOML to validate. Defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze {
            symbol,
            data_dir,
            benchmark,
            config,
            fundamentals,
            lookback,
        } => run_analyze(&symbol, &data_dir, benchmark.as_deref(), config.as_deref(), fundamentals.as_deref(), lookback),
        Commands::Scan {
            config,
            output_dir,
            sequential,
        } => run_scan_cmd(&config, output_dir.as_deref(), sequential),
        Commands::Monitor {
            position,
            data_dir,
            benchmark,
            config,
            show_position,
        } => run_monitor(&position, &data_dir, benchmark.as_deref(), config.as_deref(), show_position),
        Commands::Config { config } => run_config(config.as_deref()),
    }
}

fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(p) => EngineConfig::from_file(p).with_context(|| format!("failed to load {}", p.display()))?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_benchmark(provider: &CsvProvider, symbol: Option<&str>, lookback: usize) -> Result<Option<Series>> {
    symbol
        .map(|s| {
            provider
                .fetch(&s.to_uppercase(), lookback)
                .with_context(|| format!("benchmark {s} could not be loaded"))
        })
        .transpose()
}

fn run_analyze(
    symbol: &str,
    data_dir: &Path,
    benchmark: Option<&str>,
    config: Option<&Path>,
    fundamentals: Option<&Path>,
    lookback: usize,
) -> Result<()> {
    let analyzer = Analyzer::new(load_engine_config(config)?)?;
    let provider = CsvProvider::new(data_dir);
    let bench = load_benchmark(&provider, benchmark, lookback)?;
    let fundamentals = fundamentals
        .map(JsonFundamentalsProvider::from_file)
        .transpose()?;

    let decision = analyzer.analyze_symbol(
        &provider,
        fundamentals.as_ref().map(|f| f as &dyn FundamentalsProvider),
        &symbol.to_uppercase(),
        bench.as_ref(),
        lookback,
    )?;
    info!(
        symbol = %decision.symbol,
        verdict = %decision.verdict,
        confidence = decision.confidence_score,
        "analysis complete"
    );
    println!("{}", decision.to_json_pretty()?);
    Ok(())
}

fn run_scan_cmd(config_path: &Path, output_dir: Option<&Path>, sequential: bool) -> Result<()> {
    let mut config = ScanConfig::from_file(config_path)?;
    if sequential {
        config.parallel = false;
    }

    let report = run_scan(&config)?;
    info!(
        symbols = report.outcomes.len(),
        failures = report.failures().count(),
        actionable = report.count_at_least(Verdict::BuyOnConfirmation),
        config_hash = %report.config_hash,
        "scan complete"
    );

    print!("{}", export_summary_csv(&report)?);

    if let Some(dir) = output_dir {
        let paths = save_report(&report, dir)?;
        for path in &paths {
            info!(path = %path.display(), "artifact written");
        }
    }
    Ok(())
}

fn run_monitor(
    position_path: &Path,
    data_dir: &Path,
    benchmark: Option<&str>,
    config: Option<&Path>,
    show_position: bool,
) -> Result<()> {
    let config = load_engine_config(config)?;
    let position = load_position(position_path)?;
    let provider = CsvProvider::new(data_dir);
    let bars = provider
        .read_bars(&position.symbol)
        .with_context(|| format!("failed to read bars for {}", position.symbol))?;
    let series = Series::new(position.symbol.clone(), bars)?;
    let bench = load_benchmark(&provider, benchmark, series.len())?;

    let outcome = replay_position(position, &series, bench, &config)?;
    print!("{}", export_transitions_csv(&outcome.transitions)?);
    if show_position {
        println!("{}", serde_json::to_string_pretty(&outcome.position)?);
    }
    if let Some(closed) = &outcome.closed {
        info!(
            symbol = %closed.position.symbol,
            realized_pnl = closed.realized_pnl,
            closed_at = %closed.closed_at,
            "position closed"
        );
    }
    Ok(())
}

fn run_config(config: Option<&Path>) -> Result<()> {
    let config = load_engine_config(config)?;
    println!("# config_hash = \"{}\"", config.config_hash()?);
    print!("{}", config.to_toml_string()?);
    Ok(())
}
