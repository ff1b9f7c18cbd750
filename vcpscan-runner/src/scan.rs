//! Multi-symbol scanning.
//!
//! Each symbol is fetched and analyzed independently; with `parallel` set the
//! symbols fan out over rayon's pool. A failed fetch is recorded against its
//! symbol and never stops the scan. Output order always follows the input
//! symbol order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vcpscan_core::data::{FundamentalsProvider, MarketDataProvider};
use vcpscan_core::domain::Series;
use vcpscan_core::{AnalysisError, Analyzer, Decision, Verdict};

use crate::config::ScanConfig;
use crate::data_loader::{CsvProvider, JsonFundamentalsProvider};
use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Analyzed { decision: Box<Decision> },
    Failed { symbol: String, error: AnalysisError },
}

impl ScanOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            ScanOutcome::Analyzed { decision } => &decision.symbol,
            ScanOutcome::Failed { symbol, .. } => symbol,
        }
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            ScanOutcome::Analyzed { decision } => Some(decision),
            ScanOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub config_hash: String,
    pub benchmark: Option<String>,
    /// BLAKE3 over every analyzed bar, in symbol order.
    pub dataset_hash: String,
    pub outcomes: Vec<ScanOutcome>,
}

impl ScanReport {
    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.outcomes.iter().filter_map(ScanOutcome::decision)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &AnalysisError)> {
        self.outcomes.iter().filter_map(|o| match o {
            ScanOutcome::Failed { symbol, error } => Some((symbol.as_str(), error)),
            ScanOutcome::Analyzed { .. } => None,
        })
    }

    /// Decisions best first: verdict, then confidence, then symbol.
    pub fn ranked(&self) -> Vec<&Decision> {
        let mut out: Vec<&Decision> = self.decisions().collect();
        out.sort_by(|a, b| {
            b.verdict
                .cmp(&a.verdict)
                .then(b.confidence_score.total_cmp(&a.confidence_score))
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        out
    }

    pub fn count_at_least(&self, verdict: Verdict) -> usize {
        self.decisions().filter(|d| d.verdict >= verdict).count()
    }
}

/// Analyzes a list of symbols against one market data provider, in parallel
/// unless told otherwise. A failing symbol never aborts the scan.
pub struct Scanner<'a> {
    analyzer: Analyzer,
    market: &'a dyn MarketDataProvider,
    fundamentals: Option<&'a dyn FundamentalsProvider>,
    lookback_days: usize,
    parallel: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(analyzer: Analyzer, market: &'a dyn MarketDataProvider, lookback_days: usize) -> Self {
        Self {
            analyzer,
            market,
            fundamentals: None,
            lookback_days,
            parallel: true,
        }
    }

    pub fn with_fundamentals(mut self, provider: &'a dyn FundamentalsProvider) -> Self {
        self.fundamentals = Some(provider);
        self
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Fetch the benchmark series. Unlike a scanned symbol, a configured
    /// benchmark that cannot be loaded fails the whole scan.
    pub fn load_benchmark(&self, symbol: &str) -> Result<Series, ScanError> {
        self.market
            .fetch(symbol, self.lookback_days)
            .map_err(|e| ScanError::Benchmark {
                symbol: symbol.to_string(),
                source: AnalysisError::from(e),
            })
    }

    pub fn scan(&self, symbols: &[String], benchmark: Option<&Series>) -> ScanReport {
        info!(symbols = symbols.len(), parallel = self.parallel, "scan started");
        let analyze = |symbol: &String| -> (ScanOutcome, Option<Series>) {
            match self.fetch_and_analyze(symbol, benchmark) {
                Ok((decision, series)) => (
                    ScanOutcome::Analyzed {
                        decision: Box::new(decision),
                    },
                    Some(series),
                ),
                Err(error) => {
                    warn!(symbol = %symbol, %error, "symbol skipped");
                    (
                        ScanOutcome::Failed {
                            symbol: symbol.clone(),
                            error,
                        },
                        None,
                    )
                }
            }
        };

        let results: Vec<(ScanOutcome, Option<Series>)> = if self.parallel {
            symbols.par_iter().map(analyze).collect()
        } else {
            symbols.iter().map(analyze).collect()
        };

        let mut hasher = blake3::Hasher::new();
        for series in results.iter().filter_map(|(_, s)| s.as_ref()) {
            hash_series(&mut hasher, series);
        }
        let outcomes: Vec<ScanOutcome> = results.into_iter().map(|(o, _)| o).collect();

        let report = ScanReport {
            config_hash: self.analyzer.config_hash().to_string(),
            benchmark: benchmark.map(|b| b.symbol().to_string()),
            dataset_hash: hasher.finalize().to_hex().to_string(),
            outcomes,
        };
        info!(
            analyzed = report.decisions().count(),
            failed = report.failures().count(),
            buys = report.count_at_least(Verdict::BuyOnConfirmation),
            "scan finished"
        );
        report
    }

    fn fetch_and_analyze(&self, symbol: &str, benchmark: Option<&Series>) -> Result<(Decision, Series), AnalysisError> {
        self.analyzer
            .fetch_and_analyze(self.market, self.fundamentals, symbol, benchmark, self.lookback_days)
    }
}

fn hash_series(hasher: &mut blake3::Hasher, series: &Series) {
    hasher.update(series.symbol().as_bytes());
    for bar in series.bars() {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
}

/// Run a scan described by `config` against its CSV data directory.
pub fn run_scan(config: &ScanConfig) -> Result<ScanReport, ScanError> {
    config.validate()?;
    let analyzer = Analyzer::new(config.engine.clone())?;
    let market = CsvProvider::new(&config.data_dir);
    let fundamentals = config
        .fundamentals_file
        .as_deref()
        .map(JsonFundamentalsProvider::from_file)
        .transpose()?;

    let mut scanner = Scanner::new(analyzer, &market, config.lookback_days).with_parallelism(config.parallel);
    if let Some(provider) = fundamentals.as_ref() {
        scanner = scanner.with_fundamentals(provider);
    }

    let benchmark = match config.benchmark.as_deref() {
        Some(symbol) => Some(scanner.load_benchmark(&symbol.to_uppercase())?),
        None => {
            warn!("no benchmark configured; relative strength is undefined");
            None
        }
    };

    Ok(scanner.scan(&config.normalized_symbols(), benchmark.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{benchmark_bars, single_contraction_bars, vcp_bars};
    use crate::data_loader::write_bars_csv;
    use vcpscan_core::data::DataError;

    fn write_fixtures(dir: &std::path::Path) {
        write_bars_csv(&dir.join("VCP.csv"), &vcp_bars()).unwrap();
        write_bars_csv(&dir.join("ONE.csv"), &single_contraction_bars()).unwrap();
        write_bars_csv(&dir.join("SPY.csv"), &benchmark_bars(300)).unwrap();
    }

    fn config(dir: &std::path::Path, parallel: bool) -> ScanConfig {
        ScanConfig {
            symbols: vec!["vcp".into(), "MISSING".into(), "ONE".into()],
            benchmark: Some("SPY".into()),
            data_dir: dir.to_path_buf(),
            parallel,
            ..ScanConfig::default()
        }
    }

    #[test]
    fn scan_keeps_input_order_and_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let report = run_scan(&config(dir.path(), true)).unwrap();

        let symbols: Vec<&str> = report.outcomes.iter().map(|o| o.symbol()).collect();
        assert_eq!(symbols, vec!["VCP", "MISSING", "ONE"]);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].1,
            &AnalysisError::DataFetchFailure(DataError::SymbolNotFound {
                symbol: "MISSING".into()
            })
        );

        let ranked = report.ranked();
        assert_eq!(ranked[0].symbol, "VCP");
        assert_eq!(ranked[0].verdict, Verdict::StrongBuy);
        assert!(ranked[1].verdict <= Verdict::Watch);
        assert_eq!(report.benchmark.as_deref(), Some("SPY"));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let a = run_scan(&config(dir.path(), true)).unwrap();
        let b = run_scan(&config(dir.path(), false)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dataset_hash.len(), 64);
    }

    #[test]
    fn scanner_matches_single_symbol_analysis() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let market = CsvProvider::new(dir.path());
        let analyzer = Analyzer::new(vcpscan_core::EngineConfig::default()).unwrap();
        let single = analyzer
            .analyze_symbol(&market, None, "VCP", None, 400)
            .unwrap();

        let scanner = Scanner::new(analyzer, &market, 400).with_parallelism(false);
        let report = scanner.scan(&["VCP".to_string()], None);
        assert_eq!(report.decisions().next(), Some(&single));
    }

    #[test]
    fn missing_benchmark_fails_scan() {
        let dir = tempfile::tempdir().unwrap();
        write_bars_csv(&dir.path().join("VCP.csv"), &vcp_bars()).unwrap();
        let err = run_scan(&config(dir.path(), false)).unwrap_err();
        assert!(matches!(err, ScanError::Benchmark { ref symbol, .. } if symbol == "SPY"));
    }

    #[test]
    fn fundamentals_file_feeds_bonus() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let path = dir.path().join("fundamentals.json");
        std::fs::write(&path, r#"{"VCP": {"eps_growth_pct": 50.0, "roe_pct": 25.0}}"#).unwrap();

        let mut cfg = config(dir.path(), false);
        cfg.fundamentals_file = Some(path);
        let report = run_scan(&cfg).unwrap();
        let vcp = report.decisions().find(|d| d.symbol == "VCP").unwrap();
        assert_eq!(vcp.confidence.fundamentals_bonus, 5.0);
        let one = report.decisions().find(|d| d.symbol == "ONE").unwrap();
        assert_eq!(one.confidence.fundamentals_bonus, 0.0);
    }
}
