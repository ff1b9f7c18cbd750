//! Export of scan and replay results.
//!
//! - **JSON**: the full [`ScanReport`], every Decision with its breakdown
//! - **CSV**: one summary row per symbol, and a transition tape for replays
//!
//! Persisted reports carry a `schema_version`; newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use vcpscan_core::exit::Transition;

use crate::scan::{ScanOutcome, ScanReport};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub schema_version: u32,
    pub report: ScanReport,
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &ScanReport) -> Result<String> {
    let envelope = ReportEnvelope {
        schema_version: SCHEMA_VERSION,
        report: report.clone(),
    };
    serde_json::to_string_pretty(&envelope).context("failed to serialize ScanReport to JSON")
}

pub fn import_json(json: &str) -> Result<ScanReport> {
    let envelope: ReportEnvelope = serde_json::from_str(json).context("failed to deserialize ScanReport from JSON")?;
    if envelope.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            envelope.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(envelope.report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// One row per symbol in report order.
///
/// Columns: symbol, as_of, verdict, confidence, trend_passed, base_valid,
/// breakout_confirmed, pivot, entry, stop, shares, reward_risk, risk_status,
/// error
pub fn export_summary_csv(report: &ScanReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "as_of",
        "verdict",
        "confidence",
        "trend_passed",
        "base_valid",
        "breakout_confirmed",
        "pivot",
        "entry",
        "stop",
        "shares",
        "reward_risk",
        "risk_status",
        "error",
    ])?;

    for outcome in &report.outcomes {
        match outcome {
            ScanOutcome::Analyzed { decision: d } => {
                let plan = d.risk.plan();
                let opt = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_default();
                wtr.write_record([
                    d.symbol.clone(),
                    d.as_of.to_string(),
                    d.verdict.to_string(),
                    format!("{:.1}", d.confidence_score),
                    d.trend.pass_count.to_string(),
                    d.base.is_valid().to_string(),
                    d.breakout.is_confirmed().to_string(),
                    opt(d.base.base.as_ref().map(|b| b.pivot_price)),
                    opt(plan.map(|p| p.entry_price)),
                    opt(plan.map(|p| p.stop_loss_price)),
                    plan.map(|p| p.position_size.to_string()).unwrap_or_default(),
                    opt(plan.map(|p| p.reward_risk_ratio)),
                    plan.map(|p| format!("{:?}", p.status).to_lowercase()).unwrap_or_default(),
                    String::new(),
                ])?;
            }
            ScanOutcome::Failed { symbol, error } => {
                let mut row = vec![String::new(); 14];
                row[0] = symbol.clone();
                row[13] = error.to_string();
                wtr.write_record(&row)?;
            }
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: date, from, to, reason, shares_sold, stop
pub fn export_transitions_csv(transitions: &[Transition]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "from", "to", "reason", "shares_sold", "stop"])?;
    for t in transitions {
        wtr.write_record([
            t.date.to_string(),
            format!("{:?}", t.from),
            format!("{:?}", t.to),
            t.reason.map(|r| format!("{r:?}")).unwrap_or_default(),
            t.shares_sold.to_string(),
            format!("{:.4}", t.stop_loss_price),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `report.json` and `summary.csv` under `output_dir`, creating it if
/// needed. Returns the written paths.
pub fn save_report(report: &ScanReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let json_path = output_dir.join("report.json");
    std::fs::write(&json_path, export_json(report)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let csv_path = output_dir.join("summary.csv");
    std::fs::write(&csv_path, export_summary_csv(report)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    Ok(vec![json_path, csv_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Scanner;
    use crate::testutil::{benchmark_bars, vcp_bars};
    use vcpscan_core::data::{DataError, MarketDataProvider};
    use vcpscan_core::domain::Series;
    use vcpscan_core::{Analyzer, EngineConfig};

    struct Fixture;

    impl MarketDataProvider for Fixture {
        fn name(&self) -> &str {
            "fixture"
        }

        fn fetch(&self, symbol: &str, _lookback_days: usize) -> Result<Series, DataError> {
            match symbol {
                "VCP" => Ok(Series::new("VCP", vcp_bars()).unwrap()),
                "SPY" => Ok(Series::new("SPY", benchmark_bars(300)).unwrap()),
                _ => Err(DataError::RateLimited { retry_after_secs: 60 }),
            }
        }
    }

    fn report() -> ScanReport {
        let scanner = Scanner::new(Analyzer::new(EngineConfig::default()).unwrap(), &Fixture, 400);
        let bench = scanner.load_benchmark("SPY").unwrap();
        scanner.scan(&["VCP".to_string(), "LATE".to_string()], Some(&bench))
    }

    #[test]
    fn json_round_trip() {
        let report = report();
        let json = export_json(&report).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        let back = import_json(&json).unwrap();
        assert_eq!(back.config_hash, report.config_hash);
        assert_eq!(back.dataset_hash, report.dataset_hash);
        let symbols: Vec<&str> = back.outcomes.iter().map(|o| o.symbol()).collect();
        assert_eq!(symbols, vec!["VCP", "LATE"]);
        assert_eq!(back.decisions().next().map(|d| d.verdict), Some(vcpscan_core::Verdict::StrongBuy));
    }

    #[test]
    fn future_schema_is_rejected() {
        let json = export_json(&report()).unwrap().replacen("\"schema_version\": 1", "\"schema_version\": 99", 1);
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version 99"));
    }

    #[test]
    fn summary_has_row_per_symbol() {
        let csv = export_summary_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("VCP,2023-10-28,strong_buy,100.0,10,true,true,95.50,96.45,89.70,148,2.86,acceptable,"));
        assert!(lines[2].starts_with("LATE,"));
        assert!(lines[2].contains("rate limited"));
    }

    #[test]
    fn save_report_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("run");
        let paths = save_report(&report(), &out).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));
    }
}
