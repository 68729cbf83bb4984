//! CSV report adapter implementing ReportPort.
//!
//! Writes `summary.csv`, `signals.csv`, `diagnostics.csv` and one
//! `<SYMBOL>_trajectory.csv` per simulated symbol into an output directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::backtest::DailyRecord;
use crate::domain::diagnostics::Recovery;
use crate::domain::error::OptitraderError;
use crate::domain::position::ExitReason;
use crate::domain::strategy::StrategySignal;
use crate::domain::universe::UniverseReport;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn writer(&self, name: &str) -> Result<csv::Writer<fs::File>, OptitraderError> {
        let path = self.output_dir.join(name);
        csv::Writer::from_path(&path).map_err(|e| report_error(&path, e))
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> OptitraderError {
    OptitraderError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

fn write_summary(w: &mut csv::Writer<fs::File>, report: &UniverseReport) -> csv::Result<()> {
    let mut header = vec![
        "symbol".to_string(),
        "strategy".into(),
        "final_portfolio_value".into(),
        "total_return_pct".into(),
        "max_drawdown_pct".into(),
        "sharpe_ratio".into(),
        "trades".into(),
    ];
    header.extend(ExitReason::ALL.iter().map(|r| r.to_string()));
    w.write_record(&header)?;

    for (symbol, record) in &report.records {
        let mut row = vec![
            symbol.clone(),
            record.strategy_kind.to_string(),
            format!("{:.2}", record.final_portfolio_value),
            format!("{:.4}", record.total_return_pct),
            format!("{:.4}", record.max_drawdown_pct),
            format!("{:.4}", record.sharpe_ratio),
            record.trades.len().to_string(),
        ];
        row.extend(ExitReason::ALL.iter().map(|r| record.exit_count(*r).to_string()));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

fn write_signals(w: &mut csv::Writer<fs::File>, signals: &[StrategySignal]) -> csv::Result<()> {
    w.write_record([
        "symbol",
        "strategy",
        "bias",
        "expiry",
        "current_price",
        "contracts",
        "greek_optimized",
        "implied_volatility",
        "legs",
        "max_loss",
        "max_profit",
        "breakevens",
    ])?;
    for signal in signals {
        let profile = signal.profit_profile();
        let breakevens = profile
            .as_ref()
            .map(|p| {
                p.breakevens
                    .iter()
                    .map(|b| format!("{b:.2}"))
                    .collect::<Vec<_>>()
                    .join(";")
            })
            .unwrap_or_default();
        w.write_record([
            signal.symbol.clone(),
            signal.kind().to_string(),
            signal.bias.to_string(),
            signal.expiry.to_string(),
            format!("{:.2}", signal.current_price),
            signal.contracts.to_string(),
            signal.greek_optimized.to_string(),
            opt(signal.implied_volatility),
            signal.legs.describe(),
            opt(profile.as_ref().map(|p| p.max_loss)),
            match &profile {
                Some(p) => p.max_profit.map_or_else(|| "unlimited".to_string(), |v| format!("{v:.4}")),
                None => String::new(),
            },
            breakevens,
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_trajectory(w: &mut csv::Writer<fs::File>, trajectory: &[DailyRecord]) -> csv::Result<()> {
    w.write_record([
        "date",
        "close",
        "signal",
        "status",
        "contracts",
        "cash",
        "holdings",
        "portfolio_value",
        "stop_loss",
        "take_profit",
        "days_held",
        "exit_reason",
    ])?;
    for day in trajectory {
        w.write_record([
            day.date.to_string(),
            format!("{:.4}", day.close),
            day.signal.as_int().to_string(),
            day.status.as_str().to_string(),
            day.contracts.to_string(),
            format!("{:.2}", day.cash),
            format!("{:.2}", day.holdings),
            format!("{:.2}", day.portfolio_value),
            opt(day.stop_loss),
            opt(day.take_profit),
            day.days_held.to_string(),
            day.exit_reason.map(|r| r.to_string()).unwrap_or_default(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_diagnostics(w: &mut csv::Writer<fs::File>, report: &UniverseReport) -> csv::Result<()> {
    w.write_record(["kind", "name", "count"])?;
    for recovery in Recovery::ALL {
        let count = report.diagnostics.count(recovery).to_string();
        w.write_record(["recovery", recovery.as_str(), count.as_str()])?;
    }
    for skipped in &report.skipped {
        w.write_record(["skipped", skipped.symbol.as_str(), skipped.reason.as_str()])?;
    }
    w.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &UniverseReport) -> Result<(), OptitraderError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| report_error(&self.output_dir, e))?;

        let mut w = self.writer("summary.csv")?;
        write_summary(&mut w, report)
            .map_err(|e| report_error(&self.output_dir.join("summary.csv"), e))?;

        let mut w = self.writer("signals.csv")?;
        write_signals(&mut w, &report.signals)
            .map_err(|e| report_error(&self.output_dir.join("signals.csv"), e))?;

        let mut w = self.writer("diagnostics.csv")?;
        write_diagnostics(&mut w, report)
            .map_err(|e| report_error(&self.output_dir.join("diagnostics.csv"), e))?;

        for (symbol, record) in &report.records {
            let name = format!("{symbol}_trajectory.csv");
            let mut w = self.writer(&name)?;
            write_trajectory(&mut w, &record.trajectory)
                .map_err(|e| report_error(&self.output_dir.join(&name), e))?;
        }
        Ok(())
    }
}
