//! Multi-symbol run: analyze, select and simulate each symbol in turn.
//!
//! A symbol that cannot be evaluated is skipped with a reason; it never
//! aborts the others.

use crate::domain::backtest::simulate;
use crate::domain::bar_signal::generate_signals;
use crate::domain::config::StrategyConfig;
use crate::domain::diagnostics::{Diagnostics, Recovery};
use crate::domain::error::OptitraderError;
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::metrics::PerformanceRecord;
use crate::domain::option_chain::OptionChainSnapshot;
use crate::domain::price_bar::{PriceBar, PriceSeries};
use crate::domain::selector::StrategySelector;
use crate::domain::strategy::{StrategyKind, StrategySignal};
use crate::domain::technical::analyze;
use crate::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Everything the core needs for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolInput {
    pub symbol: String,
    pub series: PriceSeries,
    pub chain: Option<OptionChainSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoPriceData,
    NoOptionData,
    NoSignal,
    /// The selector could not build any structure from the chain.
    NoStrategy,
    /// DEFAULT signal: reported, not simulated.
    UntradableStrategy,
    /// Iron condor missing a protective leg.
    IncompleteStrategy,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoPriceData => "no price data",
            SkipReason::NoOptionData => "no option data",
            SkipReason::NoSignal => "no usable signal",
            SkipReason::NoStrategy => "no strategy available",
            SkipReason::UntradableStrategy => "untradable strategy",
            SkipReason::IncompleteStrategy => "incomplete strategy",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct UniverseReport {
    pub signals: Vec<StrategySignal>,
    pub records: BTreeMap<String, PerformanceRecord>,
    pub skipped: Vec<SkippedSymbol>,
    pub diagnostics: Diagnostics,
}

impl UniverseReport {
    pub fn skip_reason(&self, symbol: &str) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|s| s.symbol == symbol)
            .map(|s| s.reason)
    }
}

/// Fills derived columns the table did not carry.
pub fn prepare_bars(series: PriceSeries, config: &StrategyConfig) -> Vec<PriceBar> {
    let mut bars = series.bars;
    if !series.has_indicators {
        compute_indicators(&mut bars, &config.technical);
    }
    if !series.has_signals {
        generate_signals(&mut bars, &config.technical);
    }
    bars
}

/// Signal for one symbol, without simulating it.
pub fn select_signal(
    input: &SymbolInput,
    bars: &[PriceBar],
    config: &StrategyConfig,
    diag: &mut Diagnostics,
) -> Result<StrategySignal, SkipReason> {
    if bars.is_empty() {
        return Err(SkipReason::NoPriceData);
    }
    let chain = match &input.chain {
        Some(chain) if !chain.is_empty() => chain,
        _ => return Err(SkipReason::NoOptionData),
    };
    let reading =
        analyze(bars, &config.technical, &config.signals, diag).ok_or(SkipReason::NoSignal)?;
    StrategySelector::new(config)
        .select(reading.bias, chain, diag)
        .ok_or(SkipReason::NoStrategy)
}

pub fn run_universe(inputs: Vec<SymbolInput>, config: &StrategyConfig) -> UniverseReport {
    let mut report = UniverseReport::default();

    for input in inputs {
        let mut diag = Diagnostics::new();
        let symbol = input.symbol.clone();
        let bars = prepare_bars(input.series.clone(), config);

        let outcome = select_signal(&input, &bars, config, &mut diag).and_then(|signal| {
            let skip = match signal.kind() {
                StrategyKind::Default => Some(SkipReason::UntradableStrategy),
                StrategyKind::IronCondor if !signal.legs.is_complete() => {
                    Some(SkipReason::IncompleteStrategy)
                }
                _ => None,
            };
            report.signals.push(signal.clone());
            match skip {
                Some(reason) => Err(reason),
                None => simulate(&signal, &bars, config, &mut diag).ok_or(SkipReason::NoPriceData),
            }
        });

        match outcome {
            Ok(record) => {
                report.records.insert(symbol, record);
            }
            Err(reason) => {
                if reason == SkipReason::IncompleteStrategy {
                    diag.record(Recovery::IncompleteStrategy, &symbol);
                }
                warn!(symbol = %symbol, reason = %reason, "skipping symbol");
                report.skipped.push(SkippedSymbol { symbol, reason });
            }
        }
        report.diagnostics.merge(&diag);
    }

    info!(
        simulated = report.records.len(),
        skipped = report.skipped.len(),
        recoveries = report.diagnostics.total(),
        "universe run complete"
    );
    report
}

/// Loads inputs through a data port. Per-symbol load failures become empty
/// inputs so the run can record them as skips.
pub fn load_inputs(data_port: &dyn DataPort, symbols: &[String]) -> Vec<SymbolInput> {
    symbols
        .iter()
        .map(|symbol| {
            let series = match data_port.fetch_price_bars(symbol) {
                Ok(series) => series,
                Err(e) => {
                    log_load_failure(symbol, "price bars", &e);
                    PriceSeries::default()
                }
            };
            let chain = match series.bars.last() {
                Some(last) => match data_port.fetch_option_chain(symbol, last.close) {
                    Ok(chain) => Some(chain),
                    Err(e) => {
                        log_load_failure(symbol, "option chain", &e);
                        None
                    }
                },
                None => None,
            };
            SymbolInput {
                symbol: symbol.clone(),
                series,
                chain,
            }
        })
        .collect()
}

fn log_load_failure(symbol: &str, what: &str, err: &OptitraderError) {
    match err {
        OptitraderError::NoData { .. } => info!(symbol = %symbol, "no {what}"),
        _ => warn!(symbol = %symbol, error = %err, "failed to load {what}"),
    }
}
