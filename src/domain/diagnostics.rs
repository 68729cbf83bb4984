//! Recovery counters.
//!
//! The selection and simulation core never fails on missing data or
//! degenerate numbers. Each fallback it takes is recorded here and logged,
//! so a run can report how often it had to recover.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Recovery {
    /// Liquidity filter emptied the candidate set; scored the unfiltered set.
    LiquidityFallback,
    /// Greek optimisation enabled but the chain carries no Greeks.
    GreeksUnavailable,
    /// Greek scorer found no structure; used the rule path.
    GreekScorerEmpty,
    /// Configured strategy name not recognised; emitted DEFAULT.
    UnknownStrategyName,
    /// `default_strategy` override not recognised; treated as `auto`.
    UnknownOverride,
    /// ATM contracts carry no implied volatility; treated as low IV.
    MissingImpliedVolatility,
    /// Sizing floored to one contract, above the risk budget.
    MinimumViableSize,
    /// Sizing reference price was zero, negative or not finite.
    DegenerateSizing,
    /// Iron condor missing a protective leg; entry skipped.
    IncompleteStrategy,
    /// Analyzer component lacked an indicator column; scored as 0.
    MissingIndicator,
    /// Returns had zero variance; Sharpe reported as 0.
    ZeroVarianceReturns,
}

impl Recovery {
    pub const ALL: [Recovery; 11] = [
        Recovery::LiquidityFallback,
        Recovery::GreeksUnavailable,
        Recovery::GreekScorerEmpty,
        Recovery::UnknownStrategyName,
        Recovery::UnknownOverride,
        Recovery::MissingImpliedVolatility,
        Recovery::MinimumViableSize,
        Recovery::DegenerateSizing,
        Recovery::IncompleteStrategy,
        Recovery::MissingIndicator,
        Recovery::ZeroVarianceReturns,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Recovery::LiquidityFallback => "liquidity_fallback",
            Recovery::GreeksUnavailable => "greeks_unavailable",
            Recovery::GreekScorerEmpty => "greek_scorer_empty",
            Recovery::UnknownStrategyName => "unknown_strategy_name",
            Recovery::UnknownOverride => "unknown_override",
            Recovery::MissingImpliedVolatility => "missing_implied_volatility",
            Recovery::MinimumViableSize => "minimum_viable_size",
            Recovery::DegenerateSizing => "degenerate_sizing",
            Recovery::IncompleteStrategy => "incomplete_strategy",
            Recovery::MissingIndicator => "missing_indicator",
            Recovery::ZeroVarianceReturns => "zero_variance_returns",
        }
    }
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    counts: BTreeMap<Recovery, usize>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, recovery: Recovery, detail: &str) {
        tracing::debug!(recovery = %recovery, detail, "recovered");
        *self.counts.entry(recovery).or_insert(0) += 1;
    }

    pub fn count(&self, recovery: Recovery) -> usize {
        self.counts.get(&recovery).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn merge(&mut self, other: &Diagnostics) {
        for (recovery, n) in &other.counts {
            *self.counts.entry(*recovery).or_insert(0) += n;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Recovery, usize)> + '_ {
        self.counts.iter().map(|(r, n)| (*r, *n))
    }
}
