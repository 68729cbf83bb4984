//! Per-symbol performance summary computed once at the end of a simulation.

use std::collections::BTreeMap;

use super::backtest::DailyRecord;
use super::diagnostics::{Diagnostics, Recovery};
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{ClosedTrade, ExitReason};
use super::strategy::StrategyKind;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const ZERO_VARIANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub symbol: String,
    pub strategy_kind: StrategyKind,
    pub initial_capital: f64,
    pub final_portfolio_value: f64,
    pub total_return_pct: f64,
    /// Largest peak-to-trough fall, as a non-positive percentage.
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub exit_reason_counts: BTreeMap<ExitReason, usize>,
    pub trades: Vec<ClosedTrade>,
    pub trajectory: Vec<DailyRecord>,
}

impl PerformanceRecord {
    /// Summarises a finished run. Return, drawdown and Sharpe come from the
    /// portfolio's equity curve, one point per simulated bar.
    pub fn compute(
        symbol: &str,
        strategy_kind: StrategyKind,
        portfolio: Portfolio,
        trajectory: Vec<DailyRecord>,
        diag: &mut Diagnostics,
    ) -> Self {
        let Portfolio {
            initial_capital,
            closed_trades: trades,
            equity_curve,
            ..
        } = portfolio;

        let final_portfolio_value = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return_pct = if initial_capital > 0.0 {
            (final_portfolio_value / initial_capital - 1.0) * 100.0
        } else {
            0.0
        };

        let sharpe_ratio = match compute_sharpe(&equity_curve) {
            Some(sharpe) => sharpe,
            None => {
                diag.record(Recovery::ZeroVarianceReturns, symbol);
                0.0
            }
        };

        PerformanceRecord {
            symbol: symbol.to_string(),
            strategy_kind,
            initial_capital,
            final_portfolio_value,
            total_return_pct,
            max_drawdown_pct: compute_drawdown(&equity_curve) * 100.0,
            sharpe_ratio,
            exit_reason_counts: exit_histogram(&trajectory),
            trades,
            trajectory,
        }
    }

    pub fn exit_count(&self, reason: ExitReason) -> usize {
        self.exit_reason_counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        let won = self.trades.iter().filter(|t| t.pnl() > 0.0).count();
        won as f64 / self.trades.len() as f64
    }
}

/// `min(value / running_max - 1)`, never positive.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let dd = point.equity / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Bar-to-bar percentage change. A zero prior value contributes 0.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Annualised Sharpe with the sample standard deviation. `None` when the
/// returns have no measurable variance.
fn compute_sharpe(equity_curve: &[EquityPoint]) -> Option<f64> {
    let values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
    let returns = daily_returns(&values);
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if !stddev.is_finite() || stddev < ZERO_VARIANCE {
        return None;
    }
    Some(mean / stddev * TRADING_DAYS_PER_YEAR.sqrt())
}

pub fn exit_histogram(trajectory: &[DailyRecord]) -> BTreeMap<ExitReason, usize> {
    let mut counts = BTreeMap::new();
    for reason in trajectory.iter().filter_map(|r| r.exit_reason) {
        *counts.entry(reason).or_insert(0) += 1;
    }
    counts
}
