//! Day-by-day replay of a strategy signal over a price series.
//!
//! Bar 0 is always flat. On each later bar a flat book enters when the
//! prior bar's signal matches the structure's entry trigger; an open book
//! is marked, then checked for exit in priority order. Entry and exit never
//! happen on the same bar.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::config::StrategyConfig;
use super::diagnostics::{Diagnostics, Recovery};
use super::metrics::PerformanceRecord;
use super::portfolio::Portfolio;
use super::position::{ExitReason, ExitRules, OpenPosition, PositionStatus, entry_trigger};
use super::price_bar::{BarSignal, PriceBar};
use super::strategy::StrategySignal;

/// One row of the simulated trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub signal: BarSignal,
    pub status: PositionStatus,
    pub contracts: u32,
    pub cash: f64,
    pub holdings: f64,
    pub portfolio_value: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub days_held: i64,
    pub exit_reason: Option<ExitReason>,
}

struct Book {
    position: OpenPosition,
    entry_commission: f64,
}

/// Replays `signal` over `bars`. `None` when there is nothing to simulate:
/// an empty series or a DEFAULT signal. A structure that cannot be entered
/// (iron condor missing a protective leg) produces a flat run.
pub fn simulate(
    signal: &StrategySignal,
    bars: &[PriceBar],
    config: &StrategyConfig,
    diag: &mut Diagnostics,
) -> Option<PerformanceRecord> {
    let kind = signal.kind();
    let trigger = entry_trigger(kind)?;
    if bars.is_empty() {
        return None;
    }

    let rules = ExitRules::from(&config.options);
    let commission = config.backtest.commission_per_contract;
    let tradable = signal.legs.is_complete();
    if !tradable {
        diag.record(Recovery::IncompleteStrategy, &signal.symbol);
    }

    let mut portfolio = Portfolio::new(config.backtest.initial_capital);
    let mut book: Option<Book> = None;
    let mut trajectory = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let prior = if i == 0 { None } else { Some(bars[i - 1].signal) };
        let mut exit_reason = None;
        let mut days_held = 0;

        match (book.take(), prior) {
            (Some(open), Some(prior_signal)) => {
                let pos = &open.position;
                days_held = pos.days_held(bar.date);
                let valuation = pos.valuation(bar.close, days_held, &rules);
                portfolio.mark(pos.holdings(&valuation));

                match pos.check_exit(&valuation, days_held, prior_signal, &rules) {
                    Some(reason) => {
                        let trade = portfolio.close(
                            pos,
                            bar.date,
                            reason,
                            open.entry_commission,
                            commission,
                        );
                        info!(
                            symbol = %signal.symbol,
                            kind = %kind,
                            date = %bar.date,
                            reason = %reason,
                            days_held,
                            pnl = trade.pnl(),
                            "exit"
                        );
                        exit_reason = Some(reason);
                    }
                    None => book = Some(open),
                }
            }
            (None, Some(prior_signal)) if tradable && prior_signal == trigger => {
                if let Some(position) =
                    OpenPosition::open(&signal.legs, signal.contracts, bar.date, &rules)
                {
                    let entry_commission = portfolio.open(&position, commission);
                    info!(
                        symbol = %signal.symbol,
                        kind = %kind,
                        date = %bar.date,
                        contracts = position.contracts,
                        premium = position.entry_premium,
                        "entry"
                    );
                    book = Some(Book {
                        position,
                        entry_commission,
                    });
                }
            }
            (open, _) => book = open,
        }

        let open = book.as_ref().map(|b| &b.position);
        trajectory.push(DailyRecord {
            date: bar.date,
            close: bar.close,
            signal: bar.signal,
            status: if open.is_some() {
                PositionStatus::Open
            } else {
                PositionStatus::Flat
            },
            contracts: open.map_or(0, |p| p.contracts),
            cash: portfolio.cash,
            holdings: portfolio.holdings,
            portfolio_value: portfolio.value(),
            stop_loss: open.and_then(|p| p.stop_loss_price),
            take_profit: open.and_then(|p| p.take_profit_price),
            days_held,
            exit_reason,
        });
        portfolio.record_equity(bar.date);
    }

    if book.is_some() {
        debug!(symbol = %signal.symbol, "position still open at end of series");
    }

    let record = PerformanceRecord::compute(
        &signal.symbol,
        kind,
        portfolio,
        trajectory,
        diag,
    );
    info!(
        symbol = %record.symbol,
        kind = %kind,
        total_return_pct = record.total_return_pct,
        max_drawdown_pct = record.max_drawdown_pct,
        exits = ?record.exit_reason_counts,
        "backtest complete"
    );
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::option_chain::OptionContract;
    use crate::domain::strategy::StrategyLegs;
    use crate::domain::technical::MarketBias;

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn bars(closes: &[f64], signals: &[i64]) -> Vec<PriceBar> {
        closes
            .iter()
            .zip(signals)
            .enumerate()
            .map(|(i, (&c, &s))| {
                let mut bar = PriceBar::new(date(i as i64), c, c, c, c, 1_000);
                bar.signal = BarSignal::from_int(s);
                bar
            })
            .collect()
    }

    fn signal(legs: StrategyLegs, contracts: u32) -> StrategySignal {
        StrategySignal {
            symbol: "SPY".into(),
            bias: legs.kind().bias(),
            expiry: date(60),
            current_price: 100.0,
            contracts,
            greek_optimized: false,
            implied_volatility: None,
            legs,
        }
    }

    fn long_call(premium: f64, contracts: u32) -> StrategySignal {
        signal(
            StrategyLegs::LongCall {
                option: OptionContract::bare(100.0, date(60), premium),
            },
            contracts,
        )
    }

    #[test]
    fn empty_bars_simulate_nothing() {
        let mut diag = Diagnostics::new();
        let cfg = StrategyConfig::default();
        assert!(simulate(&long_call(2.5, 1), &[], &cfg, &mut diag).is_none());
    }

    #[test]
    fn default_signal_is_not_simulated() {
        let mut diag = Diagnostics::new();
        let cfg = StrategyConfig::default();
        let s = signal(
            StrategyLegs::Default {
                call: None,
                put: None,
            },
            1,
        );
        assert_eq!(s.bias, MarketBias::Neutral);
        let b = bars(&[100.0, 100.0], &[1, 0]);
        assert!(simulate(&s, &b, &cfg, &mut diag).is_none());
    }

    #[test]
    fn first_bar_is_flat_and_entry_follows_prior_signal() {
        let mut diag = Diagnostics::new();
        let cfg = StrategyConfig::default();
        let b = bars(&[100.0, 100.0, 100.0], &[1, 0, 0]);
        let r = simulate(&long_call(2.5, 4), &b, &cfg, &mut diag).unwrap();
        assert_eq!(r.trajectory[0].status, PositionStatus::Flat);
        assert_eq!(r.trajectory[1].status, PositionStatus::Open);
        assert_eq!(r.trajectory[1].contracts, 4);
        assert_eq!(r.trajectory[1].stop_loss, Some(1.25));
        assert!((r.trajectory[1].holdings - 1000.0).abs() < 1e-9);
        assert!((r.trajectory[1].cash - 99_000.0).abs() < 1e-9);
    }

    #[test]
    fn stop_loss_after_decay() {
        let mut diag = Diagnostics::new();
        let cfg = StrategyConfig::default();
        // Price stays below strike; value decays 10% a day floored at 50%.
        let closes = vec![95.0; 10];
        let mut signals = vec![0; 10];
        signals[0] = 1;
        let b = bars(&closes, &signals);
        let r = simulate(&long_call(2.5, 1), &b, &cfg, &mut diag).unwrap();
        // Entered on bar 1; five days later value is 1.25.
        assert_eq!(r.trajectory[6].exit_reason, Some(ExitReason::StopLoss));
        assert_eq!(r.trajectory[6].days_held, 5);
        assert_eq!(r.trajectory[6].status, PositionStatus::Flat);
        assert_eq!(r.exit_count(ExitReason::StopLoss), 1);
        assert!((r.final_portfolio_value - (100_000.0 - 125.0)).abs() < 1e-9);
    }

    #[test]
    fn max_days_exit_realises_valuation() {
        let mut diag = Diagnostics::new();
        let mut cfg = StrategyConfig::default();
        cfg.options.max_days_to_hold = 3;
        let closes = vec![100.0, 100.0, 101.0, 101.0, 101.5, 101.0];
        let b = bars(&closes, &[1, 0, 0, 0, 0, 0]);
        let r = simulate(&long_call(2.0, 1), &b, &cfg, &mut diag).unwrap();
        let exit = &r.trajectory[4];
        assert_eq!(exit.exit_reason, Some(ExitReason::MaxDays));
        // max(1.5 intrinsic, 2.0 * 0.7)
        assert!((r.trades[0].exit_holdings - 150.0).abs() < 1e-9);
        assert!((exit.cash - (100_000.0 - 200.0 + 150.0)).abs() < 1e-9);
    }

    #[test]
    fn no_same_bar_reentry_after_exit() {
        let mut diag = Diagnostics::new();
        let mut cfg = StrategyConfig::default();
        cfg.options.max_days_to_hold = 1;
        let b = bars(&[100.0; 5], &[1, 1, 1, 1, 1]);
        let r = simulate(&long_call(2.0, 1), &b, &cfg, &mut diag).unwrap();
        let statuses: Vec<_> = r.trajectory.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                PositionStatus::Flat,
                PositionStatus::Open,
                PositionStatus::Flat,
                PositionStatus::Open,
                PositionStatus::Flat,
            ]
        );
        assert_eq!(r.exit_count(ExitReason::MaxDays), 2);
    }

    #[test]
    fn cash_plus_holdings_every_bar() {
        let mut diag = Diagnostics::new();
        let mut cfg = StrategyConfig::default();
        cfg.backtest.commission_per_contract = 0.65;
        let closes = vec![100.0, 102.0, 104.0, 99.0, 97.0, 103.0, 108.0, 101.0];
        let b = bars(&closes, &[1, 0, -1, 1, 0, 0, -1, 0]);
        let r = simulate(&long_call(2.0, 3), &b, &cfg, &mut diag).unwrap();
        for day in &r.trajectory {
            assert_eq!(day.cash + day.holdings, day.portfolio_value);
        }
    }

    #[test]
    fn bear_call_spread_enters_on_sell_and_takes_profit() {
        let mut diag = Diagnostics::new();
        let cfg = StrategyConfig::default();
        let s = signal(
            StrategyLegs::BearCallSpread {
                short_call: OptionContract::bare(100.0, date(60), 2.0),
                long_call: OptionContract::bare(105.0, date(60), 0.8),
            },
            26,
        );
        let n = 40;
        let closes = vec![100.0; n];
        let mut signals = vec![0; n];
        signals[0] = -1;
        let mut cfg = cfg;
        cfg.options.max_days_to_hold = 60;
        let r = simulate(&s, &bars(&closes, &signals), &cfg, &mut diag).unwrap();
        assert_eq!(r.trajectory[1].status, PositionStatus::Open);
        assert!((r.trajectory[1].portfolio_value - 100_000.0).abs() < 1e-9);
        // 21 days of a 30-day horizon reaches 70%.
        assert_eq!(r.trajectory[22].exit_reason, Some(ExitReason::TakeProfit));
        assert!((r.trades[0].pnl() - 26.0 * 1.2 * 100.0 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn incomplete_condor_never_enters() {
        let mut diag = Diagnostics::new();
        let cfg = StrategyConfig::default();
        let s = signal(
            StrategyLegs::IronCondor {
                short_call: OptionContract::bare(105.0, date(60), 1.5),
                long_call: None,
                short_put: OptionContract::bare(95.0, date(60), 1.5),
                long_put: None,
            },
            1,
        );
        let b = bars(&[100.0; 4], &[1, 1, 1, 1]);
        let r = simulate(&s, &b, &cfg, &mut diag).unwrap();
        assert!(r.trajectory.iter().all(|d| d.status == PositionStatus::Flat));
        assert!(r.trades.is_empty());
        assert_eq!(diag.count(Recovery::IncompleteStrategy), 1);
        assert_eq!(r.sharpe_ratio, 0.0);
    }

    #[test]
    fn reversal_closes_long_put() {
        let mut diag = Diagnostics::new();
        let cfg = StrategyConfig::default();
        let s = signal(
            StrategyLegs::LongPut {
                option: OptionContract::bare(100.0, date(60), 3.0),
            },
            1,
        );
        let b = bars(&[100.0, 100.0, 100.0, 100.0], &[-1, 0, 1, 0]);
        let r = simulate(&s, &b, &cfg, &mut diag).unwrap();
        assert_eq!(r.trajectory[3].exit_reason, Some(ExitReason::SignalReversal));
    }
}
