//! Cash and holdings bookkeeping for a single-symbol simulation.

use chrono::NaiveDate;

use super::position::{ClosedTrade, ExitReason, OpenPosition};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    /// Marked value of the open position; negative for an open credit.
    pub holdings: f64,
    pub initial_capital: f64,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            holdings: 0.0,
            initial_capital,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn value(&self) -> f64 {
        self.cash + self.holdings
    }

    /// Moves the entry premium between cash and holdings and charges
    /// commission. Returns the commission paid.
    pub fn open(&mut self, position: &OpenPosition, commission_per_contract: f64) -> f64 {
        let commission = commission_for(position, commission_per_contract);
        let entry = position.entry_holdings();
        self.cash -= entry + commission;
        self.holdings = entry;
        commission
    }

    pub fn mark(&mut self, holdings: f64) {
        self.holdings = holdings;
    }

    /// Realises the current holdings into cash and records the trade.
    pub fn close(
        &mut self,
        position: &OpenPosition,
        exit_date: NaiveDate,
        exit_reason: ExitReason,
        entry_commission: f64,
        commission_per_contract: f64,
    ) -> &ClosedTrade {
        let exit_commission = commission_for(position, commission_per_contract);
        let exit_holdings = self.holdings;
        self.cash += exit_holdings - exit_commission;
        self.holdings = 0.0;
        self.closed_trades.push(ClosedTrade {
            kind: position.kind(),
            contracts: position.contracts,
            entry_date: position.entry_date,
            exit_date,
            entry_holdings: position.entry_holdings(),
            exit_holdings,
            commission: entry_commission + exit_commission,
            exit_reason,
        });
        &self.closed_trades[self.closed_trades.len() - 1]
    }

    pub fn record_equity(&mut self, date: NaiveDate) {
        let equity = self.value();
        self.equity_curve.push(EquityPoint { date, equity });
    }
}

fn commission_for(position: &OpenPosition, per_contract: f64) -> f64 {
    per_contract * position.contracts as f64 * position.legs.leg_count() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::OptionsConfig;
    use crate::domain::option_chain::OptionContract;
    use crate::domain::position::ExitRules;
    use crate::domain::strategy::StrategyLegs;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn position(legs: StrategyLegs, contracts: u32) -> OpenPosition {
        let rules = ExitRules::from(&OptionsConfig::default());
        OpenPosition::open(&legs, contracts, date(1), &rules).unwrap()
    }

    fn long_call() -> OpenPosition {
        position(
            StrategyLegs::LongCall {
                option: OptionContract::bare(100.0, date(29), 2.5),
            },
            4,
        )
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100000.0);
        assert!((portfolio.cash - 100000.0).abs() < f64::EPSILON);
        assert_eq!(portfolio.holdings, 0.0);
        assert!(portfolio.closed_trades.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn debit_entry_preserves_value() {
        let mut portfolio = Portfolio::new(100000.0);
        let commission = portfolio.open(&long_call(), 0.0);
        assert_eq!(commission, 0.0);
        assert!((portfolio.cash - 99000.0).abs() < 1e-9);
        assert!((portfolio.holdings - 1000.0).abs() < 1e-9);
        assert!((portfolio.value() - 100000.0).abs() < 1e-9);
    }

    #[test]
    fn credit_entry_carries_negative_holdings() {
        let mut portfolio = Portfolio::new(100000.0);
        let pos = position(
            StrategyLegs::PutCreditSpread {
                short_put: OptionContract::bare(95.0, date(29), 2.0),
                long_put: OptionContract::bare(90.0, date(29), 0.8),
            },
            10,
        );
        portfolio.open(&pos, 0.0);
        assert!((portfolio.cash - 101200.0).abs() < 1e-9);
        assert!((portfolio.holdings + 1200.0).abs() < 1e-9);
        assert!((portfolio.value() - 100000.0).abs() < 1e-9);
    }

    #[test]
    fn commission_per_contract_per_leg() {
        let mut portfolio = Portfolio::new(100000.0);
        let pos = position(
            StrategyLegs::BearCallSpread {
                short_call: OptionContract::bare(105.0, date(29), 2.0),
                long_call: OptionContract::bare(110.0, date(29), 1.0),
            },
            3,
        );
        let commission = portfolio.open(&pos, 0.65);
        // 3 contracts x 2 legs
        assert!((commission - 3.9).abs() < 1e-9);
        assert!((portfolio.value() - (100000.0 - 3.9)).abs() < 1e-9);
    }

    #[test]
    fn close_realises_holdings() {
        let mut portfolio = Portfolio::new(100000.0);
        let pos = long_call();
        let entry_commission = portfolio.open(&pos, 1.0);
        portfolio.mark(1600.0);
        let trade = portfolio
            .close(&pos, date(6), ExitReason::TakeProfit, entry_commission, 1.0)
            .clone();
        assert_eq!(portfolio.holdings, 0.0);
        assert!((portfolio.cash - (100000.0 + 600.0 - 8.0)).abs() < 1e-9);
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert!((trade.pnl() - 592.0).abs() < 1e-9);
        assert_eq!(portfolio.closed_trades.len(), 1);
    }

    #[test]
    fn record_equity_uses_cash_plus_holdings() {
        let mut portfolio = Portfolio::new(50000.0);
        portfolio.open(&long_call(), 0.0);
        portfolio.mark(700.0);
        portfolio.record_equity(date(2));
        assert_eq!(portfolio.equity_curve.len(), 1);
        assert!((portfolio.equity_curve[0].equity - 49700.0).abs() < 1e-9);
    }
}
