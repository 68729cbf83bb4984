//! Open option positions: valuation and exit conditions.
//!
//! Debit structures (long call/put, straddle) are valued per share as
//! `max(intrinsic, premium * (1 - min(0.1 * days, 0.5)))` per leg. Credit
//! structures decay linearly toward full profit over the credit horizon and
//! carry the buy-back cost as a negative holding.

use crate::domain::config::OptionsConfig;
use crate::domain::option_chain::{OptionContract, OptionSide};
use crate::domain::price_bar::BarSignal;
use crate::domain::strategy::{CONTRACT_MULTIPLIER, StrategyKind, StrategyLegs};
use crate::domain::technical::MarketBias;
use chrono::NaiveDate;
use std::fmt;

const DAILY_DECAY: f64 = 0.1;
const MAX_DECAY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionStatus {
    Flat,
    Open,
}

impl PositionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionStatus::Flat => "FLAT",
            PositionStatus::Open => "OPEN",
        }
    }
}

/// Exit reasons in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    MaxDays,
    SignalReversal,
}

impl ExitReason {
    pub const ALL: [ExitReason; 4] = [
        ExitReason::StopLoss,
        ExitReason::TakeProfit,
        ExitReason::MaxDays,
        ExitReason::SignalReversal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::TakeProfit => "Take Profit",
            ExitReason::MaxDays => "Max Days",
            ExitReason::SignalReversal => "Signal Reversal",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit thresholds taken from `[options]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRules {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_days_to_hold: i64,
    pub spread_take_profit: f64,
    pub condor_take_profit: f64,
    pub credit_horizon_days: i64,
}

impl From<&OptionsConfig> for ExitRules {
    fn from(options: &OptionsConfig) -> Self {
        ExitRules {
            stop_loss_pct: options.stop_loss_pct,
            take_profit_pct: options.take_profit_pct,
            max_days_to_hold: options.max_days_to_hold,
            spread_take_profit: options.spread_take_profit,
            condor_take_profit: options.condor_take_profit,
            credit_horizon_days: options.credit_horizon_days,
        }
    }
}

/// Prior-bar signal that opens a position of this kind. `None` for DEFAULT.
pub fn entry_trigger(kind: StrategyKind) -> Option<BarSignal> {
    match kind {
        StrategyKind::Default => None,
        k => match k.bias() {
            MarketBias::Bearish => Some(BarSignal::Sell),
            MarketBias::Bullish | MarketBias::Neutral => Some(BarSignal::Buy),
        },
    }
}

/// Prior-bar signal that closes a position of this kind. Neutral
/// structures never exit on reversal.
pub fn reversal_trigger(kind: StrategyKind) -> Option<BarSignal> {
    match kind.bias() {
        MarketBias::Bullish => Some(BarSignal::Sell),
        MarketBias::Bearish => Some(BarSignal::Buy),
        MarketBias::Neutral => None,
    }
}

/// Per-share value of one long leg after `days_held` days.
pub fn single_leg_value(option: &OptionContract, side: OptionSide, spot: f64, days_held: i64) -> f64 {
    let time_decay = (DAILY_DECAY * days_held.max(0) as f64).min(MAX_DECAY);
    let intrinsic = match side {
        OptionSide::Call => (spot - option.strike).max(0.0),
        OptionSide::Put => (option.strike - spot).max(0.0),
    };
    intrinsic.max(option.last_price * (1.0 - time_decay))
}

/// Share of the received credit already earned: `min(days / horizon, 1)`.
pub fn credit_profit_fraction(days_held: i64, horizon_days: i64) -> f64 {
    if horizon_days <= 0 {
        return 1.0;
    }
    1.0 - (1.0 - days_held.max(0) as f64 / horizon_days as f64).max(0.0)
}

/// Mark of an open position on one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Valuation {
    /// Current per-share value of a debit structure.
    Debit { value: f64 },
    /// Earned share of the credit.
    Credit { profit_fraction: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub legs: StrategyLegs,
    pub contracts: u32,
    pub entry_date: NaiveDate,
    /// Debit paid or credit received per share.
    pub entry_premium: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
}

impl OpenPosition {
    /// `None` for structures that cannot be entered (DEFAULT, a condor
    /// missing a protective leg).
    pub fn open(
        legs: &StrategyLegs,
        contracts: u32,
        entry_date: NaiveDate,
        rules: &ExitRules,
    ) -> Option<Self> {
        if !legs.is_complete() {
            return None;
        }
        let (entry_premium, stop_loss_price, take_profit_price) = match legs.debit() {
            Some(premium) => (
                premium,
                Some(premium * (1.0 - rules.stop_loss_pct)),
                Some(premium * (1.0 + rules.take_profit_pct)),
            ),
            None => (legs.credit()?, None, None),
        };
        Some(OpenPosition {
            legs: legs.clone(),
            contracts,
            entry_date,
            entry_premium,
            stop_loss_price,
            take_profit_price,
        })
    }

    pub fn kind(&self) -> StrategyKind {
        self.legs.kind()
    }

    pub fn days_held(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }

    /// Holdings on the entry bar: cost for debits, the open liability for
    /// credits. Cash moves by the negation.
    pub fn entry_holdings(&self) -> f64 {
        let notional = self.contracts as f64 * self.entry_premium * CONTRACT_MULTIPLIER;
        if self.kind().is_credit() { -notional } else { notional }
    }

    pub fn valuation(&self, spot: f64, days_held: i64, rules: &ExitRules) -> Valuation {
        match &self.legs {
            StrategyLegs::LongCall { option } => Valuation::Debit {
                value: single_leg_value(option, OptionSide::Call, spot, days_held),
            },
            StrategyLegs::LongPut { option } => Valuation::Debit {
                value: single_leg_value(option, OptionSide::Put, spot, days_held),
            },
            StrategyLegs::LongStraddle { call, put } => Valuation::Debit {
                value: single_leg_value(call, OptionSide::Call, spot, days_held)
                    + single_leg_value(put, OptionSide::Put, spot, days_held),
            },
            _ => Valuation::Credit {
                profit_fraction: credit_profit_fraction(days_held, rules.credit_horizon_days),
            },
        }
    }

    /// Mark-to-model holdings for a valuation.
    pub fn holdings(&self, valuation: &Valuation) -> f64 {
        let per_share = match *valuation {
            Valuation::Debit { value } => value,
            Valuation::Credit { profit_fraction } => {
                -self.entry_premium * (1.0 - profit_fraction)
            }
        };
        self.contracts as f64 * per_share * CONTRACT_MULTIPLIER
    }

    /// First matching exit in priority order: stop loss, take profit,
    /// max days, signal reversal.
    pub fn check_exit(
        &self,
        valuation: &Valuation,
        days_held: i64,
        prior_signal: BarSignal,
        rules: &ExitRules,
    ) -> Option<ExitReason> {
        match *valuation {
            Valuation::Debit { value } => {
                if self.stop_loss_price.is_some_and(|stop| value <= stop) {
                    return Some(ExitReason::StopLoss);
                }
                if self.take_profit_price.is_some_and(|target| value >= target) {
                    return Some(ExitReason::TakeProfit);
                }
            }
            Valuation::Credit { profit_fraction } => {
                let target = match self.kind() {
                    StrategyKind::IronCondor => rules.condor_take_profit,
                    _ => rules.spread_take_profit,
                };
                if profit_fraction >= target {
                    return Some(ExitReason::TakeProfit);
                }
            }
        }

        if days_held >= rules.max_days_to_hold {
            return Some(ExitReason::MaxDays);
        }

        if reversal_trigger(self.kind()) == Some(prior_signal) {
            return Some(ExitReason::SignalReversal);
        }
        None
    }
}

/// One completed open-to-flat round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub kind: StrategyKind,
    pub contracts: u32,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_holdings: f64,
    pub exit_holdings: f64,
    pub commission: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn pnl(&self) -> f64 {
        self.exit_holdings - self.entry_holdings - self.commission
    }
}
