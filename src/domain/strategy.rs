//! Strategy signals: one concrete options structure per symbol per cycle.

use crate::domain::option_chain::{OptionContract, OptionSide};
use crate::domain::technical::MarketBias;
use chrono::NaiveDate;
use std::fmt;

/// Contract multiplier for equity options.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrategyKind {
    LongCall,
    LongPut,
    BullPutSpread,
    BearCallSpread,
    IronCondor,
    LongStraddle,
    CallCreditSpread,
    PutCreditSpread,
    Default,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::LongCall => "LONG_CALL",
            StrategyKind::LongPut => "LONG_PUT",
            StrategyKind::BullPutSpread => "BULL_PUT_SPREAD",
            StrategyKind::BearCallSpread => "BEAR_CALL_SPREAD",
            StrategyKind::IronCondor => "IRON_CONDOR",
            StrategyKind::LongStraddle => "LONG_STRADDLE",
            StrategyKind::CallCreditSpread => "CALL_CREDIT_SPREAD",
            StrategyKind::PutCreditSpread => "PUT_CREDIT_SPREAD",
            StrategyKind::Default => "DEFAULT",
        }
    }

    /// Parses the snake-case names used in `[selection]` and
    /// `default_strategy`. Case-insensitive.
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "long_call" => Some(StrategyKind::LongCall),
            "long_put" => Some(StrategyKind::LongPut),
            "bull_put_spread" => Some(StrategyKind::BullPutSpread),
            "bear_call_spread" => Some(StrategyKind::BearCallSpread),
            "iron_condor" => Some(StrategyKind::IronCondor),
            "long_straddle" => Some(StrategyKind::LongStraddle),
            "call_credit_spread" => Some(StrategyKind::CallCreditSpread),
            "put_credit_spread" => Some(StrategyKind::PutCreditSpread),
            _ => None,
        }
    }

    /// Market view the structure expresses.
    pub fn bias(self) -> MarketBias {
        match self {
            StrategyKind::LongCall | StrategyKind::BullPutSpread | StrategyKind::PutCreditSpread => {
                MarketBias::Bullish
            }
            StrategyKind::LongPut | StrategyKind::BearCallSpread | StrategyKind::CallCreditSpread => {
                MarketBias::Bearish
            }
            StrategyKind::IronCondor | StrategyKind::LongStraddle | StrategyKind::Default => {
                MarketBias::Neutral
            }
        }
    }

    pub fn is_credit(self) -> bool {
        matches!(
            self,
            StrategyKind::BullPutSpread
                | StrategyKind::BearCallSpread
                | StrategyKind::CallCreditSpread
                | StrategyKind::PutCreditSpread
                | StrategyKind::IronCondor
        )
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leg contracts per strategy kind.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyLegs {
    LongCall {
        option: OptionContract,
    },
    LongPut {
        option: OptionContract,
    },
    BullPutSpread {
        short_put: OptionContract,
        long_put: OptionContract,
    },
    BearCallSpread {
        short_call: OptionContract,
        long_call: OptionContract,
    },
    /// Protective legs may be missing on the rule path; such a condor is
    /// reported but never entered.
    IronCondor {
        short_call: OptionContract,
        long_call: Option<OptionContract>,
        short_put: OptionContract,
        long_put: Option<OptionContract>,
    },
    LongStraddle {
        call: OptionContract,
        put: OptionContract,
    },
    CallCreditSpread {
        short_call: OptionContract,
        long_call: OptionContract,
    },
    PutCreditSpread {
        short_put: OptionContract,
        long_put: OptionContract,
    },
    /// No tradable structure; carries the ATM pair for reference.
    Default {
        call: Option<OptionContract>,
        put: Option<OptionContract>,
    },
}

/// Economics of a two-leg credit vertical, per share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertical {
    pub short_strike: f64,
    pub width: f64,
    pub credit: f64,
}

impl Vertical {
    pub fn new(short: &OptionContract, long: &OptionContract) -> Self {
        Vertical {
            short_strike: short.strike,
            width: (short.strike - long.strike).abs(),
            credit: short.last_price - long.last_price,
        }
    }

    pub fn max_risk(&self) -> f64 {
        self.width - self.credit
    }
}

impl StrategyLegs {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyLegs::LongCall { .. } => StrategyKind::LongCall,
            StrategyLegs::LongPut { .. } => StrategyKind::LongPut,
            StrategyLegs::BullPutSpread { .. } => StrategyKind::BullPutSpread,
            StrategyLegs::BearCallSpread { .. } => StrategyKind::BearCallSpread,
            StrategyLegs::IronCondor { .. } => StrategyKind::IronCondor,
            StrategyLegs::LongStraddle { .. } => StrategyKind::LongStraddle,
            StrategyLegs::CallCreditSpread { .. } => StrategyKind::CallCreditSpread,
            StrategyLegs::PutCreditSpread { .. } => StrategyKind::PutCreditSpread,
            StrategyLegs::Default { .. } => StrategyKind::Default,
        }
    }

    /// Contracts in the structure, counting only legs that are present.
    pub fn leg_count(&self) -> u32 {
        match self {
            StrategyLegs::LongCall { .. } | StrategyLegs::LongPut { .. } => 1,
            StrategyLegs::BullPutSpread { .. }
            | StrategyLegs::BearCallSpread { .. }
            | StrategyLegs::CallCreditSpread { .. }
            | StrategyLegs::PutCreditSpread { .. }
            | StrategyLegs::LongStraddle { .. } => 2,
            StrategyLegs::IronCondor {
                long_call,
                long_put,
                ..
            } => 2 + long_call.is_some() as u32 + long_put.is_some() as u32,
            StrategyLegs::Default { .. } => 0,
        }
    }

    /// Both protective legs present (always true for non-condor kinds).
    pub fn is_complete(&self) -> bool {
        match self {
            StrategyLegs::IronCondor {
                long_call,
                long_put,
                ..
            } => long_call.is_some() && long_put.is_some(),
            StrategyLegs::Default { .. } => false,
            _ => true,
        }
    }

    /// Debit paid per share for long structures.
    pub fn debit(&self) -> Option<f64> {
        match self {
            StrategyLegs::LongCall { option } | StrategyLegs::LongPut { option } => {
                Some(option.last_price)
            }
            StrategyLegs::LongStraddle { call, put } => Some(call.last_price + put.last_price),
            _ => None,
        }
    }

    /// The single credit vertical, for two-leg credit kinds.
    pub fn vertical(&self) -> Option<Vertical> {
        match self {
            StrategyLegs::BullPutSpread {
                short_put,
                long_put,
            }
            | StrategyLegs::PutCreditSpread {
                short_put,
                long_put,
            } => Some(Vertical::new(short_put, long_put)),
            StrategyLegs::BearCallSpread {
                short_call,
                long_call,
            }
            | StrategyLegs::CallCreditSpread {
                short_call,
                long_call,
            } => Some(Vertical::new(short_call, long_call)),
            _ => None,
        }
    }

    /// Net credit per share for credit structures; for an incomplete condor
    /// only the legs present are counted.
    pub fn credit(&self) -> Option<f64> {
        match self {
            StrategyLegs::IronCondor {
                short_call,
                long_call,
                short_put,
                long_put,
            } => Some(
                short_call.last_price + short_put.last_price
                    - long_call.as_ref().map_or(0.0, |c| c.last_price)
                    - long_put.as_ref().map_or(0.0, |p| p.last_price),
            ),
            _ => self.vertical().map(|v| v.credit),
        }
    }

    /// Present legs as `(is_short, side, contract)`, short legs first.
    pub fn leg_list(&self) -> Vec<(bool, OptionSide, &OptionContract)> {
        use OptionSide::{Call, Put};
        match self {
            StrategyLegs::LongCall { option } => vec![(false, Call, option)],
            StrategyLegs::LongPut { option } => vec![(false, Put, option)],
            StrategyLegs::BullPutSpread {
                short_put,
                long_put,
            }
            | StrategyLegs::PutCreditSpread {
                short_put,
                long_put,
            } => vec![(true, Put, short_put), (false, Put, long_put)],
            StrategyLegs::BearCallSpread {
                short_call,
                long_call,
            }
            | StrategyLegs::CallCreditSpread {
                short_call,
                long_call,
            } => vec![(true, Call, short_call), (false, Call, long_call)],
            StrategyLegs::IronCondor {
                short_call,
                long_call,
                short_put,
                long_put,
            } => {
                let mut legs = vec![(true, Call, short_call), (true, Put, short_put)];
                legs.extend(long_call.iter().map(|c| (false, Call, c)));
                legs.extend(long_put.iter().map(|p| (false, Put, p)));
                legs
            }
            StrategyLegs::LongStraddle { call, put } => vec![(false, Call, call), (false, Put, put)],
            StrategyLegs::Default { call, put } => call
                .iter()
                .map(|c| (false, Call, c))
                .chain(put.iter().map(|p| (false, Put, p)))
                .collect(),
        }
    }

    /// e.g. `short P95.00@2.00 long P90.00@0.80`.
    pub fn describe(&self) -> String {
        self.leg_list()
            .into_iter()
            .map(|(is_short, side, c)| {
                let action = if is_short { "short" } else { "long" };
                let letter = match side {
                    OptionSide::Call => 'C',
                    OptionSide::Put => 'P',
                };
                format!("{action} {letter}{:.2}@{:.2}", c.strike, c.last_price)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Max risk per share for credit structures. A condor uses the wider wing
    /// and needs both protective legs.
    pub fn max_risk(&self) -> Option<f64> {
        match self {
            StrategyLegs::IronCondor {
                short_call,
                long_call: Some(long_call),
                short_put,
                long_put: Some(long_put),
            } => {
                let call_width = long_call.strike - short_call.strike;
                let put_width = short_put.strike - long_put.strike;
                Some(call_width.max(put_width) - self.credit()?)
            }
            _ => self.vertical().map(|v| v.max_risk()),
        }
    }
}

/// Per-share payoff envelope at expiry. `max_profit = None` is unlimited.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitProfile {
    pub max_loss: f64,
    pub max_profit: Option<f64>,
    pub breakevens: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySignal {
    pub symbol: String,
    pub bias: MarketBias,
    pub expiry: NaiveDate,
    pub current_price: f64,
    pub contracts: u32,
    pub greek_optimized: bool,
    pub implied_volatility: Option<f64>,
    pub legs: StrategyLegs,
}

impl StrategySignal {
    pub fn kind(&self) -> StrategyKind {
        self.legs.kind()
    }

    pub fn profit_profile(&self) -> Option<ProfitProfile> {
        match &self.legs {
            StrategyLegs::LongCall { option } => Some(ProfitProfile {
                max_loss: option.last_price,
                max_profit: None,
                breakevens: vec![option.strike + option.last_price],
            }),
            StrategyLegs::LongPut { option } => {
                let breakeven = option.strike - option.last_price;
                Some(ProfitProfile {
                    max_loss: option.last_price,
                    max_profit: Some(breakeven),
                    breakevens: vec![breakeven],
                })
            }
            StrategyLegs::BullPutSpread { .. } | StrategyLegs::PutCreditSpread { .. } => {
                let v = self.legs.vertical()?;
                Some(ProfitProfile {
                    max_loss: v.max_risk(),
                    max_profit: Some(v.credit),
                    breakevens: vec![v.short_strike - v.credit],
                })
            }
            StrategyLegs::BearCallSpread { .. } | StrategyLegs::CallCreditSpread { .. } => {
                let v = self.legs.vertical()?;
                Some(ProfitProfile {
                    max_loss: v.max_risk(),
                    max_profit: Some(v.credit),
                    breakevens: vec![v.short_strike + v.credit],
                })
            }
            StrategyLegs::IronCondor {
                short_call,
                long_call: Some(long_call),
                short_put,
                long_put: Some(long_put),
            } => {
                let credit = self.legs.credit()?;
                let narrower =
                    (long_call.strike - short_call.strike).min(short_put.strike - long_put.strike);
                Some(ProfitProfile {
                    max_loss: narrower - credit,
                    max_profit: Some(credit),
                    breakevens: vec![short_put.strike - credit, short_call.strike + credit],
                })
            }
            StrategyLegs::IronCondor { .. } => None,
            StrategyLegs::LongStraddle { call, put } => {
                let total = call.last_price + put.last_price;
                Some(ProfitProfile {
                    max_loss: total,
                    max_profit: None,
                    breakevens: vec![put.strike - total, call.strike + total],
                })
            }
            StrategyLegs::Default { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(strike: f64, price: f64) -> OptionContract {
        OptionContract::bare(strike, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), price)
    }

    fn signal(legs: StrategyLegs) -> StrategySignal {
        StrategySignal {
            symbol: "SPY".into(),
            bias: legs.kind().bias(),
            expiry: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            current_price: 100.0,
            contracts: 1,
            greek_optimized: false,
            implied_volatility: None,
            legs,
        }
    }

    #[test]
    fn kind_names() {
        assert_eq!(StrategyKind::BullPutSpread.to_string(), "BULL_PUT_SPREAD");
        assert_eq!(
            StrategyKind::from_config_name("Iron_Condor"),
            Some(StrategyKind::IronCondor)
        );
        assert_eq!(StrategyKind::from_config_name("butterfly"), None);
    }

    #[test]
    fn vertical_economics() {
        let legs = StrategyLegs::BullPutSpread {
            short_put: leg(95.0, 2.0),
            long_put: leg(90.0, 0.8),
        };
        let v = legs.vertical().unwrap();
        assert!((v.width - 5.0).abs() < 1e-12);
        assert!((v.credit - 1.2).abs() < 1e-12);
        assert!((v.max_risk() - 3.8).abs() < 1e-12);
        assert_eq!(legs.leg_count(), 2);
    }

    #[test]
    fn condor_uses_wider_wing_for_risk() {
        let legs = StrategyLegs::IronCondor {
            short_call: leg(105.0, 1.5),
            long_call: Some(leg(115.0, 0.5)),
            short_put: leg(95.0, 1.5),
            long_put: Some(leg(90.0, 0.5)),
        };
        assert!((legs.credit().unwrap() - 2.0).abs() < 1e-12);
        assert!((legs.max_risk().unwrap() - 8.0).abs() < 1e-12);
        assert_eq!(legs.leg_count(), 4);
        assert!(legs.is_complete());
    }

    #[test]
    fn incomplete_condor() {
        let legs = StrategyLegs::IronCondor {
            short_call: leg(105.0, 1.5),
            long_call: None,
            short_put: leg(95.0, 1.5),
            long_put: Some(leg(90.0, 0.5)),
        };
        assert!(!legs.is_complete());
        assert!(legs.max_risk().is_none());
        assert_eq!(legs.leg_count(), 3);
        assert!(signal(legs).profit_profile().is_none());
    }

    #[test]
    fn long_call_profile() {
        let p = signal(StrategyLegs::LongCall {
            option: leg(100.0, 2.5),
        })
        .profit_profile()
        .unwrap();
        assert!((p.max_loss - 2.5).abs() < 1e-12);
        assert!(p.max_profit.is_none());
        assert_eq!(p.breakevens, vec![102.5]);
    }

    #[test]
    fn long_put_profile() {
        let p = signal(StrategyLegs::LongPut {
            option: leg(100.0, 3.0),
        })
        .profit_profile()
        .unwrap();
        assert_eq!(p.max_profit, Some(97.0));
        assert_eq!(p.breakevens, vec![97.0]);
    }

    #[test]
    fn bear_call_profile() {
        let p = signal(StrategyLegs::BearCallSpread {
            short_call: leg(105.0, 2.0),
            long_call: leg(110.0, 1.0),
        })
        .profit_profile()
        .unwrap();
        assert!((p.max_loss - 4.0).abs() < 1e-12);
        assert_eq!(p.max_profit, Some(1.0));
        assert_eq!(p.breakevens, vec![106.0]);
    }

    #[test]
    fn condor_profile_uses_narrower_wing() {
        let p = signal(StrategyLegs::IronCondor {
            short_call: leg(105.0, 1.5),
            long_call: Some(leg(115.0, 0.5)),
            short_put: leg(95.0, 1.5),
            long_put: Some(leg(90.0, 0.5)),
        })
        .profit_profile()
        .unwrap();
        assert!((p.max_loss - 3.0).abs() < 1e-12);
        assert_eq!(p.breakevens, vec![93.0, 107.0]);
    }

    #[test]
    fn straddle_profile() {
        let p = signal(StrategyLegs::LongStraddle {
            call: leg(100.0, 3.0),
            put: leg(100.0, 2.0),
        })
        .profit_profile()
        .unwrap();
        assert!((p.max_loss - 5.0).abs() < 1e-12);
        assert_eq!(p.breakevens, vec![95.0, 105.0]);
    }

    #[test]
    fn default_has_no_profile() {
        let s = signal(StrategyLegs::Default {
            call: None,
            put: None,
        });
        assert_eq!(s.kind(), StrategyKind::Default);
        assert!(s.profit_profile().is_none());
        assert_eq!(s.legs.leg_count(), 0);
    }

    #[test]
    fn kind_bias() {
        assert_eq!(StrategyKind::PutCreditSpread.bias(), MarketBias::Bullish);
        assert_eq!(StrategyKind::CallCreditSpread.bias(), MarketBias::Bearish);
        assert_eq!(StrategyKind::LongStraddle.bias(), MarketBias::Neutral);
        assert!(StrategyKind::IronCondor.is_credit());
        assert!(!StrategyKind::LongStraddle.is_credit());
    }

    #[test]
    fn describe_lists_short_legs_first() {
        let expiry = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        let legs = StrategyLegs::BullPutSpread {
            short_put: OptionContract::bare(95.0, expiry, 2.0),
            long_put: OptionContract::bare(90.0, expiry, 0.8),
        };
        assert_eq!(legs.describe(), "short P95.00@2.00 long P90.00@0.80");
    }

    #[test]
    fn incomplete_condor_lists_present_legs() {
        let expiry = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        let legs = StrategyLegs::IronCondor {
            short_call: OptionContract::bare(105.0, expiry, 1.0),
            long_call: None,
            short_put: OptionContract::bare(95.0, expiry, 1.0),
            long_put: Some(OptionContract::bare(90.0, expiry, 0.4)),
        };
        assert_eq!(legs.leg_list().len(), 3);
    }
}
