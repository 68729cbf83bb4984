//! Greek contract scorer.
//!
//! Four archetypes, each working on a liquidity-filtered view of the chain.
//! When the filter leaves nothing the unfiltered side is used instead and a
//! [`Recovery::LiquidityFallback`] is recorded. Candidates are scanned in
//! ascending strike order and only a strictly better score replaces the
//! incumbent, so exact ties resolve to the lowest strike.

use crate::domain::config::GreekConfig;
use crate::domain::diagnostics::{Diagnostics, Recovery};
use crate::domain::option_chain::{
    OptionChainSnapshot, OptionContract, OptionSide, next_further_otm,
};
use crate::domain::sizing::size_contracts;
use crate::domain::strategy::StrategyLegs;
use crate::domain::technical::MarketBias;

/// Scorer output before it is wrapped into a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct GreekTrade {
    pub legs: StrategyLegs,
    pub contracts: u32,
    /// Weighted Greek score of the chosen leg, for archetypes that rank by one.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityOutlook {
    Increasing,
    Decreasing,
}

pub struct GreekScorer<'a> {
    config: &'a GreekConfig,
    risk_capital: f64,
}

impl<'a> GreekScorer<'a> {
    pub fn new(config: &'a GreekConfig, risk_capital: f64) -> Self {
        GreekScorer {
            config,
            risk_capital,
        }
    }

    /// Weighted score of one contract against a signed target delta.
    pub fn directional_score(&self, contract: &OptionContract, target_delta: f64) -> f64 {
        let cfg = self.config;
        let delta_score = 1.0 - (contract.delta.unwrap_or(0.0) - target_delta).abs();
        let gamma_score = (contract.gamma.unwrap_or(0.0) / cfg.gamma_threshold).min(1.0);
        let theta_score = ((contract.theta.unwrap_or(0.0) - cfg.theta_threshold)
            / cfg.theta_threshold.abs())
        .clamp(0.0, 1.0);
        cfg.delta_weight * delta_score + cfg.gamma_weight * gamma_score + cfg.theta_weight * theta_score
    }

    /// Best single leg for a bullish (calls) or bearish (puts) view.
    pub fn optimize_directional(
        &self,
        chain: &OptionChainSnapshot,
        bias: MarketBias,
        diag: &mut Diagnostics,
    ) -> Option<GreekTrade> {
        let (side, target_delta) = match bias {
            MarketBias::Bullish => (OptionSide::Call, self.config.delta_threshold),
            MarketBias::Bearish => (OptionSide::Put, -self.config.delta_threshold),
            MarketBias::Neutral => return None,
        };

        let candidates = self.liquid_or_all(chain.side(side), side, diag);
        let (best, score) = best_by(&candidates, |c| self.directional_score(c, target_delta))?;

        let contracts = size_contracts(self.risk_capital, best.last_price, diag);
        let option = best.clone();
        let legs = match side {
            OptionSide::Call => StrategyLegs::LongCall { option },
            OptionSide::Put => StrategyLegs::LongPut { option },
        };
        tracing::debug!(symbol = %chain.symbol, strike = best.strike, score, "directional leg chosen");
        Some(GreekTrade {
            legs,
            contracts,
            score: Some(score),
        })
    }

    /// Long straddle for rising volatility, iron condor for falling.
    pub fn optimize_volatility(
        &self,
        chain: &OptionChainSnapshot,
        outlook: VolatilityOutlook,
        diag: &mut Diagnostics,
    ) -> Option<GreekTrade> {
        if chain.current_price <= 0.0 || chain.calls.is_empty() || chain.puts.is_empty() {
            return None;
        }
        let calls = self.liquid_or_all(&chain.calls, OptionSide::Call, diag);
        let puts = self.liquid_or_all(&chain.puts, OptionSide::Put, diag);

        match outlook {
            VolatilityOutlook::Increasing => self.long_straddle(chain, &calls, &puts, diag),
            VolatilityOutlook::Decreasing => self.iron_condor(chain, &calls, &puts, diag),
        }
    }

    fn long_straddle(
        &self,
        chain: &OptionChainSnapshot,
        calls: &[&OptionContract],
        puts: &[&OptionContract],
        diag: &mut Diagnostics,
    ) -> Option<GreekTrade> {
        let price = chain.current_price;
        let (call, _) = best_by(calls, |c| -(c.strike - price).abs())?;
        let (put, _) = best_by(puts, |c| -(c.strike - price).abs())?;

        let total = call.last_price + put.last_price;
        let contracts = size_contracts(self.risk_capital, total, diag);
        Some(GreekTrade {
            legs: StrategyLegs::LongStraddle {
                call: call.clone(),
                put: put.clone(),
            },
            contracts,
            score: None,
        })
    }

    fn iron_condor(
        &self,
        chain: &OptionChainSnapshot,
        calls: &[&OptionContract],
        puts: &[&OptionContract],
        diag: &mut Diagnostics,
    ) -> Option<GreekTrade> {
        let price = chain.current_price;
        let target = self.config.condor_short_delta;

        let otm_calls: Vec<&OptionContract> =
            calls.iter().copied().filter(|c| c.strike > price).collect();
        let otm_puts: Vec<&OptionContract> =
            puts.iter().copied().filter(|c| c.strike < price).collect();

        let delta_fit = |c: &OptionContract| -(c.delta.unwrap_or(0.0).abs() - target).abs();
        let (short_call, _) = best_by(&otm_calls, delta_fit)?;
        let (short_put, _) = best_by(&otm_puts, delta_fit)?;

        // protection may come from any listed strike
        let long_call = next_further_otm(&chain.calls, OptionSide::Call, short_call.strike);
        let long_put = next_further_otm(&chain.puts, OptionSide::Put, short_put.strike);
        let (Some(long_call), Some(long_put)) = (long_call, long_put) else {
            tracing::debug!(symbol = %chain.symbol, "no further OTM strike for condor wings");
            return None;
        };

        let legs = StrategyLegs::IronCondor {
            short_call: short_call.clone(),
            long_call: Some(long_call.clone()),
            short_put: short_put.clone(),
            long_put: Some(long_put.clone()),
        };
        let contracts = size_contracts(self.risk_capital, legs.max_risk()?, diag);
        Some(GreekTrade {
            legs,
            contracts,
            score: None,
        })
    }

    /// Credit spread on whichever side offers the most theta decay.
    pub fn optimize_theta_decay(
        &self,
        chain: &OptionChainSnapshot,
        diag: &mut Diagnostics,
    ) -> Option<GreekTrade> {
        if chain.calls.is_empty() || chain.puts.is_empty() {
            return None;
        }

        let mut calls = self.liquid(&chain.calls);
        let mut puts = self.liquid(&chain.puts);
        if calls.is_empty() && puts.is_empty() {
            diag.record(Recovery::LiquidityFallback, "theta decay: no liquid contracts");
            calls = chain.calls.iter().collect();
            puts = chain.puts.iter().collect();
        }

        let best_call = best_by(&calls, theta_score);
        let best_put = best_by(&puts, theta_score);

        let side = match (best_call, best_put) {
            (Some((_, call_score)), Some((_, put_score))) => {
                if call_score >= put_score {
                    OptionSide::Call
                } else {
                    OptionSide::Put
                }
            }
            (Some(_), None) => OptionSide::Call,
            (None, Some(_)) => OptionSide::Put,
            (None, None) => return None,
        };

        let (candidates, short) = match side {
            OptionSide::Call => (&calls, best_call?.0),
            OptionSide::Put => (&puts, best_put?.0),
        };
        let Some(long) = next_further_otm(candidates.iter().copied(), side, short.strike) else {
            tracing::debug!(symbol = %chain.symbol, strike = short.strike, "no further OTM long leg for credit spread");
            return None;
        };

        let legs = match side {
            OptionSide::Call => StrategyLegs::CallCreditSpread {
                short_call: short.clone(),
                long_call: long.clone(),
            },
            OptionSide::Put => StrategyLegs::PutCreditSpread {
                short_put: short.clone(),
                long_put: long.clone(),
            },
        };
        let contracts = size_contracts(self.risk_capital, legs.max_risk()?, diag);
        Some(GreekTrade {
            legs,
            contracts,
            score: Some(theta_score(short)),
        })
    }

    /// Highest-gamma call near the money.
    pub fn optimize_gamma_scalping(
        &self,
        chain: &OptionChainSnapshot,
        diag: &mut Diagnostics,
    ) -> Option<GreekTrade> {
        let price = chain.current_price;
        if price <= 0.0 || chain.calls.is_empty() {
            return None;
        }
        let calls = self.liquid_or_all(&chain.calls, OptionSide::Call, diag);

        let band = price * self.config.gamma_atm_band;
        let mut near: Vec<&OptionContract> = calls
            .iter()
            .copied()
            .filter(|c| (c.strike - price).abs() <= band)
            .collect();
        if near.is_empty() {
            tracing::debug!(symbol = %chain.symbol, "no near-the-money calls, using all calls");
            near = calls;
        }

        let (best, gamma) = best_by(&near, |c| c.gamma.unwrap_or(0.0))?;
        let contracts = size_contracts(self.risk_capital, best.last_price, diag);
        Some(GreekTrade {
            legs: StrategyLegs::LongCall {
                option: best.clone(),
            },
            contracts,
            score: Some(gamma),
        })
    }

    fn liquid_or_all<'c>(
        &self,
        contracts: &'c [OptionContract],
        side: OptionSide,
        diag: &mut Diagnostics,
    ) -> Vec<&'c OptionContract> {
        let liquid = self.liquid(contracts);
        if liquid.is_empty() && !contracts.is_empty() {
            let detail = match side {
                OptionSide::Call => "no liquid calls",
                OptionSide::Put => "no liquid puts",
            };
            diag.record(Recovery::LiquidityFallback, detail);
            return contracts.iter().collect();
        }
        liquid
    }

    fn liquid<'c>(&self, contracts: &'c [OptionContract]) -> Vec<&'c OptionContract> {
        contracts
            .iter()
            .filter(|c| c.is_liquid(self.config.min_open_interest, self.config.min_volume))
            .collect()
    }
}

/// `|theta|` for decaying contracts, 0 otherwise.
pub fn theta_score(contract: &OptionContract) -> f64 {
    match contract.theta {
        Some(theta) if theta < 0.0 => theta.abs(),
        _ => 0.0,
    }
}

/// Highest-keyed candidate; the first one wins a tie.
fn best_by<'c>(
    candidates: &[&'c OptionContract],
    key: impl Fn(&OptionContract) -> f64,
) -> Option<(&'c OptionContract, f64)> {
    let mut best: Option<(&OptionContract, f64)> = None;
    for &c in candidates {
        let score = key(c);
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((c, score)),
        }
    }
    best
}
