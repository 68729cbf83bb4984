//! Strategy selector.
//!
//! Turns a market bias and an option chain into one [`StrategySignal`].
//! The Greek path is tried first when enabled and the chain carries Greeks;
//! otherwise, or when the scorer finds nothing, the rule path picks ATM/OTM
//! legs and maps the IV regime to a configured strategy name.

use crate::domain::config::{StrategyConfig, VolatilityBias};
use crate::domain::diagnostics::{Diagnostics, Recovery};
use crate::domain::greeks::{GreekScorer, GreekTrade, VolatilityOutlook};
use crate::domain::option_chain::{
    OptionChainSnapshot, OptionContract, OptionSide, nearest_strike, next_further_otm,
};
use crate::domain::sizing::size_contracts;
use crate::domain::strategy::{StrategyKind, StrategyLegs, StrategySignal};
use crate::domain::technical::MarketBias;

/// Parsed `default_strategy` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOverride {
    Auto,
    Bias(MarketBias),
    /// A strategy name forces both the structure and the bias it expresses.
    Strategy(StrategyKind),
}

impl StrategyOverride {
    pub fn parse(value: &str, diag: &mut Diagnostics) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return StrategyOverride::Auto;
        }
        if let Some(bias) = MarketBias::parse(trimmed) {
            return StrategyOverride::Bias(bias);
        }
        if let Some(kind) = StrategyKind::from_config_name(trimmed) {
            return StrategyOverride::Strategy(kind);
        }
        diag.record(
            Recovery::UnknownOverride,
            &format!("default_strategy '{}'", trimmed),
        );
        StrategyOverride::Auto
    }

    pub fn apply(self, computed: MarketBias) -> MarketBias {
        match self {
            StrategyOverride::Auto => computed,
            StrategyOverride::Bias(bias) => bias,
            StrategyOverride::Strategy(kind) => kind.bias(),
        }
    }

    pub fn forced_kind(self) -> Option<StrategyKind> {
        match self {
            StrategyOverride::Strategy(kind) => Some(kind),
            _ => None,
        }
    }
}

/// ATM and OTM contracts the rule path builds from.
struct RuleLegs<'c> {
    atm_call: &'c OptionContract,
    atm_put: &'c OptionContract,
    otm_call: &'c OptionContract,
    otm_put: &'c OptionContract,
}

pub struct StrategySelector<'a> {
    config: &'a StrategyConfig,
}

impl<'a> StrategySelector<'a> {
    pub fn new(config: &'a StrategyConfig) -> Self {
        StrategySelector { config }
    }

    /// `None` only when the chain offers nothing to build from.
    pub fn select(
        &self,
        computed: MarketBias,
        chain: &OptionChainSnapshot,
        diag: &mut Diagnostics,
    ) -> Option<StrategySignal> {
        if chain.is_empty() {
            tracing::info!(symbol = %chain.symbol, "empty option chain, no strategy");
            return None;
        }

        let overridden = StrategyOverride::parse(&self.config.options.default_strategy, diag);
        let bias = overridden.apply(computed);
        let forced = overridden.forced_kind();
        let iv = atm_implied_volatility(chain);

        if self.config.options.use_greek_optimization {
            if chain.has_greeks() {
                match self.greek_path(bias, chain, diag) {
                    Some(trade) if forced.is_none_or(|kind| trade.legs.kind() == kind) => {
                        let signal = self.wrap(chain, bias, iv, trade.legs, trade.contracts, true);
                        tracing::info!(
                            symbol = %chain.symbol,
                            kind = %signal.kind(),
                            contracts = signal.contracts,
                            "greek-optimised strategy selected"
                        );
                        return Some(signal);
                    }
                    // Scored structure differs from the configured one; build that instead.
                    Some(trade) => tracing::debug!(
                        symbol = %chain.symbol,
                        scored = %trade.legs.kind(),
                        "greek structure not the configured strategy"
                    ),
                    None => diag.record(
                        Recovery::GreekScorerEmpty,
                        &format!("{} {}", chain.symbol, bias),
                    ),
                }
            } else {
                diag.record(Recovery::GreeksUnavailable, &chain.symbol);
            }
        }

        let signal = self.rule_path(bias, forced, chain, iv, diag)?;
        tracing::info!(
            symbol = %chain.symbol,
            kind = %signal.kind(),
            contracts = signal.contracts,
            "rule-based strategy selected"
        );
        Some(signal)
    }

    fn greek_path(
        &self,
        bias: MarketBias,
        chain: &OptionChainSnapshot,
        diag: &mut Diagnostics,
    ) -> Option<GreekTrade> {
        let scorer = GreekScorer::new(&self.config.greeks, self.config.risk_capital());
        match bias {
            MarketBias::Bullish | MarketBias::Bearish => {
                scorer.optimize_directional(chain, bias, diag)
            }
            MarketBias::Neutral => match self.config.options.volatility_bias {
                VolatilityBias::Increasing => {
                    scorer.optimize_volatility(chain, VolatilityOutlook::Increasing, diag)
                }
                VolatilityBias::Decreasing => {
                    scorer.optimize_volatility(chain, VolatilityOutlook::Decreasing, diag)
                }
                VolatilityBias::GammaScalping => scorer.optimize_gamma_scalping(chain, diag),
                VolatilityBias::Neutral => scorer.optimize_theta_decay(chain, diag),
            },
        }
    }

    fn rule_path(
        &self,
        bias: MarketBias,
        forced: Option<StrategyKind>,
        chain: &OptionChainSnapshot,
        iv: Option<f64>,
        diag: &mut Diagnostics,
    ) -> Option<StrategySignal> {
        let Some(legs) = self.rule_legs(chain) else {
            tracing::info!(symbol = %chain.symbol, "rule path needs both calls and puts");
            return None;
        };

        let kind = match forced {
            Some(kind) => Some(kind),
            None => self.configured_kind(bias, chain, iv, diag),
        };
        let structure = match kind {
            Some(kind) => build_rule_structure(kind, &legs, chain),
            None => StrategyLegs::Default {
                call: Some(legs.atm_call.clone()),
                put: Some(legs.atm_put.clone()),
            },
        };

        let contracts = self.size_rule_structure(&structure, diag);
        Some(self.wrap(chain, bias, iv, structure, contracts, false))
    }

    /// Maps bias and IV regime to the `[selection]` strategy name.
    fn configured_kind(
        &self,
        bias: MarketBias,
        chain: &OptionChainSnapshot,
        iv: Option<f64>,
        diag: &mut Diagnostics,
    ) -> Option<StrategyKind> {
        let selection = &self.config.selection;
        let name = match bias {
            MarketBias::Bullish => {
                if self.is_high_iv(iv, selection.bullish_iv_threshold, &chain.symbol, diag) {
                    &selection.bullish_high_iv
                } else {
                    &selection.bullish_low_iv
                }
            }
            MarketBias::Bearish => {
                if self.is_high_iv(iv, selection.bearish_iv_threshold, &chain.symbol, diag) {
                    &selection.bearish_high_iv
                } else {
                    &selection.bearish_low_iv
                }
            }
            MarketBias::Neutral => &selection.neutral_default,
        };

        let kind = StrategyKind::from_config_name(name);
        if kind.is_none() {
            diag.record(
                Recovery::UnknownStrategyName,
                &format!("{} '{}'", chain.symbol, name),
            );
        }
        kind
    }

    fn rule_legs<'c>(&self, chain: &'c OptionChainSnapshot) -> Option<RuleLegs<'c>> {
        let price = chain.current_price;
        let options = &self.config.options;
        Some(RuleLegs {
            atm_call: chain.atm_call()?,
            atm_put: chain.atm_put()?,
            otm_call: nearest_strike(&chain.calls, price * (1.0 + options.call_otm_pct))?,
            otm_put: nearest_strike(&chain.puts, price * (1.0 - options.put_otm_pct))?,
        })
    }

    fn is_high_iv(
        &self,
        iv: Option<f64>,
        threshold: f64,
        symbol: &str,
        diag: &mut Diagnostics,
    ) -> bool {
        match iv {
            Some(iv) => iv > threshold,
            None => {
                diag.record(Recovery::MissingImpliedVolatility, symbol);
                false
            }
        }
    }

    fn size_rule_structure(&self, legs: &StrategyLegs, diag: &mut Diagnostics) -> u32 {
        let risk_capital = self.config.risk_capital();
        if let Some(debit) = legs.debit() {
            return size_contracts(risk_capital, debit, diag);
        }
        if !legs.is_complete() {
            // never entered, so there is nothing to size against
            return 1;
        }
        match legs.max_risk() {
            Some(max_risk) => size_contracts(risk_capital, max_risk, diag),
            None => 1,
        }
    }

    fn wrap(
        &self,
        chain: &OptionChainSnapshot,
        bias: MarketBias,
        implied_volatility: Option<f64>,
        legs: StrategyLegs,
        contracts: u32,
        greek_optimized: bool,
    ) -> StrategySignal {
        StrategySignal {
            symbol: chain.symbol.clone(),
            bias,
            expiry: chain.expiry,
            current_price: chain.current_price,
            contracts,
            greek_optimized,
            implied_volatility,
            legs,
        }
    }
}

/// Mean IV of the ATM call and put, whichever carry one.
pub fn atm_implied_volatility(chain: &OptionChainSnapshot) -> Option<f64> {
    let ivs: Vec<f64> = [chain.atm_call(), chain.atm_put()]
        .into_iter()
        .flatten()
        .filter_map(|c| c.implied_volatility)
        .collect();
    if ivs.is_empty() {
        None
    } else {
        Some(ivs.iter().sum::<f64>() / ivs.len() as f64)
    }
}

fn build_rule_structure(
    kind: StrategyKind,
    legs: &RuleLegs<'_>,
    chain: &OptionChainSnapshot,
) -> StrategyLegs {
    match kind {
        StrategyKind::LongCall => StrategyLegs::LongCall {
            option: legs.atm_call.clone(),
        },
        StrategyKind::LongPut => StrategyLegs::LongPut {
            option: legs.atm_put.clone(),
        },
        StrategyKind::BullPutSpread => StrategyLegs::BullPutSpread {
            short_put: legs.atm_put.clone(),
            long_put: legs.otm_put.clone(),
        },
        StrategyKind::PutCreditSpread => StrategyLegs::PutCreditSpread {
            short_put: legs.atm_put.clone(),
            long_put: legs.otm_put.clone(),
        },
        StrategyKind::BearCallSpread => StrategyLegs::BearCallSpread {
            short_call: legs.atm_call.clone(),
            long_call: legs.otm_call.clone(),
        },
        StrategyKind::CallCreditSpread => StrategyLegs::CallCreditSpread {
            short_call: legs.atm_call.clone(),
            long_call: legs.otm_call.clone(),
        },
        StrategyKind::LongStraddle => StrategyLegs::LongStraddle {
            call: legs.atm_call.clone(),
            put: legs.atm_put.clone(),
        },
        StrategyKind::IronCondor => StrategyLegs::IronCondor {
            short_call: legs.otm_call.clone(),
            long_call: next_further_otm(&chain.calls, OptionSide::Call, legs.otm_call.strike)
                .cloned(),
            short_put: legs.otm_put.clone(),
            long_put: next_further_otm(&chain.puts, OptionSide::Put, legs.otm_put.strike)
                .cloned(),
        },
        StrategyKind::Default => StrategyLegs::Default {
            call: Some(legs.atm_call.clone()),
            put: Some(legs.atm_put.clone()),
        },
    }
}
