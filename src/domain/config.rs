//! Typed strategy configuration.
//!
//! Every field carries its default in `impl Default`; `from_port` overlays
//! whatever keys the INI file provides. Range checks live in
//! [`crate::domain::config_validation`].

use crate::domain::error::OptitraderError;
use crate::domain::indicator::macd;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneralConfig {
    /// Fraction of initial capital risked per trade.
    pub risk_per_trade: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalWeights {
    pub trend_weight: f64,
    pub momentum_weight: f64,
    pub volatility_weight: f64,
    pub signal_threshold: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            trend_weight: 0.4,
            momentum_weight: 0.3,
            volatility_weight: 0.3,
            signal_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TechnicalConfig {
    pub sma_short: usize,
    pub sma_long: usize,
    pub use_sma: bool,
    pub use_rsi: bool,
    pub use_macd: bool,
    pub use_bollinger: bool,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_mult: f64,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 50,
            use_sma: true,
            use_rsi: true,
            use_macd: true,
            use_bollinger: true,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_period: 14,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            bollinger_period: 20,
            bollinger_mult: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GreekConfig {
    pub delta_threshold: f64,
    pub gamma_threshold: f64,
    pub theta_threshold: f64,
    pub vega_threshold: f64,
    pub min_open_interest: u64,
    pub min_volume: u64,
    pub delta_weight: f64,
    pub gamma_weight: f64,
    pub theta_weight: f64,
    /// Target |delta| for iron condor short legs.
    pub condor_short_delta: f64,
    /// Moneyness band for gamma scalping candidates.
    pub gamma_atm_band: f64,
}

impl Default for GreekConfig {
    fn default() -> Self {
        Self {
            delta_threshold: 0.5,
            gamma_threshold: 0.1,
            theta_threshold: -0.1,
            vega_threshold: 0.2,
            min_open_interest: 100,
            min_volume: 10,
            delta_weight: 0.5,
            gamma_weight: 0.3,
            theta_weight: 0.2,
            condor_short_delta: 0.25,
            gamma_atm_band: 0.05,
        }
    }
}

/// Neutral-bias routing for the Greek path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolatilityBias {
    Increasing,
    Decreasing,
    GammaScalping,
    #[default]
    Neutral,
}

impl VolatilityBias {
    /// Anything unrecognised routes to theta decay.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "increasing" => VolatilityBias::Increasing,
            "decreasing" => VolatilityBias::Decreasing,
            "gamma_scalping" => VolatilityBias::GammaScalping,
            _ => VolatilityBias::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionsConfig {
    /// `auto`, a bias name (replaces the computed bias) or a strategy name
    /// (builds that structure, on the Greek path only when the scorer
    /// produces the same kind). Unknown values act as `auto`.
    pub default_strategy: String,
    pub use_greek_optimization: bool,
    pub volatility_bias: VolatilityBias,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_days_to_hold: i64,
    pub call_otm_pct: f64,
    pub put_otm_pct: f64,
    pub spread_take_profit: f64,
    pub condor_take_profit: f64,
    /// Days over which a credit position decays to full profit.
    pub credit_horizon_days: i64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            default_strategy: "auto".to_string(),
            use_greek_optimization: true,
            volatility_bias: VolatilityBias::Neutral,
            stop_loss_pct: 0.5,
            take_profit_pct: 1.0,
            max_days_to_hold: 14,
            call_otm_pct: 0.05,
            put_otm_pct: 0.05,
            spread_take_profit: 0.7,
            condor_take_profit: 0.6,
            credit_horizon_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub bullish_low_iv: String,
    pub bullish_high_iv: String,
    pub bullish_iv_threshold: f64,
    pub bearish_low_iv: String,
    pub bearish_high_iv: String,
    pub bearish_iv_threshold: f64,
    pub neutral_default: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            bullish_low_iv: "long_call".to_string(),
            bullish_high_iv: "bull_put_spread".to_string(),
            bullish_iv_threshold: 0.5,
            bearish_low_iv: "long_put".to_string(),
            bearish_high_iv: "bear_call_spread".to_string(),
            bearish_iv_threshold: 0.5,
            neutral_default: "iron_condor".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub commission_per_contract: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            commission_per_contract: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyConfig {
    pub general: GeneralConfig,
    pub signals: SignalWeights,
    pub technical: TechnicalConfig,
    pub greeks: GreekConfig,
    pub options: OptionsConfig,
    pub selection: SelectionConfig,
    pub backtest: BacktestConfig,
}

impl StrategyConfig {
    /// Capital budget handed to sizing: `initial_capital * risk_per_trade`.
    pub fn risk_capital(&self) -> f64 {
        self.backtest.initial_capital * self.general.risk_per_trade
    }

    /// Builds the config from a port, taking the typed default for every
    /// absent key. Fails only on negative values for count-like keys.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, OptitraderError> {
        let d = StrategyConfig::default();

        let general = GeneralConfig {
            risk_per_trade: port.get_double("general", "risk_per_trade", d.general.risk_per_trade),
        };

        let signals = SignalWeights {
            trend_weight: port.get_double("signals", "trend_weight", d.signals.trend_weight),
            momentum_weight: port.get_double(
                "signals",
                "momentum_weight",
                d.signals.momentum_weight,
            ),
            volatility_weight: port.get_double(
                "signals",
                "volatility_weight",
                d.signals.volatility_weight,
            ),
            signal_threshold: port.get_double(
                "signals",
                "signal_threshold",
                d.signals.signal_threshold,
            ),
        };

        let t = &d.technical;
        let technical = TechnicalConfig {
            sma_short: get_count(port, "technical", "sma_short", t.sma_short)?,
            sma_long: get_count(port, "technical", "sma_long", t.sma_long)?,
            use_sma: port.get_bool("technical", "use_sma", t.use_sma),
            use_rsi: port.get_bool("technical", "use_rsi", t.use_rsi),
            use_macd: port.get_bool("technical", "use_macd", t.use_macd),
            use_bollinger: port.get_bool("technical", "use_bollinger", t.use_bollinger),
            rsi_oversold: port.get_double("technical", "rsi_oversold", t.rsi_oversold),
            rsi_overbought: port.get_double("technical", "rsi_overbought", t.rsi_overbought),
            rsi_period: get_count(port, "technical", "rsi_period", t.rsi_period)?,
            macd_fast: get_count(port, "technical", "macd_fast", t.macd_fast)?,
            macd_slow: get_count(port, "technical", "macd_slow", t.macd_slow)?,
            macd_signal: get_count(port, "technical", "macd_signal", t.macd_signal)?,
            bollinger_period: get_count(port, "technical", "bollinger_period", t.bollinger_period)?,
            bollinger_mult: port.get_double("technical", "bollinger_mult", t.bollinger_mult),
        };

        let g = &d.greeks;
        let greeks = GreekConfig {
            delta_threshold: port.get_double("greeks", "delta_threshold", g.delta_threshold),
            gamma_threshold: port.get_double("greeks", "gamma_threshold", g.gamma_threshold),
            theta_threshold: port.get_double("greeks", "theta_threshold", g.theta_threshold),
            vega_threshold: port.get_double("greeks", "vega_threshold", g.vega_threshold),
            min_open_interest: get_count(
                port,
                "greeks",
                "min_open_interest",
                g.min_open_interest as usize,
            )? as u64,
            min_volume: get_count(port, "greeks", "min_volume", g.min_volume as usize)? as u64,
            delta_weight: port.get_double("greeks", "delta_weight", g.delta_weight),
            gamma_weight: port.get_double("greeks", "gamma_weight", g.gamma_weight),
            theta_weight: port.get_double("greeks", "theta_weight", g.theta_weight),
            condor_short_delta: port.get_double(
                "greeks",
                "condor_short_delta",
                g.condor_short_delta,
            ),
            gamma_atm_band: port.get_double("greeks", "gamma_atm_band", g.gamma_atm_band),
        };

        let o = &d.options;
        let options = OptionsConfig {
            default_strategy: port.get_string_or("options", "default_strategy", &o.default_strategy),
            use_greek_optimization: port.get_bool(
                "options",
                "use_greek_optimization",
                o.use_greek_optimization,
            ),
            volatility_bias: VolatilityBias::parse(&port.get_string_or(
                "options",
                "volatility_bias",
                "neutral",
            )),
            stop_loss_pct: port.get_double("options", "stop_loss_pct", o.stop_loss_pct),
            take_profit_pct: port.get_double("options", "take_profit_pct", o.take_profit_pct),
            max_days_to_hold: port.get_int("options", "max_days_to_hold", o.max_days_to_hold),
            call_otm_pct: port.get_double("options", "call_otm_pct", o.call_otm_pct),
            put_otm_pct: port.get_double("options", "put_otm_pct", o.put_otm_pct),
            spread_take_profit: port.get_double(
                "options",
                "spread_take_profit",
                o.spread_take_profit,
            ),
            condor_take_profit: port.get_double(
                "options",
                "condor_take_profit",
                o.condor_take_profit,
            ),
            credit_horizon_days: port.get_int(
                "options",
                "credit_horizon_days",
                o.credit_horizon_days,
            ),
        };

        let s = &d.selection;
        let selection = SelectionConfig {
            bullish_low_iv: port.get_string_or("selection", "bullish_low_iv", &s.bullish_low_iv),
            bullish_high_iv: port.get_string_or("selection", "bullish_high_iv", &s.bullish_high_iv),
            bullish_iv_threshold: port.get_double(
                "selection",
                "bullish_iv_threshold",
                s.bullish_iv_threshold,
            ),
            bearish_low_iv: port.get_string_or("selection", "bearish_low_iv", &s.bearish_low_iv),
            bearish_high_iv: port.get_string_or("selection", "bearish_high_iv", &s.bearish_high_iv),
            bearish_iv_threshold: port.get_double(
                "selection",
                "bearish_iv_threshold",
                s.bearish_iv_threshold,
            ),
            neutral_default: port.get_string_or("selection", "neutral_default", &s.neutral_default),
        };

        let backtest = BacktestConfig {
            initial_capital: port.get_double(
                "backtest",
                "initial_capital",
                d.backtest.initial_capital,
            ),
            commission_per_contract: port.get_double(
                "backtest",
                "commission_per_contract",
                d.backtest.commission_per_contract,
            ),
        };

        Ok(StrategyConfig {
            general,
            signals,
            technical,
            greeks,
            options,
            selection,
            backtest,
        })
    }
}

fn get_count(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, OptitraderError> {
    let value = port.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| OptitraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{} must be non-negative, got {}", key, value),
    })
}
