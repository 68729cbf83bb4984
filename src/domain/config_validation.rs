//! Configuration validation.
//!
//! Runs on the typed [`StrategyConfig`] after defaults are applied, before
//! any symbol is processed.

use crate::domain::config::StrategyConfig;
use crate::domain::error::OptitraderError;

pub fn validate_strategy_config(config: &StrategyConfig) -> Result<(), OptitraderError> {
    validate_general(config)?;
    validate_signals(config)?;
    validate_technical(config)?;
    validate_greeks(config)?;
    validate_options(config)?;
    validate_selection(config)?;
    validate_backtest(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> OptitraderError {
    OptitraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn check_unit_interval(section: &str, key: &str, value: f64) -> Result<(), OptitraderError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(
            section,
            key,
            &format!("{} must be between 0 and 1", key),
        ));
    }
    Ok(())
}

fn validate_general(config: &StrategyConfig) -> Result<(), OptitraderError> {
    let value = config.general.risk_per_trade;
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "general",
            "risk_per_trade",
            "risk_per_trade must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_signals(config: &StrategyConfig) -> Result<(), OptitraderError> {
    let s = &config.signals;
    check_unit_interval("signals", "trend_weight", s.trend_weight)?;
    check_unit_interval("signals", "momentum_weight", s.momentum_weight)?;
    check_unit_interval("signals", "volatility_weight", s.volatility_weight)?;
    if s.signal_threshold < 0.0 {
        return Err(invalid(
            "signals",
            "signal_threshold",
            "signal_threshold must be non-negative",
        ));
    }
    Ok(())
}

fn validate_technical(config: &StrategyConfig) -> Result<(), OptitraderError> {
    let t = &config.technical;
    for (key, value) in [
        ("sma_short", t.sma_short),
        ("sma_long", t.sma_long),
        ("rsi_period", t.rsi_period),
        ("macd_fast", t.macd_fast),
        ("macd_slow", t.macd_slow),
        ("macd_signal", t.macd_signal),
        ("bollinger_period", t.bollinger_period),
    ] {
        if value == 0 {
            return Err(invalid(
                "technical",
                key,
                &format!("{} must be at least 1", key),
            ));
        }
    }
    if t.sma_short >= t.sma_long {
        return Err(invalid(
            "technical",
            "sma_short",
            "sma_short must be shorter than sma_long",
        ));
    }
    if t.macd_fast >= t.macd_slow {
        return Err(invalid(
            "technical",
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }
    if !(0.0..=100.0).contains(&t.rsi_oversold)
        || !(0.0..=100.0).contains(&t.rsi_overbought)
        || t.rsi_oversold >= t.rsi_overbought
    {
        return Err(invalid(
            "technical",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought, both within 0..100",
        ));
    }
    if t.bollinger_mult <= 0.0 {
        return Err(invalid(
            "technical",
            "bollinger_mult",
            "bollinger_mult must be positive",
        ));
    }
    Ok(())
}

fn validate_greeks(config: &StrategyConfig) -> Result<(), OptitraderError> {
    let g = &config.greeks;
    check_unit_interval("greeks", "delta_threshold", g.delta_threshold)?;
    if g.gamma_threshold <= 0.0 {
        return Err(invalid(
            "greeks",
            "gamma_threshold",
            "gamma_threshold must be positive",
        ));
    }
    if g.theta_threshold == 0.0 {
        return Err(invalid(
            "greeks",
            "theta_threshold",
            "theta_threshold must be non-zero",
        ));
    }
    check_unit_interval("greeks", "delta_weight", g.delta_weight)?;
    check_unit_interval("greeks", "gamma_weight", g.gamma_weight)?;
    check_unit_interval("greeks", "theta_weight", g.theta_weight)?;
    check_unit_interval("greeks", "condor_short_delta", g.condor_short_delta)?;
    if g.gamma_atm_band < 0.0 {
        return Err(invalid(
            "greeks",
            "gamma_atm_band",
            "gamma_atm_band must be non-negative",
        ));
    }
    Ok(())
}

fn validate_options(config: &StrategyConfig) -> Result<(), OptitraderError> {
    let o = &config.options;
    if o.stop_loss_pct <= 0.0 || o.stop_loss_pct > 1.0 {
        return Err(invalid(
            "options",
            "stop_loss_pct",
            "stop_loss_pct must be in (0, 1]",
        ));
    }
    if o.take_profit_pct <= 0.0 {
        return Err(invalid(
            "options",
            "take_profit_pct",
            "take_profit_pct must be positive",
        ));
    }
    if o.max_days_to_hold < 1 {
        return Err(invalid(
            "options",
            "max_days_to_hold",
            "max_days_to_hold must be at least 1",
        ));
    }
    for (key, value) in [
        ("call_otm_pct", o.call_otm_pct),
        ("put_otm_pct", o.put_otm_pct),
    ] {
        if !(0.0..1.0).contains(&value) {
            return Err(invalid(
                "options",
                key,
                &format!("{} must be in [0, 1)", key),
            ));
        }
    }
    check_unit_interval("options", "spread_take_profit", o.spread_take_profit)?;
    check_unit_interval("options", "condor_take_profit", o.condor_take_profit)?;
    if o.credit_horizon_days < 1 {
        return Err(invalid(
            "options",
            "credit_horizon_days",
            "credit_horizon_days must be at least 1",
        ));
    }
    Ok(())
}

fn validate_selection(config: &StrategyConfig) -> Result<(), OptitraderError> {
    let s = &config.selection;
    for (key, value) in [
        ("bullish_iv_threshold", s.bullish_iv_threshold),
        ("bearish_iv_threshold", s.bearish_iv_threshold),
    ] {
        if value < 0.0 {
            return Err(invalid(
                "selection",
                key,
                &format!("{} must be non-negative", key),
            ));
        }
    }
    Ok(())
}

fn validate_backtest(config: &StrategyConfig) -> Result<(), OptitraderError> {
    let b = &config.backtest;
    if b.initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if b.commission_per_contract < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_per_contract",
            "commission_per_contract must be non-negative",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> StrategyConfig {
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        StrategyConfig::from_port(&adapter).unwrap()
    }

    fn invalid_key(content: &str) -> String {
        match validate_strategy_config(&make_config(content)).unwrap_err() {
            OptitraderError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn defaults_pass() {
        assert!(validate_strategy_config(&StrategyConfig::default()).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[general]
risk_per_trade = 0.05

[signals]
trend_weight = 0.5
momentum_weight = 0.25
volatility_weight = 0.25
signal_threshold = 0.1

[options]
stop_loss_pct = 0.4
take_profit_pct = 0.8
max_days_to_hold = 10

[backtest]
initial_capital = 50000
commission_per_contract = 0.65
"#,
        );
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn initial_capital_zero_fails() {
        assert_eq!(
            invalid_key("[backtest]\ninitial_capital = 0\n"),
            "initial_capital"
        );
    }

    #[test]
    fn negative_commission_fails() {
        assert_eq!(
            invalid_key("[backtest]\ncommission_per_contract = -1\n"),
            "commission_per_contract"
        );
    }

    #[test]
    fn risk_per_trade_above_one_fails() {
        assert_eq!(
            invalid_key("[general]\nrisk_per_trade = 1.5\n"),
            "risk_per_trade"
        );
    }

    #[test]
    fn weight_outside_unit_interval_fails() {
        assert_eq!(
            invalid_key("[signals]\nmomentum_weight = 1.2\n"),
            "momentum_weight"
        );
    }

    #[test]
    fn stop_loss_zero_fails() {
        assert_eq!(
            invalid_key("[options]\nstop_loss_pct = 0\n"),
            "stop_loss_pct"
        );
    }

    #[test]
    fn max_days_zero_fails() {
        assert_eq!(
            invalid_key("[options]\nmax_days_to_hold = 0\n"),
            "max_days_to_hold"
        );
    }

    #[test]
    fn otm_offset_of_one_fails() {
        assert_eq!(invalid_key("[options]\nput_otm_pct = 1.0\n"), "put_otm_pct");
    }

    #[test]
    fn gamma_threshold_zero_fails() {
        assert_eq!(
            invalid_key("[greeks]\ngamma_threshold = 0\n"),
            "gamma_threshold"
        );
    }

    #[test]
    fn theta_threshold_zero_fails() {
        assert_eq!(
            invalid_key("[greeks]\ntheta_threshold = 0\n"),
            "theta_threshold"
        );
    }

    #[test]
    fn sma_order_enforced() {
        assert_eq!(
            invalid_key("[technical]\nsma_short = 60\nsma_long = 50\n"),
            "sma_short"
        );
    }

    #[test]
    fn rsi_bands_inverted_fail() {
        assert_eq!(
            invalid_key("[technical]\nrsi_oversold = 80\nrsi_overbought = 20\n"),
            "rsi_oversold"
        );
    }

    #[test]
    fn zero_period_fails() {
        assert_eq!(
            invalid_key("[technical]\nbollinger_period = 0\n"),
            "bollinger_period"
        );
    }
}
