//! Fills the indicator columns of a bar table from raw closes.

use crate::domain::config::TechnicalConfig;
use crate::domain::indicator::{
    IndicatorValue, calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi,
    calculate_sma,
};
use crate::domain::price_bar::PriceBar;

/// Computes SMA short/long, EMA short/long, RSI, MACD and Bollinger columns
/// in place. Warm-up bars keep `None`. Existing columns are overwritten.
pub fn compute_indicators(bars: &mut [PriceBar], config: &TechnicalConfig) {
    if bars.is_empty() {
        return;
    }

    for period in [config.sma_short, config.sma_long] {
        let sma = calculate_sma(bars, period);
        let ema = calculate_ema(bars, period);
        for (i, bar) in bars.iter_mut().enumerate() {
            match sma.simple_at(i) {
                Some(v) => bar.indicators.sma.insert(period, v),
                None => bar.indicators.sma.remove(&period),
            };
            match ema.simple_at(i) {
                Some(v) => bar.indicators.ema.insert(period, v),
                None => bar.indicators.ema.remove(&period),
            };
        }
    }

    let rsi = calculate_rsi(bars, config.rsi_period);
    let macd = calculate_macd(bars, config.macd_fast, config.macd_slow, config.macd_signal);
    let stddev_mult_x100 = (config.bollinger_mult * 100.0).round().max(0.0) as u32;
    let bollinger = calculate_bollinger(bars, config.bollinger_period, stddev_mult_x100);

    for (i, bar) in bars.iter_mut().enumerate() {
        bar.indicators.rsi = rsi.simple_at(i);

        let (line, signal) = match macd.values.get(i).and_then(|p| p.value) {
            Some(IndicatorValue::Macd { line, signal, .. }) => (Some(line), Some(signal)),
            _ => (None, None),
        };
        bar.indicators.macd = line;
        bar.indicators.macd_signal = signal;

        let (upper, middle, lower) = match bollinger.values.get(i).and_then(|p| p.value) {
            Some(IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => (Some(upper), Some(middle), Some(lower)),
            _ => (None, None, None),
        };
        bar.indicators.bb_upper = upper;
        bar.indicators.bb_middle = middle;
        bar.indicators.bb_lower = lower;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(n: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.2;
                PriceBar::new(
                    start + chrono::Duration::days(i as i64),
                    close,
                    close + 1.0,
                    close - 1.0,
                    close,
                    10_000,
                )
            })
            .collect()
    }

    fn small_config() -> TechnicalConfig {
        TechnicalConfig {
            sma_short: 3,
            sma_long: 5,
            rsi_period: 3,
            macd_fast: 2,
            macd_slow: 4,
            macd_signal: 2,
            bollinger_period: 4,
            ..TechnicalConfig::default()
        }
    }

    #[test]
    fn fills_all_columns_after_warmup() {
        let mut bars = make_bars(10);
        compute_indicators(&mut bars, &small_config());
        let last = &bars[9].indicators;
        assert!(last.sma.contains_key(&3));
        assert!(last.sma.contains_key(&5));
        assert!(last.ema.contains_key(&5));
        assert!(last.rsi.is_some());
        assert!(last.macd.is_some());
        assert!(last.macd_signal.is_some());
        assert!(last.bollinger_width().is_some());
    }

    #[test]
    fn warmup_bars_stay_empty() {
        let mut bars = make_bars(10);
        compute_indicators(&mut bars, &small_config());
        assert!(bars[0].indicators.is_empty());
        assert!(!bars[1].indicators.sma.contains_key(&3));
        assert!(bars[2].indicators.sma.contains_key(&3));
    }

    #[test]
    fn sma_column_matches_mean() {
        let mut bars = make_bars(6);
        compute_indicators(&mut bars, &small_config());
        let expected = (bars[3].close + bars[4].close + bars[5].close) / 3.0;
        assert!((bars[5].indicators.sma[&3] - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_table_is_noop() {
        let mut bars: Vec<PriceBar> = Vec::new();
        compute_indicators(&mut bars, &small_config());
        assert!(bars.is_empty());
    }
}
