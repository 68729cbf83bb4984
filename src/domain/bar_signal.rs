//! Per-bar directional signal from indicator columns.
//!
//! Sums four votes and keeps the sign:
//! MA crossover (short above long +1), RSI (oversold +1, overbought -1),
//! MACD vs. its signal line, and Bollinger breakout (close below the lower
//! band +1, above the upper band -1). Missing columns vote 0.

use crate::domain::config::TechnicalConfig;
use crate::domain::price_bar::{BarSignal, PriceBar};

pub fn bar_vote(bar: &PriceBar, config: &TechnicalConfig) -> i64 {
    let ind = &bar.indicators;
    let mut vote = 0;

    if let (Some(short), Some(long)) = (ind.sma.get(&config.sma_short), ind.sma.get(&config.sma_long))
    {
        vote += cmp_vote(*short, *long);
    }

    match ind.rsi {
        Some(rsi) if rsi < config.rsi_oversold => vote += 1,
        Some(rsi) if rsi > config.rsi_overbought => vote -= 1,
        _ => {}
    }

    if let (Some(macd), Some(signal)) = (ind.macd, ind.macd_signal) {
        vote += cmp_vote(macd, signal);
    }

    if let Some(lower) = ind.bb_lower {
        if bar.close < lower {
            vote += 1;
        }
    }
    if let Some(upper) = ind.bb_upper {
        if bar.close > upper {
            vote -= 1;
        }
    }

    vote
}

/// Overwrites `signal` on every bar.
pub fn generate_signals(bars: &mut [PriceBar], config: &TechnicalConfig) {
    for bar in bars.iter_mut() {
        bar.signal = BarSignal::from_int(bar_vote(bar, config));
    }
}

fn cmp_vote(a: f64, b: f64) -> i64 {
    if a > b {
        1
    } else if a < b {
        -1
    } else {
        0
    }
}
