//! Technical signal analyzer.
//!
//! Reduces the last two bars of an indicator table to a market bias:
//!
//! - trend: sign(SMA short - SMA long)
//! - momentum: RSI oversold (+1) / overbought (-1) plus sign(MACD - signal)
//! - volatility: +1 if Bollinger width expanded vs. the prior bar, else -1
//!
//! score = trend*w_t + momentum*w_m + volatility*w_v, classified against
//! the configured threshold.

use crate::domain::config::{SignalWeights, TechnicalConfig};
use crate::domain::diagnostics::{Diagnostics, Recovery};
use crate::domain::price_bar::PriceBar;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
}

impl MarketBias {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketBias::Bullish => "bullish",
            MarketBias::Bearish => "bearish",
            MarketBias::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bullish" => Some(MarketBias::Bullish),
            "bearish" => Some(MarketBias::Bearish),
            "neutral" => Some(MarketBias::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for MarketBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component scores and the weighted result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicalReading {
    pub trend: i32,
    pub momentum: i32,
    pub volatility: i32,
    pub score: f64,
    pub bias: MarketBias,
}

/// Returns `None` only for an empty table. Missing indicator columns score
/// 0 for their component and are recorded.
pub fn analyze(
    bars: &[PriceBar],
    technical: &TechnicalConfig,
    weights: &SignalWeights,
    diag: &mut Diagnostics,
) -> Option<TechnicalReading> {
    let last = bars.last()?;
    let prev = bars.len().checked_sub(2).map(|i| &bars[i]);
    let ind = &last.indicators;

    let mut trend = 0;
    if technical.use_sma {
        match (
            ind.sma.get(&technical.sma_short),
            ind.sma.get(&technical.sma_long),
        ) {
            (Some(short), Some(long)) => trend = sign(short - long),
            _ => diag.record(Recovery::MissingIndicator, "sma"),
        }
    }

    let mut momentum = 0;
    if technical.use_rsi {
        match ind.rsi {
            Some(rsi) if rsi < technical.rsi_oversold => momentum += 1,
            Some(rsi) if rsi > technical.rsi_overbought => momentum -= 1,
            Some(_) => {}
            None => diag.record(Recovery::MissingIndicator, "rsi"),
        }
    }
    if technical.use_macd {
        match (ind.macd, ind.macd_signal) {
            (Some(macd), Some(signal)) => momentum += sign(macd - signal),
            _ => diag.record(Recovery::MissingIndicator, "macd"),
        }
    }

    let mut volatility = 0;
    if technical.use_bollinger {
        // a single bar has no prior width to compare against
        if let Some(prev) = prev {
            match (
                ind.bollinger_width(),
                prev.indicators.bollinger_width(),
            ) {
                (Some(width), Some(prev_width)) => {
                    volatility = if width > prev_width { 1 } else { -1 };
                }
                _ => diag.record(Recovery::MissingIndicator, "bollinger"),
            }
        }
    }

    let score = trend as f64 * weights.trend_weight
        + momentum as f64 * weights.momentum_weight
        + volatility as f64 * weights.volatility_weight;

    let bias = if score > weights.signal_threshold {
        MarketBias::Bullish
    } else if score < -weights.signal_threshold {
        MarketBias::Bearish
    } else {
        MarketBias::Neutral
    };

    Some(TechnicalReading {
        trend,
        momentum,
        volatility,
        score,
        bias,
    })
}

fn sign(value: f64) -> i32 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
