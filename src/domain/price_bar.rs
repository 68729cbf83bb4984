//! Price bar representation with precomputed indicator columns.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-bar directional signal produced upstream: buy (+1), sell (-1) or hold (0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BarSignal {
    Sell,
    #[default]
    Hold,
    Buy,
}

impl BarSignal {
    /// Normalise any integer to its sign.
    pub fn from_int(value: i64) -> Self {
        match value.signum() {
            1 => BarSignal::Buy,
            -1 => BarSignal::Sell,
            _ => BarSignal::Hold,
        }
    }

    pub fn as_int(self) -> i8 {
        match self {
            BarSignal::Sell => -1,
            BarSignal::Hold => 0,
            BarSignal::Buy => 1,
        }
    }
}

/// Indicator columns attached to a bar. `None` marks warm-up or a missing column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indicators {
    pub sma: BTreeMap<usize, f64>,
    pub ema: BTreeMap<usize, f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl Indicators {
    /// (upper - lower) / middle, when all three bands are present and middle is non-zero.
    pub fn bollinger_width(&self) -> Option<f64> {
        let (upper, middle, lower) = (self.bb_upper?, self.bb_middle?, self.bb_lower?);
        if middle == 0.0 {
            return None;
        }
        Some((upper - lower) / middle)
    }

    pub fn is_empty(&self) -> bool {
        self.sma.is_empty()
            && self.ema.is_empty()
            && self.macd.is_none()
            && self.macd_signal.is_none()
            && self.rsi.is_none()
            && self.bb_upper.is_none()
            && self.bb_middle.is_none()
            && self.bb_lower.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub indicators: Indicators,
    pub signal: BarSignal,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: i64) -> Self {
        PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume,
            indicators: Indicators::default(),
            signal: BarSignal::Hold,
        }
    }
}

/// A loaded bar table and which derived columns it already carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    pub bars: Vec<PriceBar>,
    pub has_indicators: bool,
    pub has_signals: bool,
}

impl PriceSeries {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
