#![allow(dead_code)]

use chrono::NaiveDate;
use optitrader::domain::error::OptitraderError;
use optitrader::domain::option_chain::{OptionChainSnapshot, OptionContract};
use optitrader::domain::price_bar::{BarSignal, PriceBar, PriceSeries};
use optitrader::domain::technical::MarketBias;
use optitrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub series: HashMap<String, PriceSeries>,
    pub chains: HashMap<String, OptionChainSnapshot>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            chains: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.series.insert(symbol.to_string(), series(bars));
        self
    }

    pub fn with_chain(mut self, symbol: &str, chain: OptionChainSnapshot) -> Self {
        self.chains.insert(symbol.to_string(), chain);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_price_bars(&self, symbol: &str) -> Result<PriceSeries, OptitraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(OptitraderError::Data {
                reason: reason.clone(),
            });
        }
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| OptitraderError::NoData {
                symbol: symbol.to_string(),
            })
    }

    fn fetch_option_chain(
        &self,
        symbol: &str,
        current_price: f64,
    ) -> Result<OptionChainSnapshot, OptitraderError> {
        let mut chain = self
            .chains
            .get(symbol)
            .cloned()
            .ok_or_else(|| OptitraderError::NoData {
                symbol: symbol.to_string(),
            })?;
        chain.current_price = current_price;
        Ok(chain)
    }

    fn list_symbols(&self) -> Result<Vec<String>, OptitraderError> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(offset)
}

pub fn expiry() -> NaiveDate {
    date(45)
}

/// Daily bars; `signals` shorter than `closes` pads with hold.
pub fn make_bars(closes: &[f64], signals: &[i64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let mut bar = PriceBar::new(date(i as i64), close, close + 1.0, close - 1.0, close, 10_000);
            bar.signal = BarSignal::from_int(signals.get(i).copied().unwrap_or(0));
            bar
        })
        .collect()
}

/// Sets the last two bars' indicators so the analyzer reads `bias`.
pub fn with_bias(mut bars: Vec<PriceBar>, bias: MarketBias) -> Vec<PriceBar> {
    let n = bars.len();
    assert!(n >= 2, "need two bars to read a bias");
    let (trend, macd_delta, widening) = match bias {
        MarketBias::Bullish => (1.0, 0.5, true),
        MarketBias::Bearish => (-1.0, -0.5, false),
        // trend +0.4, volatility -0.3: score 0.1
        MarketBias::Neutral => (1.0, 0.0, false),
    };
    for (k, bar) in bars[n - 2..].iter_mut().enumerate() {
        let close = bar.close;
        let ind = &mut bar.indicators;
        ind.sma.insert(20, close + trend);
        ind.sma.insert(50, close);
        ind.rsi = Some(50.0);
        ind.macd = Some(macd_delta);
        ind.macd_signal = Some(0.0);
        let half_width = match (k, widening) {
            (1, true) => 6.0,
            (1, false) => 4.0,
            _ => 5.0,
        };
        ind.bb_upper = Some(close + half_width);
        ind.bb_middle = Some(close);
        ind.bb_lower = Some(close - half_width);
    }
    bars
}

pub fn series(bars: Vec<PriceBar>) -> PriceSeries {
    PriceSeries {
        bars,
        has_indicators: true,
        has_signals: true,
    }
}

pub fn contract(strike: f64, price: f64, iv: Option<f64>) -> OptionContract {
    OptionContract {
        implied_volatility: iv,
        open_interest: Some(1_000),
        volume: Some(100),
        ..OptionContract::bare(strike, expiry(), price)
    }
}

pub fn greek_contract(strike: f64, price: f64, delta: f64, gamma: f64, theta: f64) -> OptionContract {
    OptionContract {
        delta: Some(delta),
        gamma: Some(gamma),
        theta: Some(theta),
        vega: Some(0.1),
        ..contract(strike, price, Some(0.25))
    }
}

/// Strikes 90..=110 by 5 around a 100 spot, no Greeks. ATM legs carry `atm_iv`.
pub fn rule_chain(symbol: &str, atm_iv: f64) -> OptionChainSnapshot {
    let iv = |strike: f64| if strike == 100.0 { Some(atm_iv) } else { Some(0.2) };
    let calls = [(90.0, 10.5), (95.0, 6.2), (100.0, 2.5), (105.0, 1.1), (110.0, 0.4)]
        .iter()
        .map(|&(k, p)| contract(k, p, iv(k)))
        .collect();
    let puts = [(90.0, 0.3), (95.0, 0.8), (100.0, 2.0), (105.0, 5.6), (110.0, 10.2)]
        .iter()
        .map(|&(k, p)| contract(k, p, iv(k)))
        .collect();
    OptionChainSnapshot::new(symbol, 100.0, expiry(), calls, puts)
}
