//! Option contracts and the per-symbol chain snapshot.

use chrono::NaiveDate;

/// Which side of the chain a contract belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionSide {
    Call,
    Put,
}

/// One listed contract. Greeks and liquidity fields may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    pub strike: f64,
    pub expiry: NaiveDate,
    pub last_price: f64,
    pub implied_volatility: Option<f64>,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub open_interest: Option<u64>,
    pub volume: Option<u64>,
}

impl OptionContract {
    /// Contract with a price only; no Greeks, IV or liquidity data.
    pub fn bare(strike: f64, expiry: NaiveDate, last_price: f64) -> Self {
        OptionContract {
            strike,
            expiry,
            last_price,
            implied_volatility: None,
            delta: None,
            gamma: None,
            theta: None,
            vega: None,
            open_interest: None,
            volume: None,
        }
    }

    /// `open_interest >= min_oi && volume >= min_volume`; missing counts as 0.
    pub fn is_liquid(&self, min_open_interest: u64, min_volume: u64) -> bool {
        self.open_interest.unwrap_or(0) >= min_open_interest
            && self.volume.unwrap_or(0) >= min_volume
    }

    pub fn has_greeks(&self) -> bool {
        self.delta.is_some()
    }
}

/// Nearest-expiry chain for one underlying. Calls and puts are kept sorted
/// by ascending strike.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChainSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub expiry: NaiveDate,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionChainSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        current_price: f64,
        expiry: NaiveDate,
        mut calls: Vec<OptionContract>,
        mut puts: Vec<OptionContract>,
    ) -> Self {
        calls.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        puts.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        OptionChainSnapshot {
            symbol: symbol.into(),
            current_price,
            expiry,
            calls,
            puts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }

    /// True when any contract carries a delta.
    pub fn has_greeks(&self) -> bool {
        self.calls.iter().chain(&self.puts).any(OptionContract::has_greeks)
    }

    /// Call with strike nearest the current price.
    pub fn atm_call(&self) -> Option<&OptionContract> {
        nearest_strike(&self.calls, self.current_price)
    }

    pub fn atm_put(&self) -> Option<&OptionContract> {
        nearest_strike(&self.puts, self.current_price)
    }

    pub fn side(&self, side: OptionSide) -> &[OptionContract] {
        match side {
            OptionSide::Call => &self.calls,
            OptionSide::Put => &self.puts,
        }
    }
}

/// Contract with strike nearest `target`. Ties go to the lower strike.
pub fn nearest_strike<'a>(
    contracts: &'a [OptionContract],
    target: f64,
) -> Option<&'a OptionContract> {
    contracts.iter().min_by(|a, b| {
        (a.strike - target)
            .abs()
            .total_cmp(&(b.strike - target).abs())
            .then(a.strike.total_cmp(&b.strike))
    })
}

/// Nearest strike strictly further out of the money than `strike`:
/// above it for calls, below it for puts.
pub fn next_further_otm<'a>(
    contracts: impl IntoIterator<Item = &'a OptionContract>,
    side: OptionSide,
    strike: f64,
) -> Option<&'a OptionContract> {
    let further = contracts.into_iter();
    match side {
        OptionSide::Call => further
            .filter(|c| c.strike > strike)
            .min_by(|a, b| a.strike.total_cmp(&b.strike)),
        OptionSide::Put => further
            .filter(|c| c.strike < strike)
            .max_by(|a, b| a.strike.total_cmp(&b.strike)),
    }
}
