//! Market data port.

use crate::domain::error::OptitraderError;
use crate::domain::option_chain::OptionChainSnapshot;
use crate::domain::price_bar::PriceSeries;

pub trait DataPort {
    /// Time-ordered bars for `symbol`. `NoData` when the source has none.
    fn fetch_price_bars(&self, symbol: &str) -> Result<PriceSeries, OptitraderError>;

    /// Nearest-expiry chain snapshot priced against `current_price`.
    fn fetch_option_chain(
        &self,
        symbol: &str,
        current_price: f64,
    ) -> Result<OptionChainSnapshot, OptitraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, OptitraderError>;
}
