//! CSV file data adapter.
//!
//! Reads `<SYMBOL>_bars.csv` and `<SYMBOL>_chain.csv` from a directory.
//! Columns are addressed by header name, case-insensitively; blank cells
//! are missing values.

use crate::domain::error::OptitraderError;
use crate::domain::option_chain::{OptionChainSnapshot, OptionContract};
use crate::domain::price_bar::{BarSignal, PriceBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const BARS_SUFFIX: &str = "_bars.csv";
const CHAIN_SUFFIX: &str = "_chain.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn bars_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}{BARS_SUFFIX}"))
    }

    fn chain_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}{CHAIN_SUFFIX}"))
    }
}

fn data_error(reason: String) -> OptitraderError {
    OptitraderError::Data { reason }
}

fn read_file(path: &Path, symbol: &str) -> Result<String, OptitraderError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => OptitraderError::NoData {
            symbol: symbol.to_string(),
        },
        _ => data_error(format!("failed to read {}: {}", path.display(), e)),
    })
}

/// Header name (lower-cased) to column index.
struct Columns {
    index: HashMap<String, usize>,
    file: String,
}

impl Columns {
    fn new(headers: &csv::StringRecord, file: &Path) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        Columns {
            index,
            file: file.display().to_string(),
        }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        let i = *self.index.get(name)?;
        record.get(i).map(str::trim).filter(|v| !v.is_empty())
    }

    fn required<'r>(
        &self,
        record: &'r csv::StringRecord,
        name: &str,
    ) -> Result<&'r str, OptitraderError> {
        if !self.has(name) {
            return Err(data_error(format!("{}: missing {} column", self.file, name)));
        }
        self.cell(record, name)
            .ok_or_else(|| data_error(format!("{}: blank {} value", self.file, name)))
    }

    fn required_f64(&self, record: &csv::StringRecord, name: &str) -> Result<f64, OptitraderError> {
        let raw = self.required(record, name)?;
        self.parse_f64(name, raw)
    }

    fn optional_f64(
        &self,
        record: &csv::StringRecord,
        name: &str,
    ) -> Result<Option<f64>, OptitraderError> {
        self.cell(record, name)
            .map(|raw| self.parse_f64(name, raw))
            .transpose()
    }

    /// Counts may be written as floats ("120.0"); negatives are rejected.
    fn optional_count(
        &self,
        record: &csv::StringRecord,
        name: &str,
    ) -> Result<Option<u64>, OptitraderError> {
        match self.optional_f64(record, name)? {
            None => Ok(None),
            Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v as u64)),
            Some(v) => Err(data_error(format!("{}: invalid {} value: {}", self.file, name, v))),
        }
    }

    fn parse_f64(&self, name: &str, raw: &str) -> Result<f64, OptitraderError> {
        raw.parse()
            .map_err(|e| data_error(format!("{}: invalid {} value {:?}: {}", self.file, name, raw, e)))
    }

    fn date(&self, record: &csv::StringRecord, name: &str) -> Result<NaiveDate, OptitraderError> {
        let raw = self.required(record, name)?;
        // Accept timestamps such as "2024-01-15 00:00:00".
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| data_error(format!("{}: invalid date {:?}: {}", self.file, raw, e)))
    }

    /// Periods of every `<prefix><n>` or `<prefix>_<n>` column, e.g. `sma20`, `sma_50`.
    fn periods(&self, prefix: &str) -> Vec<(usize, String)> {
        let mut out: Vec<(usize, String)> = self
            .index
            .keys()
            .filter_map(|k| {
                let n = k.strip_prefix(prefix)?.trim_start_matches('_').parse().ok()?;
                Some((n, k.clone()))
            })
            .collect();
        out.sort();
        out
    }
}

const INDICATOR_COLUMNS: [&str; 6] = ["macd", "macd_signal", "rsi", "bb_upper", "bb_middle", "bb_lower"];

fn parse_bars(content: &str, path: &Path) -> Result<PriceSeries, OptitraderError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| data_error(format!("{}: CSV parse error: {}", path.display(), e)))?
        .clone();
    let cols = Columns::new(&headers, path);

    let sma_cols = cols.periods("sma");
    let ema_cols = cols.periods("ema");
    let has_indicators = !sma_cols.is_empty()
        || !ema_cols.is_empty()
        || INDICATOR_COLUMNS.iter().any(|c| cols.has(c));
    let has_signals = cols.has("signal");

    let mut bars = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| data_error(format!("{}: CSV parse error: {}", path.display(), e)))?;

        let volume = cols.required_f64(&record, "volume")?;
        let mut bar = PriceBar::new(
            cols.date(&record, "date")?,
            cols.required_f64(&record, "open")?,
            cols.required_f64(&record, "high")?,
            cols.required_f64(&record, "low")?,
            cols.required_f64(&record, "close")?,
            volume as i64,
        );

        for (period, name) in &sma_cols {
            if let Some(v) = cols.optional_f64(&record, name)? {
                bar.indicators.sma.insert(*period, v);
            }
        }
        for (period, name) in &ema_cols {
            if let Some(v) = cols.optional_f64(&record, name)? {
                bar.indicators.ema.insert(*period, v);
            }
        }
        bar.indicators.macd = cols.optional_f64(&record, "macd")?;
        bar.indicators.macd_signal = cols.optional_f64(&record, "macd_signal")?;
        bar.indicators.rsi = cols.optional_f64(&record, "rsi")?;
        bar.indicators.bb_upper = cols.optional_f64(&record, "bb_upper")?;
        bar.indicators.bb_middle = cols.optional_f64(&record, "bb_middle")?;
        bar.indicators.bb_lower = cols.optional_f64(&record, "bb_lower")?;
        if let Some(signal) = cols.optional_f64(&record, "signal")? {
            bar.signal = BarSignal::from_int(signal as i64);
        }

        bars.push(bar);
    }

    bars.sort_by_key(|b| b.date);
    Ok(PriceSeries {
        bars,
        has_indicators,
        has_signals,
    })
}

fn parse_chain(
    content: &str,
    path: &Path,
    symbol: &str,
    current_price: f64,
) -> Result<OptionChainSnapshot, OptitraderError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| data_error(format!("{}: CSV parse error: {}", path.display(), e)))?
        .clone();
    let cols = Columns::new(&headers, path);

    let mut rows: Vec<(bool, OptionContract)> = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| data_error(format!("{}: CSV parse error: {}", path.display(), e)))?;

        let is_call = match cols.required(&record, "type")?.to_lowercase().as_str() {
            "call" | "c" => true,
            "put" | "p" => false,
            other => {
                return Err(data_error(format!(
                    "{}: unknown option type {:?}",
                    path.display(),
                    other
                )));
            }
        };

        let contract = OptionContract {
            strike: cols.required_f64(&record, "strike")?,
            expiry: cols.date(&record, "expiry")?,
            last_price: cols.required_f64(&record, "lastprice")?,
            implied_volatility: cols.optional_f64(&record, "impliedvolatility")?,
            delta: cols.optional_f64(&record, "delta")?,
            gamma: cols.optional_f64(&record, "gamma")?,
            theta: cols.optional_f64(&record, "theta")?,
            vega: cols.optional_f64(&record, "vega")?,
            open_interest: cols.optional_count(&record, "openinterest")?,
            volume: cols.optional_count(&record, "volume")?,
        };
        rows.push((is_call, contract));
    }

    let Some(expiry) = rows.iter().map(|(_, c)| c.expiry).min() else {
        return Err(OptitraderError::NoData {
            symbol: symbol.to_string(),
        });
    };

    let (calls, puts): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .filter(|(_, c)| c.expiry == expiry)
        .partition(|(is_call, _)| *is_call);

    Ok(OptionChainSnapshot::new(
        symbol.to_string(),
        current_price,
        expiry,
        calls.into_iter().map(|(_, c)| c).collect(),
        puts.into_iter().map(|(_, c)| c).collect(),
    ))
}

impl DataPort for CsvAdapter {
    fn fetch_price_bars(&self, symbol: &str) -> Result<PriceSeries, OptitraderError> {
        let path = self.bars_path(symbol);
        let content = read_file(&path, symbol)?;
        parse_bars(&content, &path)
    }

    fn fetch_option_chain(
        &self,
        symbol: &str,
        current_price: f64,
    ) -> Result<OptionChainSnapshot, OptitraderError> {
        let path = self.chain_path(symbol);
        let content = read_file(&path, symbol)?;
        parse_chain(&content, &path, symbol, current_price)
    }

    fn list_symbols(&self) -> Result<Vec<String>, OptitraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(BARS_SUFFIX) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("SPY_bars.csv"),
            "Date,Open,High,Low,Close,Volume,SMA20,SMA50,RSI,MACD,MACD_Signal,Signal\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000,108.0,,55.0,0.4,0.3,1\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000,,,,,,0\n",
        )
        .unwrap();
        fs::write(
            path.join("QQQ_bars.csv"),
            "date,open,high,low,close,volume\n2024-01-15,1,2,0.5,1.5,100\n",
        )
        .unwrap();
        fs::write(
            path.join("SPY_chain.csv"),
            "type,strike,expiry,lastPrice,impliedVolatility,delta,gamma,theta,vega,openInterest,volume\n\
             call,110,2024-02-16,2.5,0.22,0.52,0.04,-0.05,0.1,1200.0,300\n\
             call,105,2024-02-16,5.1,0.24,0.71,0.03,-0.04,0.1,800,\n\
             put,110,2024-02-16,2.3,0.23,-0.48,0.04,-0.05,0.1,900,120\n\
             call,110,2024-03-15,4.0,0.25,0.55,0.03,-0.03,0.2,100,10\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_reads_named_columns() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_price_bars("SPY").unwrap();
        assert!(series.has_indicators);
        assert!(series.has_signals);
        assert_eq!(series.bars.len(), 2);

        // sorted by date
        let bar = &series.bars[1];
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(bar.close, 110.0);
        assert_eq!(bar.volume, 60000);
        assert_eq!(bar.indicators.sma.get(&20), Some(&108.0));
        assert_eq!(bar.indicators.sma.get(&50), None);
        assert_eq!(bar.indicators.rsi, Some(55.0));
        assert_eq!(bar.indicators.macd_signal, Some(0.3));
        assert_eq!(bar.indicators.bb_upper, None);
        assert_eq!(bar.signal, BarSignal::Buy);
        assert!(series.bars[0].indicators.is_empty());
    }

    #[test]
    fn underscored_period_columns_are_read() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("IWM_bars.csv"),
            "Date,Open,High,Low,Close,Volume,SMA_20,SMA_50,EMA_12,RSI,MACD,MACD_Signal,BB_Upper,BB_Middle,BB_Lower,Signal\n\
             2024-01-15,100,110,90,105,50000,105.0,101.5,104.2,55,0.4,0.3,112,105,98,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_price_bars("IWM").unwrap();
        assert!(series.has_indicators);
        let ind = &series.bars[0].indicators;
        assert_eq!(ind.sma.get(&20), Some(&105.0));
        assert_eq!(ind.sma.get(&50), Some(&101.5));
        assert_eq!(ind.ema.get(&12), Some(&104.2));
        assert_eq!(ind.bb_lower, Some(98.0));
    }

    #[test]
    fn bare_ohlcv_table_has_no_derived_columns() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_price_bars("QQQ").unwrap();
        assert!(!series.has_indicators);
        assert!(!series.has_signals);
        assert_eq!(series.bars[0].signal, BarSignal::Hold);
    }

    #[test]
    fn missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_price_bars("XYZ");
        assert!(matches!(result, Err(OptitraderError::NoData { .. })));
        let result = adapter.fetch_option_chain("QQQ", 1.5);
        assert!(matches!(result, Err(OptitraderError::NoData { .. })));
    }

    #[test]
    fn malformed_value_is_data_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD_bars.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,2,0.5,1.5,100\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_price_bars("BAD").unwrap_err();
        assert!(matches!(err, OptitraderError::Data { .. }));
        assert!(err.to_string().contains("open"));
    }

    #[test]
    fn missing_required_column_is_data_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD_bars.csv"),
            "date,open,high,low,volume\n2024-01-15,1,2,0.5,100\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_price_bars("BAD").unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }

    #[test]
    fn chain_keeps_nearest_expiry() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let chain = adapter.fetch_option_chain("SPY", 110.0).unwrap();
        assert_eq!(chain.expiry, NaiveDate::from_ymd_opt(2024, 2, 16).unwrap());
        assert_eq!(chain.current_price, 110.0);
        assert_eq!(chain.calls.len(), 2);
        assert_eq!(chain.puts.len(), 1);
        // sorted by strike
        assert_eq!(chain.calls[0].strike, 105.0);
        assert_eq!(chain.calls[1].open_interest, Some(1200));
        assert_eq!(chain.calls[0].volume, None);
        assert_eq!(chain.puts[0].delta, Some(-0.48));
        assert!(chain.has_greeks());
    }

    #[test]
    fn unknown_option_type_is_rejected() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD_chain.csv"),
            "type,strike,expiry,lastPrice\nstraddle,100,2024-02-16,1.0\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_option_chain("BAD", 100.0).unwrap_err();
        assert!(err.to_string().contains("unknown option type"));
    }

    #[test]
    fn empty_chain_is_no_data() {
        let (_dir, path) = setup_test_data();
        fs::write(path.join("QQQ_chain.csv"), "type,strike,expiry,lastPrice\n").unwrap();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_option_chain("QQQ", 1.5);
        assert!(matches!(result, Err(OptitraderError::NoData { .. })));
    }

    #[test]
    fn list_symbols_from_bar_files() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["QQQ", "SPY"]);
    }
}
