//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::StrategyConfig;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::error::OptitraderError;
use crate::domain::universe::{
    SkippedSymbol, UniverseReport, load_inputs, parse_symbols, prepare_bars, run_universe,
    select_signal,
};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "optitrader", about = "Options strategy selection and backtesting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Select a strategy per symbol and replay it over the price history
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>_bars.csv and <SYMBOL>_chain.csv
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated symbols; defaults to every symbol in --data
        #[arg(long)]
        symbols: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the current strategy signal for each symbol
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Load and validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            symbols,
            output,
        } => run_backtest(&config, &data, symbols.as_deref(), output.as_deref()),
        Command::Signals {
            config,
            data,
            symbols,
        } => run_signals(&config, &data, symbols.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data } => run_list_symbols(&data),
    }
}

fn fail(err: &OptitraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Loads and validates the INI file at `path`.
pub fn load_config(path: &Path) -> Result<StrategyConfig, ExitCode> {
    FileConfigAdapter::from_file(path)
        .and_then(|adapter| adapter.strategy_config())
        .map_err(|e| fail(&e))
}

/// `--symbols` when given, otherwise every symbol the data port knows.
pub fn resolve_symbols(
    symbols: Option<&str>,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, ExitCode> {
    let resolved = match symbols {
        Some(list) => parse_symbols(list).map_err(|e| {
            eprintln!("error: invalid --symbols: {e}");
            ExitCode::from(2)
        })?,
        None => data_port.list_symbols().map_err(|e| fail(&e))?,
    };
    if resolved.is_empty() {
        return Err(fail(&OptitraderError::Data {
            reason: "no symbols to process".into(),
        }));
    }
    Ok(resolved)
}

fn run_backtest(
    config_path: &Path,
    data_dir: &Path,
    symbols: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match resolve_symbols(symbols, &data_port) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let output = output.map_or_else(|| PathBuf::from("reports"), Path::to_path_buf);
    let report_port = CsvReportAdapter::new(output.clone());

    match run_backtest_pipeline(&data_port, &report_port, &config, &symbols) {
        Ok(_) => {
            eprintln!("\nReports written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Load, run and report a universe; prints a console summary to stderr.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    config: &StrategyConfig,
    symbols: &[String],
) -> Result<UniverseReport, OptitraderError> {
    eprintln!("Running options backtest: {} symbols", symbols.len());
    let inputs = load_inputs(data_port, symbols);
    let report = run_universe(inputs, config);

    print_summary(&report);
    report_port.write(&report)?;
    Ok(report)
}

fn print_summary(report: &UniverseReport) {
    if !report.records.is_empty() {
        eprintln!("\n=== Per-Symbol Results ===");
    }
    for (symbol, record) in &report.records {
        let exits: Vec<String> = record
            .exit_reason_counts
            .iter()
            .map(|(reason, n)| format!("{reason}: {n}"))
            .collect();
        eprintln!(
            "  {}  {:<18} return {:>7.2}%  drawdown {:>7.2}%  sharpe {:>6.2}  trades {} ({:.0}% won)  [{}]",
            symbol,
            record.strategy_kind,
            record.total_return_pct,
            record.max_drawdown_pct,
            record.sharpe_ratio,
            record.trades.len(),
            record.win_rate() * 100.0,
            exits.join(", "),
        );
    }
    print_skipped(&report.skipped);
    print_diagnostics(&report.diagnostics);
}

fn print_skipped(skipped: &[SkippedSymbol]) {
    if skipped.is_empty() {
        return;
    }
    eprintln!("\n=== Skipped ===");
    for s in skipped {
        eprintln!("  {}: {}", s.symbol, s.reason);
    }
}

fn print_diagnostics(diag: &Diagnostics) {
    if diag.total() == 0 {
        return;
    }
    eprintln!("\n=== Recoveries ===");
    for (recovery, count) in diag.iter() {
        eprintln!("  {recovery}: {count}");
    }
}

fn run_signals(config_path: &Path, data_dir: &Path, symbols: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match resolve_symbols(symbols, &data_port) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let mut diag = Diagnostics::new();
    let mut skipped = Vec::new();
    for input in load_inputs(&data_port, &symbols) {
        let bars = prepare_bars(input.series.clone(), &config);
        match select_signal(&input, &bars, &config, &mut diag) {
            Ok(signal) => {
                println!(
                    "{}\t{}\t{}\tx{}\t{}",
                    signal.symbol,
                    signal.kind(),
                    signal.bias,
                    signal.contracts,
                    signal.legs.describe()
                );
                if let Some(profile) = signal.profit_profile() {
                    let max_profit = profile
                        .max_profit
                        .map_or_else(|| "unlimited".to_string(), |v| format!("{v:.2}"));
                    let breakevens: Vec<String> =
                        profile.breakevens.iter().map(|b| format!("{b:.2}")).collect();
                    println!(
                        "\tmax loss {:.2}  max profit {}  breakeven {}",
                        profile.max_loss,
                        max_profit,
                        breakevens.join(" / ")
                    );
                }
            }
            Err(reason) => skipped.push(SkippedSymbol {
                symbol: input.symbol,
                reason,
            }),
        }
    }
    print_skipped(&skipped);
    print_diagnostics(&diag);
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    eprintln!("  risk capital:      {:.2}", config.risk_capital());
    eprintln!("  default strategy:  {}", config.options.default_strategy);
    eprintln!("  greek optimized:   {}", config.options.use_greek_optimization);
    eprintln!(
        "  exits:             stop {:.0}%, target {:.0}%, max {} days",
        config.options.stop_loss_pct * 100.0,
        config.options.take_profit_pct * 100.0,
        config.options.max_days_to_hold
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match data_port.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
