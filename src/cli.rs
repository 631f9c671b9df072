//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{summary_path, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregator::{latest_recommendation, AggregationPolicy};
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    optional_double, require_string, validate_backtest_config, validate_config, validate_dates,
    validate_indicator_config,
};
use crate::domain::error::FuseError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::order_book::ExitThresholds;
use crate::domain::pattern::flag_pennant::FlagPennantConfig;
use crate::domain::pattern::support_resistance::SupportResistanceConfig;
use crate::domain::pipeline::{BarInterval, PipelineConfig};
use crate::domain::recommendation::SignalKey;
use crate::domain::signal::Signal;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuoteSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "fusetrader", about = "Indicator fusion signals and backtests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the configured quotes
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the per-bar ledger here, plus a summary beside it
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
    /// Print the recommendation for the most recent bar
    Recommend {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Where and what to load quotes for.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub path: PathBuf,
    pub code: String,
    pub exchange: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            code,
            exchange,
        } => run_backtest(
            &config,
            output.as_ref(),
            code.as_deref(),
            exchange.as_deref(),
        ),
        Command::Recommend {
            config,
            code,
            exchange,
        } => run_recommend(&config, code.as_deref(), exchange.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate and build run settings
    let (request, bt_config) =
        match prepare_run(&adapter, code_override, exchange_override) {
            Ok(prepared) => prepared,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

    // Stage 3: Load quotes
    let bars = match load_bars(&request) {
        Ok(bars) => bars,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Run backtest
    eprintln!(
        "Running backtest: {}.{} ({} bars, {} policy, {} interval)",
        request.code,
        request.exchange,
        bars.len(),
        bt_config.policy,
        bt_config.pipeline.interval,
    );
    let result = match backtest_engine::run_backtest(&bars, &bt_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Print console summary to stderr
    print_summary(&result);

    // Stage 6: Write report
    if let Some(output) = output_path {
        if let Err(e) = CsvReportAdapter::new().write(&result, output) {
            eprintln!("error: failed to write report: {e}");
            return (&e).into();
        }
        eprintln!("\nReport written to: {}", output.display());
        eprintln!("Summary written to: {}", summary_path(output).display());
    }

    ExitCode::SUCCESS
}

fn run_recommend(
    config_path: &PathBuf,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (request, bt_config) =
        match prepare_run(&adapter, code_override, exchange_override) {
            Ok(prepared) => prepared,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

    let bars = match load_bars(&request) {
        Ok(bars) => bars,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let recommendation =
        match latest_recommendation(&bars, &bt_config.pipeline, bt_config.policy) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

    let date = bars.last().map(|b| b.date.to_string()).unwrap_or_default();
    println!(
        "{}.{} {}: {}",
        request.code, request.exchange, date, recommendation.recommendation
    );
    for (key, signal) in recommendation.signals() {
        if signal != Signal::Neutral {
            println!("  {:<16} {}", key.name(), signal);
        }
    }

    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Config validated successfully");
    eprintln!("  algo_label: {}", bt_config.algo_label);
    eprintln!("  policy:     {}", bt_config.policy);
    eprintln!("  interval:   {}", bt_config.pipeline.interval);
    eprintln!(
        "  min bars:   {}",
        bt_config.pipeline.interval.required_bars()
    );
    ExitCode::SUCCESS
}

fn prepare_run(
    adapter: &dyn ConfigPort,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> Result<(DataRequest, BacktestConfig), FuseError> {
    validate_backtest_config(adapter)?;
    validate_indicator_config(adapter)?;
    let request = resolve_data_request(adapter, code_override, exchange_override)?;
    let bt_config = build_backtest_config(adapter)?;
    Ok((request, bt_config))
}

fn load_bars(request: &DataRequest) -> Result<Vec<PriceBar>, FuseError> {
    eprintln!(
        "Loading quotes for {}.{} from {}",
        request.code,
        request.exchange,
        request.path.display()
    );
    CsvAdapter::new(request.path.clone()).fetch_bars(
        &request.code,
        &request.exchange,
        request.start_date,
        request.end_date,
    )
}

/// `[data]` settings, with command-line overrides taking precedence.
pub fn resolve_data_request(
    config: &dyn ConfigPort,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> Result<DataRequest, FuseError> {
    let path = require_string(config, "data", "path")?;
    let code = match code_override {
        Some(code) => code.trim().to_string(),
        None => require_string(config, "data", "code")?,
    };
    let exchange = match exchange_override {
        Some(exchange) => exchange.trim().to_string(),
        None => require_string(config, "data", "exchange")?,
    };
    let (start_date, end_date) = validate_dates(config)?;

    Ok(DataRequest {
        path: PathBuf::from(path),
        code,
        exchange,
        start_date,
        end_date,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, FuseError> {
    let defaults = BacktestConfig::default();

    let policy = match adapter.get_string("backtest", "policy") {
        Some(value) => value
            .parse::<AggregationPolicy>()
            .map_err(|reason| FuseError::ConfigInvalid {
                section: "backtest".into(),
                key: "policy".into(),
                reason,
            })?,
        None => defaults.policy,
    };
    let interval = match adapter.get_string("backtest", "interval") {
        Some(value) => value
            .parse::<BarInterval>()
            .map_err(|reason| FuseError::ConfigInvalid {
                section: "backtest".into(),
                key: "interval".into(),
                reason,
            })?,
        None => BarInterval::default(),
    };

    let levels_default = SupportResistanceConfig::default();
    let flag_default = FlagPennantConfig::default();
    let pipeline = PipelineConfig {
        interval,
        levels: SupportResistanceConfig {
            window: config_usize(adapter, "swing_window", levels_default.window),
            tolerance: adapter.get_double(
                "indicators",
                "cluster_tolerance",
                levels_default.tolerance,
            ),
            max_levels: config_usize(adapter, "max_levels", levels_default.max_levels),
        },
        flag: FlagPennantConfig {
            formation_period: config_usize(
                adapter,
                "formation_period",
                flag_default.formation_period,
            ),
            trend_period: config_usize(adapter, "trend_period", flag_default.trend_period),
            convergence_threshold: adapter.get_double(
                "indicators",
                "convergence_threshold",
                flag_default.convergence_threshold,
            ),
            steepness_threshold: adapter.get_double(
                "indicators",
                "steepness_threshold",
                flag_default.steepness_threshold,
            ),
        },
    };

    Ok(BacktestConfig {
        algo_label: adapter
            .get_string("backtest", "algo_label")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.algo_label),
        policy,
        pipeline,
        thresholds: ExitThresholds {
            loss: optional_double(adapter, "backtest", "loss_threshold")?,
            profit: optional_double(adapter, "backtest", "profit_threshold")?,
        },
    })
}

fn config_usize(adapter: &dyn ConfigPort, key: &str, default: usize) -> usize {
    adapter
        .get_int("indicators", key, default as i64)
        .max(1) as usize
}

fn format_keys(keys: &[SignalKey]) -> String {
    if keys.is_empty() {
        return "-".into();
    }
    keys.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
}

fn print_summary(result: &BacktestResult) {
    eprintln!("\n=== Backtest Results ({}) ===", result.algo_label);
    eprintln!("Net:              {:.2}", result.net);
    eprintln!("Total Invested:   {:.2}", result.total_invested);
    eprintln!("Returns:          {:.2}%", result.returns * 100.0);
    eprintln!("Total Trades:     {}", result.trade_count);
    eprintln!("Profitable:       {}", result.profitable_trades);
    match result.max_drawdown {
        Some(worst) => eprintln!("Max Drawdown:     {:.1}%", worst * 100.0),
        None => eprintln!("Max Drawdown:     -"),
    }
    eprintln!("Average Move:     {:.4}", result.average_move);
    eprintln!("Open Lots:        {}", result.open_lots.len());
    eprintln!("Recommendation:   {}", result.recommendation);
    eprintln!("Buy Signals:      {}", format_keys(&result.buy_signals));
    eprintln!("Sell Signals:     {}", format_keys(&result.sell_signals));
}
