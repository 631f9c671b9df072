//! End-to-end pipeline tests: quote source, indicators, aggregation,
//! simulation and report output.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use fusetrader::adapters::csv_report_adapter::{summary_path, CsvReportAdapter};
use fusetrader::domain::aggregator::{latest_recommendation, process_series, AggregationPolicy};
use fusetrader::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use fusetrader::domain::error::FuseError;
use fusetrader::domain::order_book::{Action, ExitThresholds};
use fusetrader::domain::pipeline::{BarInterval, PipelineConfig};
use fusetrader::domain::recommendation::OrderType;
use fusetrader::domain::signal::Signal;
use fusetrader::ports::quote_port::QuoteSource;
use fusetrader::ports::report_port::ReportPort;

fn assert_consistent(result: &BacktestResult) {
    assert_eq!(result.trade_count, result.trades.len());
    assert_eq!(result.records.len(), result.signals.len());
    assert!(result.profitable_trades <= result.trade_count);
    let worst = result
        .trades
        .iter()
        .map(|t| t.trade_return)
        .reduce(f64::min);
    assert_eq!(result.max_drawdown, worst);
    let pnl: f64 = result.trades.iter().map(|t| t.pnl).sum();
    assert_abs_diff_eq!(pnl, result.net, epsilon = 1e-9);
    if result.total_invested > 0.0 {
        assert_abs_diff_eq!(
            result.returns,
            result.net / result.total_invested,
            epsilon = 1e-12
        );
    } else {
        assert_eq!(result.returns, 0.0);
    }
    assert_eq!(
        result.recommendation,
        result
            .records
            .last()
            .map_or(OrderType::None, |r| r.recommendation.recommendation)
    );

    // Book transitions alternate, starting from flat.
    let transitions: Vec<OrderType> = result.records.iter().filter_map(|r| r.signal).collect();
    for (i, signal) in transitions.iter().enumerate() {
        let expected = if i % 2 == 0 {
            OrderType::Buy
        } else {
            OrderType::Sell
        };
        assert_eq!(*signal, expected);
    }
}

mod full_pipeline {
    use super::*;

    #[test]
    fn plunge_triggers_bollinger_buy_signal() {
        let bars = generate_bars("BHP", &plunge(100));
        let result = run_backtest(&bars, &BacktestConfig::default()).unwrap();

        assert_eq!(result.records.len(), 21);
        let last = result.records.last().unwrap();
        assert_eq!(last.close, 100.0);
        assert_eq!(last.recommendation.bband, Signal::Bullish);
        assert_consistent(&result);
    }

    #[test]
    fn steady_uptrend_stays_flat() {
        // a +1/bar climb stays inside the 80-bar bands, never crosses ROC
        // zero and pins MFI at 100, so no rule ever opens a position
        let bars = generate_bars("BHP", &ramp(100));
        for policy in [AggregationPolicy::Intraday, AggregationPolicy::TrailingWindow] {
            let config = BacktestConfig {
                policy,
                ..Default::default()
            };
            let result = run_backtest(&bars, &config).unwrap();

            assert_eq!(result.records.len(), 21);
            assert!(result.records.iter().all(|r| {
                r.recommendation.bband != Signal::Bullish && r.recommendation.roc != Signal::Bullish
            }));
            let last = result.records.last().unwrap();
            assert_eq!(last.recommendation.mfi, Signal::Bearish);
            assert_eq!(result.trade_count, 0);
            assert_eq!(result.returns, 0.0);
            assert_eq!(result.max_drawdown, None);
            assert_consistent(&result);
        }
    }

    #[test]
    fn records_cover_every_bar_after_warmup() {
        let bars = generate_bars("BHP", &wave(160));
        let result = run_backtest(&bars, &BacktestConfig::default()).unwrap();

        assert_eq!(result.records.len(), 160 - 79);
        assert_eq!(result.records[0].index, 79);
        assert_eq!(result.records[0].date, bars[79].date);
        assert_eq!(result.code, "BHP");
        assert_eq!(result.exchange, "ASX");
        assert_eq!(result.algo_label, "fusion");
        assert_consistent(&result);
    }

    #[test]
    fn intraday_interval_needs_one_more_bar() {
        let bars = generate_bars("BHP", &wave(160));
        let config = BacktestConfig {
            pipeline: PipelineConfig {
                interval: BarInterval::Intraday,
                ..Default::default()
            },
            policy: AggregationPolicy::Intraday,
            ..Default::default()
        };
        let result = run_backtest(&bars, &config).unwrap();
        assert_eq!(result.records.len(), 160 - 80);
        assert_consistent(&result);

        let short = generate_bars("BHP", &wave(80));
        assert!(matches!(
            run_backtest(&short, &config),
            Err(FuseError::InsufficientHistory {
                bars: 80,
                minimum: 81
            })
        ));
    }

    #[test]
    fn both_policies_stay_consistent() {
        let bars = generate_bars("BHP", &wave(200));
        for policy in [AggregationPolicy::Intraday, AggregationPolicy::TrailingWindow] {
            let config = BacktestConfig {
                policy,
                ..Default::default()
            };
            let result = run_backtest(&bars, &config).unwrap();
            assert_consistent(&result);
        }
    }

    #[test]
    fn runs_are_deterministic() {
        let bars = generate_bars("BHP", &wave(180));
        let config = BacktestConfig::default();
        let first = run_backtest(&bars, &config).unwrap();
        let second = run_backtest(&bars, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn thresholds_only_add_forced_exits() {
        let bars = generate_bars("BHP", &wave(200));
        let config = BacktestConfig {
            thresholds: ExitThresholds {
                loss: Some(-0.02),
                profit: Some(0.02),
            },
            ..Default::default()
        };
        let result = run_backtest(&bars, &config).unwrap();
        assert_consistent(&result);
        for record in &result.records {
            if matches!(record.action, Action::StopLoss | Action::TakeProfit) {
                assert_eq!(record.signal, Some(OrderType::Sell));
            }
        }
        for trade in &result.trades {
            assert!(Some(trade.trade_return) >= result.max_drawdown);
        }
    }
}

mod recommendation {
    use super::*;

    #[test]
    fn latest_matches_final_backtest_record() {
        let bars = generate_bars("BHP", &wave(150));
        let config = BacktestConfig::default();
        let result = run_backtest(&bars, &config).unwrap();
        let latest = latest_recommendation(&bars, &config.pipeline, config.policy).unwrap();
        assert_eq!(Some(latest), result.records.last().map(|r| r.recommendation));
    }

    #[test]
    fn every_snapshot_carries_a_recommendation() {
        let bars = generate_bars("BHP", &wave(120));
        let snapshots =
            process_series(&bars, &PipelineConfig::default(), AggregationPolicy::default())
                .unwrap();
        assert!(snapshots.iter().all(|s| s.recommendation.is_some()));
        assert!(
            snapshots
                .iter()
                .filter(|s| s.index < 80)
                .all(|s| s.mfi_trend.is_none())
        );
    }

    #[test]
    fn latest_rejects_short_history() {
        let bars = generate_bars("BHP", &ramp(40));
        let result =
            latest_recommendation(&bars, &PipelineConfig::default(), AggregationPolicy::default());
        assert!(matches!(result, Err(FuseError::InsufficientHistory { .. })));
    }
}

mod quote_source {
    use super::*;

    #[test]
    fn mock_source_feeds_backtest() {
        let source = MockQuoteSource::new().with_bars("BHP", generate_bars("BHP", &wave(150)));
        let bars = source
            .fetch_bars("BHP", "ASX", Some(date("2024-01-11")), None)
            .unwrap();
        assert_eq!(bars.len(), 140);
        assert_eq!(bars[0].date, date("2024-01-11"));

        let result = run_backtest(&bars, &BacktestConfig::default()).unwrap();
        assert_eq!(result.records.len(), 140 - 79);
        assert_consistent(&result);
    }

    #[test]
    fn range_too_narrow_for_warmup() {
        let source = MockQuoteSource::new().with_bars("BHP", generate_bars("BHP", &wave(150)));
        let bars = source
            .fetch_bars("BHP", "ASX", None, Some(date("2024-01-31")))
            .unwrap();
        assert_eq!(bars.len(), 31);
        assert!(matches!(
            run_backtest(&bars, &BacktestConfig::default()),
            Err(FuseError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn unknown_code_is_no_data() {
        let source = MockQuoteSource::new();
        assert!(matches!(
            source.fetch_bars("XYZ", "ASX", None, None),
            Err(FuseError::NoData { .. })
        ));
    }

    #[test]
    fn source_error_propagates() {
        let source = MockQuoteSource::new().with_error("BHP", "connection reset");
        match source.fetch_bars("BHP", "ASX", None, None) {
            Err(FuseError::Data { reason }) => assert_eq!(reason, "connection reset"),
            other => panic!("expected data error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_bar_is_invalid_input() {
        let mut bars = generate_bars("BHP", &wave(120));
        bars[90].high = bars[90].low - 5.0;
        assert!(matches!(
            run_backtest(&bars, &BacktestConfig::default()),
            Err(FuseError::InvalidInput { index: 90, .. })
        ));
    }
}

mod report_output {
    use super::*;

    #[test]
    fn csv_report_has_row_per_record() {
        let bars = generate_bars("BHP", &wave(130));
        let result = run_backtest(&bars, &BacktestConfig::default()).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("bhp.csv");
        CsvReportAdapter::new().write(&result, &output).unwrap();

        let ledger = std::fs::read_to_string(&output).unwrap();
        assert_eq!(ledger.lines().count(), result.records.len() + 1);

        let summary = std::fs::read_to_string(summary_path(&output)).unwrap();
        let row = summary.lines().nth(1).unwrap();
        assert!(row.starts_with(&format!("fusion,BHP,ASX,{}", result.records.len())));
    }
}
