use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use yave_backtest::{
    dynamic_lot_size, run_backtest, walk_forward_validate, BacktestConfig, Candle, EmaCrossover,
    ExitReason, ParameterGrid, ParameterSet, Side, Signal, SignalSource, ValidationError,
    WalkForwardConfig, WalkForwardOutcome, WalkForwardValidator, PROFIT_FACTOR_SENTINEL,
};

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn candle(i: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
    Candle::new(base_time() + Duration::minutes(15 * i), open, high, low, close)
}

fn no_trailing() -> BacktestConfig {
    BacktestConfig {
        trail_activation_points: Decimal::ZERO,
        ..Default::default()
    }
}

/// Hourly triangle wave: 0.10 per candle, turning every 40 candles.
fn triangle_wave(n: usize) -> Vec<Candle> {
    let mut prev = Decimal::new(200_000, 2);
    (0..n)
        .map(|i| {
            let offset = ((i % 80) as i64 - 40).abs() * 10;
            let close = Decimal::new(200_000 + offset, 2);
            let open = prev;
            prev = close;
            Candle::new(
                base_time() + Duration::hours(i as i64),
                open,
                open.max(close) + dec!(0.05),
                open.min(close) - dec!(0.05),
                close,
            )
        })
        .collect()
}

#[test]
fn take_profit_hit_at_target_price() {
    let candles = vec![
        candle(0, dec!(100.00), dec!(100.10), dec!(99.90), dec!(100.00)),
        candle(1, dec!(100.00), dec!(101.20), dec!(99.90), dec!(101.10)),
        candle(2, dec!(101.10), dec!(101.20), dec!(101.00), dec!(101.10)),
    ];
    let signals = vec![Signal::Long, Signal::Flat, Signal::Flat];

    let result = run_backtest(&candles, &signals, &ParameterSet::new(), &no_trailing()).unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.entry_price, dec!(100.00));
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    assert_eq!(trade.exit_price, dec!(101.00));
    assert_eq!(trade.realized_pnl, (dec!(101.00) - dec!(100.00)) * trade.lot_size * dec!(100));

    // Only the entry cost is ever deducted
    assert_eq!(
        result.final_equity,
        dec!(10000) - trade.entry_cost + trade.realized_pnl
    );
    assert_eq!(result.metrics.profit_factor, PROFIT_FACTOR_SENTINEL);
}

#[test]
fn stop_loss_wins_when_both_levels_breached() {
    let candles = vec![
        candle(0, dec!(100.00), dec!(100.10), dec!(99.90), dec!(100.00)),
        candle(1, dec!(100.00), dec!(101.50), dec!(99.30), dec!(100.40)),
        candle(2, dec!(100.40), dec!(100.50), dec!(100.30), dec!(100.40)),
    ];
    let signals = vec![Signal::Long, Signal::Flat, Signal::Flat];

    let result = run_backtest(&candles, &signals, &ParameterSet::new(), &no_trailing()).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
    assert_eq!(result.trades[0].exit_price, dec!(99.50));
    assert!(result.trades[0].realized_pnl < Decimal::ZERO);
    assert_eq!(result.metrics.profit_factor, 0.0);
}

#[test]
fn short_position_mirrors_levels() {
    let candles = vec![
        candle(0, dec!(100.00), dec!(100.10), dec!(99.90), dec!(100.00)),
        candle(1, dec!(100.00), dec!(100.20), dec!(98.90), dec!(99.10)),
        candle(2, dec!(99.10), dec!(99.20), dec!(99.00), dec!(99.10)),
    ];
    let signals = vec![Signal::Short, Signal::Flat, Signal::Flat];

    let result = run_backtest(&candles, &signals, &ParameterSet::new(), &no_trailing()).unwrap();

    assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
    assert_eq!(result.trades[0].exit_price, dec!(99.00));
    assert!(result.trades[0].realized_pnl > Decimal::ZERO);
}

#[test]
fn no_signals_means_flat_equity() {
    let candles = triangle_wave(200);
    let signals = vec![Signal::Flat; candles.len()];

    let result = run_backtest(
        &candles,
        &signals,
        &ParameterSet::new(),
        &BacktestConfig::default(),
    )
    .unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.equity_curve.len(), candles.len());
    assert!(result.equity_curve.iter().all(|p| p.equity == dec!(10000)));
    assert_eq!(result.metrics.max_drawdown, 0.0);
    assert_eq!(result.net_profit, Decimal::ZERO);
}

#[test]
fn position_open_at_end_is_force_closed() {
    let candles = vec![
        candle(0, dec!(100.00), dec!(100.10), dec!(99.90), dec!(100.00)),
        candle(1, dec!(100.00), dec!(100.30), dec!(99.90), dec!(100.20)),
    ];
    let signals = vec![Signal::Long, Signal::Long];

    let result = run_backtest(&candles, &signals, &ParameterSet::new(), &no_trailing()).unwrap();

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
    assert_eq!(result.trades[0].exit_price, dec!(100.20));
    assert!(result.trades[0].exit_time > result.trades[0].entry_time);
}

#[test]
fn malformed_series_rejected() {
    let config = BacktestConfig::default();

    assert_eq!(
        run_backtest(&[], &[], &ParameterSet::new(), &config).unwrap_err(),
        ValidationError::EmptySeries
    );

    let candles = vec![
        candle(1, dec!(100), dec!(101), dec!(99), dec!(100)),
        candle(0, dec!(100), dec!(101), dec!(99), dec!(100)),
    ];
    let signals = vec![Signal::Flat; 2];
    assert_eq!(
        run_backtest(&candles, &signals, &ParameterSet::new(), &config).unwrap_err(),
        ValidationError::NonMonotonic { index: 1 }
    );
}

#[test]
fn zero_equity_sizes_like_initial_capital() {
    let config = BacktestConfig {
        initial_capital: dec!(3000),
        ..Default::default()
    };
    let sizing = config.effective_sizing();

    let at_zero = dynamic_lot_size(
        Decimal::ZERO,
        sizing.risk_pct,
        config.stop_loss_points,
        &config.instrument,
        &sizing,
    );
    let at_initial = dynamic_lot_size(
        config.initial_capital,
        sizing.risk_pct,
        config.stop_loss_points,
        &config.instrument,
        &sizing,
    );
    assert_eq!(at_zero, at_initial);
    assert_eq!(at_initial, dec!(1.20));
}

#[test]
fn backtest_is_deterministic() {
    let candles = triangle_wave(600);
    let params = ParameterSet::new()
        .with("ema_fast", 5i64)
        .with("ema_slow", 20i64);
    let signals = EmaCrossover::default().generate(&candles, &params);

    let config = BacktestConfig::default();
    let first = run_backtest(&candles, &signals, &params, &config).unwrap();
    let second = run_backtest(&candles, &signals, &params, &config).unwrap();

    assert!(!first.trades.is_empty());
    assert_eq!(first.trades, second.trades);
    assert_eq!(first.equity_curve, second.equity_curve);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn walk_forward_insufficient_data() {
    let candles = triangle_wave(300);
    let grid = ParameterGrid::new().with("ema_fast", vec![5i64, 8]);

    let outcome = walk_forward_validate(&candles, &EmaCrossover::default(), &grid, 3, 1).unwrap();

    match outcome {
        WalkForwardOutcome::InsufficientData { candles, reason } => {
            assert_eq!(candles, 300);
            assert!(!reason.is_empty());
        }
        WalkForwardOutcome::Completed { .. } => panic!("expected insufficient data"),
    }
}

#[test]
fn walk_forward_completes_over_rolling_windows() {
    // About four months of hourly candles
    let candles = triangle_wave(2900);
    let grid = ParameterGrid::new()
        .with("ema_fast", vec![3i64, 5, 8])
        .with("ema_slow", vec![13i64, 20, 30, 50, 80]);
    let config = WalkForwardConfig {
        train_months: 1,
        test_months: 1,
        min_train_candles: 200,
        min_test_candles: 50,
        min_trades: 1,
        ..Default::default()
    };

    let validator = WalkForwardValidator::new()
        .with_config(config)
        .with_param_grid(grid)
        .with_default_params(ParameterSet::new().with("ema_fast", 5i64));

    let outcome = validator.validate(&candles, &EmaCrossover::default()).unwrap();
    let again = validator.validate(&candles, &EmaCrossover::default()).unwrap();

    let windows = outcome.windows();
    assert!(windows.len() >= 2);

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.window_count, windows.len());
    assert_eq!(
        summary.total_trades,
        windows.iter().map(|w| w.result.total_trades()).sum::<usize>()
    );
    assert_eq!(
        summary.total_net_profit,
        windows.iter().map(|w| w.result.net_profit).sum::<Decimal>()
    );
    assert!(summary.worst_drawdown <= 0.0);
    assert!(summary.consistency_score.is_finite());

    for pair in windows.windows(2) {
        assert!(pair[0].test_end < pair[1].test_start);
        assert!(pair[0].test_end < pair[1].train_start);
    }
    for window in windows {
        assert!(window.train_end < window.test_start);
        assert!(window.test_candles >= 50);
        // Only the first 12 combinations are ever considered
        if !window.used_default && window.params.get_i64("ema_fast", 0) == 8 {
            assert!(window.params.get_i64("ema_slow", 0) <= 20);
        }
    }

    assert_eq!(outcome.summary(), again.summary());
}

fn series_strategy() -> impl Strategy<Value = (Vec<Candle>, Vec<Signal>)> {
    prop::collection::vec((-80i64..=80, 0i64..=60, 0i64..=60, 0u8..3), 2..120).prop_map(|steps| {
        let mut close = dec!(2000);
        let mut candles = Vec::with_capacity(steps.len());
        let mut signals = Vec::with_capacity(steps.len());

        for (i, (delta, up, down, s)) in steps.into_iter().enumerate() {
            let open = close;
            close = (close + Decimal::new(delta, 2)).max(dec!(1));
            let high = open.max(close) + Decimal::new(up, 2);
            let low = (open.min(close) - Decimal::new(down, 2)).max(dec!(0.5));
            candles.push(candle(i as i64, open, high, low, close));
            signals.push(match s {
                0 => Signal::Flat,
                1 => Signal::Long,
                _ => Signal::Short,
            });
        }
        (candles, signals)
    })
}

proptest! {
    #[test]
    fn simulator_invariants(
        (candles, signals) in series_strategy(),
        reentry in any::<bool>(),
        reversal in any::<bool>(),
        trailing in any::<bool>(),
    ) {
        let config = BacktestConfig {
            allow_same_bar_reentry: reentry,
            exit_on_opposite_signal: reversal,
            trail_activation_points: if trailing { dec!(50) } else { Decimal::ZERO },
            ..Default::default()
        };
        let result = run_backtest(&candles, &signals, &ParameterSet::new(), &config).unwrap();

        prop_assert_eq!(result.equity_curve.len(), candles.len());

        // Every exit lies between the static stop (0.50) and the target (1.00)
        for trade in &result.trades {
            prop_assert!(trade.exit_time > trade.entry_time);
            prop_assert!(trade.lot_size > Decimal::ZERO);

            let (lower, upper) = match trade.side {
                Side::Long => (trade.entry_price - dec!(0.50), trade.entry_price + dec!(1.00)),
                Side::Short => (trade.entry_price - dec!(1.00), trade.entry_price + dec!(0.50)),
            };
            prop_assert!(
                trade.exit_price >= lower && trade.exit_price <= upper,
                "{:?} exit {} outside [{}, {}]",
                trade.exit_reason,
                trade.exit_price,
                lower,
                upper
            );
        }
        for pair in result.trades.windows(2) {
            prop_assert!(pair[1].entry_time >= pair[0].exit_time);
        }

        for pair in result.equity_curve.windows(2) {
            prop_assert!(pair[1].peak >= pair[0].peak);
            prop_assert!(pair[1].timestamp > pair[0].timestamp);
        }
        for point in &result.equity_curve {
            prop_assert!(point.drawdown <= 0.0);
            prop_assert!(point.drawdown.is_finite());
        }

        let m = &result.metrics;
        prop_assert!(m.profit_factor.is_finite() && m.profit_factor >= 0.0);
        prop_assert!(m.win_rate >= 0.0 && m.win_rate <= 1.0);
        prop_assert!(m.max_drawdown <= 0.0);

        // Equity moves only by entry costs and realized P&L
        let expected = config.initial_capital
            + result.trades.iter().map(|t| t.realized_pnl - t.entry_cost).sum::<Decimal>();
        prop_assert_eq!(result.final_equity, expected);

        let again = run_backtest(&candles, &signals, &ParameterSet::new(), &config).unwrap();
        prop_assert_eq!(&result.trades, &again.trades);
    }

    #[test]
    fn lot_size_always_within_bounds(
        equity in -100_000i64..1_000_000,
        risk in -5i64..20,
        stop in -100i64..500,
    ) {
        let config = BacktestConfig::default();
        let lot = dynamic_lot_size(
            Decimal::from(equity),
            Decimal::from(risk),
            Decimal::from(stop),
            &config.instrument,
            &config.effective_sizing(),
        );
        prop_assert!(lot >= dec!(0.01));
        prop_assert!(lot <= dec!(5.0));
    }
}
