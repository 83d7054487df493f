//! Application configuration.
//!
//! One TOML file carries the backtest, walk-forward, grid, fallback
//! parameter and signal-source settings. Every section is optional and falls
//! back to its defaults.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::BacktestConfig;
use crate::signals::EmaCrossover;
use crate::walkforward::{ParameterGrid, ParameterSet, WalkForwardConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backtest: BacktestConfig,
    pub walkforward: WalkForwardConfig,
    /// Candidate values searched on every train window.
    pub grid: ParameterGrid,
    /// Parameters for single runs and the walk-forward fallback.
    pub default_params: ParameterSet,
    pub signals: EmaCrossover,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backtest: BacktestConfig::default(),
            walkforward: WalkForwardConfig::default(),
            grid: ParameterGrid::new()
                .with("ema_fast", vec![5i64, 7, 9])
                .with("ema_slow", vec![18i64, 20, 22])
                .with("use_fvg_filter", vec![false])
                .with("use_trend_filter", vec![false]),
            default_params: ParameterSet::new()
                .with("ema_fast", 5i64)
                .with("ema_slow", 20i64)
                .with("use_fvg_filter", false)
                .with("use_trend_filter", false),
            signals: EmaCrossover::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Signal source bound to the backtest instrument.
    pub fn signal_source(&self) -> EmaCrossover {
        self.signals.clone().for_instrument(&self.backtest.instrument)
    }

    /// Reject settings the simulator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bt = &self.backtest;
        if bt.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::Invalid("initial_capital must be > 0".into()));
        }
        if bt.stop_loss_points < Decimal::ZERO || bt.take_profit_points < Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "stop_loss_points and take_profit_points must be >= 0".into(),
            ));
        }
        if bt.sizing.min_lot > bt.sizing.max_lot {
            return Err(ConfigError::Invalid("sizing.min_lot exceeds sizing.max_lot".into()));
        }
        if self.walkforward.max_combinations == 0 {
            return Err(ConfigError::Invalid("walkforward.max_combinations must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.backtest.initial_capital, dec!(10000));
        assert_eq!(config.walkforward.max_combinations, 12);
        assert_eq!(config.grid.total_combinations(), 9);
        assert_eq!(config.grid.sample(config.walkforward.max_combinations).len(), 9);
        assert_eq!(config.default_params.get_i64("ema_slow", 0), 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [backtest]
            initial_capital = 5000
            allow_same_bar_reentry = false

            [backtest.costs]
            spread_points = 20

            [walkforward]
            train_months = 6

            [grid]
            ema_fast = [3, 5]
            "#,
        )
        .unwrap();

        assert_eq!(config.backtest.initial_capital, dec!(5000));
        assert!(!config.backtest.allow_same_bar_reentry);
        assert_eq!(config.backtest.costs.spread_points, dec!(20));
        assert_eq!(config.backtest.costs.slippage_points, dec!(5));
        assert_eq!(config.backtest.stop_loss_points, dec!(50));
        assert_eq!(config.walkforward.train_months, 6);
        assert_eq!(config.walkforward.test_months, 1);
        assert_eq!(config.grid.total_combinations(), 2);
    }

    #[test]
    fn test_signal_source_uses_instrument_point_size() {
        let config = AppConfig::from_toml_str(
            r#"
            [backtest.instrument]
            point_size = 0.1

            [signals]
            fvg_min_points = 15
            "#,
        )
        .unwrap();

        let source = config.signal_source();
        assert_eq!(source.point_size, dec!(0.1));
        assert_eq!(source.fvg_min_points, dec!(15));
        assert_eq!(AppConfig::default().signal_source().point_size, dec!(0.01));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = AppConfig::from_toml_str("[backtest]\ninitial_capital = 0\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = AppConfig::from_toml_str("[backtest\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[walkforward]\nmin_trades = 3").unwrap();

        let config = AppConfig::from_toml(file.path()).unwrap();
        assert_eq!(config.walkforward.min_trades, 3);
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let config = AppConfig::default();
        config.save_toml(file.path()).unwrap();

        let reloaded = AppConfig::from_toml(file.path()).unwrap();
        assert_eq!(reloaded, config);
    }
}
