//! Trailing behaviour configuration.

use common::{env_or, env_parse, EnvVarError};
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] EnvVarError),

    /// The new stop would land at or above the price, or at or below zero.
    #[error("move-up margin must be between 0 and 100 percent, got {0}")]
    InvalidMargin(Decimal),

    #[error("{name} must not be negative, got {value}")]
    NegativeThreshold { name: &'static str, value: Decimal },

    /// Without a threshold no order would ever be moved.
    #[error("at least one of the static or percentage thresholds must be positive")]
    NoThresholdEnabled,

    #[error("mailbox capacity must be at least 1")]
    ZeroMailboxCapacity,
}

/// Settings for the reorder policy and the order processors.
#[derive(Debug, Clone)]
pub struct TrailingConfig {
    /// How far below the current price a new stop is placed, in percent.
    pub move_up_margin_pct: Decimal,

    /// Absolute price distance above the stop that triggers a reorder.
    /// Zero disables the absolute trigger.
    pub static_threshold: Decimal,

    /// Distance above the stop, in percent of the stop, that triggers a
    /// reorder. Zero disables the relative trigger.
    pub percentage_threshold: Decimal,

    /// Decimal places the new stop is truncated to (the symbol's tick size).
    pub price_precision: Option<u32>,

    /// Minimum time between two replacements of the same order.
    pub min_reorder_interval: Duration,

    /// Minimum time between two status queries triggered by ticks.
    pub min_check_interval: Duration,

    /// Pending ticks per processor before new ticks are dropped.
    pub mailbox_capacity: usize,

    /// Log cancels and creates instead of sending them.
    pub dry_run: bool,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            move_up_margin_pct: Decimal::ONE,
            static_threshold: Decimal::ZERO,
            percentage_threshold: Decimal::TWO,
            price_precision: None,
            min_reorder_interval: Duration::from_secs(5),
            min_check_interval: Duration::from_secs(1),
            mailbox_capacity: 64,
            dry_run: false,
        }
    }
}

impl TrailingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `TRAILING_*` environment variables, keeping defaults for
    /// anything unset, and validate the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        common::load_dotenv();
        let defaults = Self::default();

        let config = Self {
            move_up_margin_pct: env_or("TRAILING_MOVE_UP_MARGIN_PCT", defaults.move_up_margin_pct)?,
            static_threshold: env_or("TRAILING_STATIC_THRESHOLD", defaults.static_threshold)?,
            percentage_threshold: env_or(
                "TRAILING_PERCENTAGE_THRESHOLD",
                defaults.percentage_threshold,
            )?,
            price_precision: env_parse("TRAILING_PRICE_PRECISION")?,
            min_reorder_interval: env_parse::<u64>("TRAILING_MIN_REORDER_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_reorder_interval),
            min_check_interval: env_parse::<u64>("TRAILING_MIN_CHECK_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_check_interval),
            mailbox_capacity: env_or("TRAILING_MAILBOX_CAPACITY", defaults.mailbox_capacity)?,
            dry_run: env_or("TRAILING_DRY_RUN", defaults.dry_run)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.move_up_margin_pct <= Decimal::ZERO || self.move_up_margin_pct >= Decimal::ONE_HUNDRED {
            return Err(ConfigError::InvalidMargin(self.move_up_margin_pct));
        }
        if self.static_threshold < Decimal::ZERO {
            return Err(ConfigError::NegativeThreshold {
                name: "static_threshold",
                value: self.static_threshold,
            });
        }
        if self.percentage_threshold < Decimal::ZERO {
            return Err(ConfigError::NegativeThreshold {
                name: "percentage_threshold",
                value: self.percentage_threshold,
            });
        }
        if self.static_threshold.is_zero() && self.percentage_threshold.is_zero() {
            return Err(ConfigError::NoThresholdEnabled);
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::ZeroMailboxCapacity);
        }
        Ok(())
    }

    pub fn with_move_up_margin_pct(mut self, pct: Decimal) -> Self {
        self.move_up_margin_pct = pct;
        self
    }

    pub fn with_static_threshold(mut self, threshold: Decimal) -> Self {
        self.static_threshold = threshold;
        self
    }

    pub fn with_percentage_threshold(mut self, threshold: Decimal) -> Self {
        self.percentage_threshold = threshold;
        self
    }

    pub fn with_price_precision(mut self, decimals: u32) -> Self {
        self.price_precision = Some(decimals);
        self
    }

    pub fn with_min_reorder_interval(mut self, interval: Duration) -> Self {
        self.min_reorder_interval = interval;
        self
    }

    pub fn with_min_check_interval(mut self, interval: Duration) -> Self {
        self.min_check_interval = interval;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_is_valid() {
        let config = TrailingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.move_up_margin_pct, dec!(1));
        assert_eq!(config.percentage_threshold, dec!(2));
        assert_eq!(config.min_reorder_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_margin_bounds() {
        for margin in [dec!(0), dec!(-1), dec!(100), dec!(150)] {
            let config = TrailingConfig::default().with_move_up_margin_pct(margin);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidMargin(_))));
        }
        let config = TrailingConfig::default().with_move_up_margin_pct(dec!(99.9));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = TrailingConfig::default().with_static_threshold(dec!(-2));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeThreshold { name: "static_threshold", .. })
        ));
    }

    #[test]
    fn test_both_thresholds_disabled_rejected() {
        let config = TrailingConfig::default()
            .with_static_threshold(Decimal::ZERO)
            .with_percentage_threshold(Decimal::ZERO);
        assert!(matches!(config.validate(), Err(ConfigError::NoThresholdEnabled)));
    }

    #[test]
    fn test_zero_mailbox_rejected() {
        let config = TrailingConfig::default().with_mailbox_capacity(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMailboxCapacity)));
    }

    #[test]
    fn test_static_only_is_valid() {
        let config = TrailingConfig::default()
            .with_static_threshold(dec!(2))
            .with_percentage_threshold(Decimal::ZERO);
        assert!(config.validate().is_ok());
    }
}
