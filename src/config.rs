use serde::Serialize;

use crate::error::EngineError;

pub const DEFAULT_WEEK_WINDOW: usize = 2;
pub const DEFAULT_SPIKE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_TREND_SHIFT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_RECENCY_DAYS: i64 = 7;

/// Tunables for a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorConfig {
    /// Trailing window, in weekly rows, for the rolling average.
    pub week_window: usize,
    pub spike_threshold: f64,
    pub trend_shift_threshold: f64,
    /// Alerts older than `latest - recency_days` are dropped.
    pub recency_days: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            week_window: DEFAULT_WEEK_WINDOW,
            spike_threshold: DEFAULT_SPIKE_THRESHOLD,
            trend_shift_threshold: DEFAULT_TREND_SHIFT_THRESHOLD,
            recency_days: DEFAULT_RECENCY_DAYS,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.week_window == 0 {
            return Err(EngineError::InvalidConfig {
                name: "week_window",
                reason: "must be at least 1".to_string(),
            });
        }

        for (name, value) in [
            ("spike_threshold", self.spike_threshold),
            ("trend_shift_threshold", self.trend_shift_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidConfig {
                    name,
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }

        if self.recency_days < 0 {
            return Err(EngineError::InvalidConfig {
                name: "recency_days",
                reason: format!("must not be negative, got {}", self.recency_days),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DetectorConfig::default();
        assert_eq!(config.week_window, 2);
        assert_eq!(config.recency_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = DetectorConfig {
            week_window: 0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig {
                name: "week_window",
                ..
            })
        ));
    }

    #[test]
    fn non_positive_thresholds_are_rejected() {
        let config = DetectorConfig {
            spike_threshold: 0.0,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DetectorConfig {
            trend_shift_threshold: f64::NAN,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_recency_is_rejected() {
        let config = DetectorConfig {
            recency_days: -1,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
