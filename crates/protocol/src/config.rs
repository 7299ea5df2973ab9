use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config out of range: {0}")]
    OutOfRange(String),
}

/// Recognized report options. All fields have defaults, so a partial TOML
/// file (or an empty one) is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Curr/prev ratio at or below which a still-active entity becomes a
    /// discontinuation candidate (dropped more than 95% by default).
    pub reclassify_ratio: f64,
    /// Bot-rate fraction at which an entity is tagged high-bot.
    pub bot_alert_rate: f64,
    /// Week-over-week bot-rate swing, in percentage points, that puts an
    /// entity on the watch list.
    pub watch_rate_swing_pp: f64,
    /// Continuing-bucket rows shown in the growth view.
    pub top_growth_rows: usize,
    /// Continuing-bucket rows shown in the decline view.
    pub top_decline_rows: usize,
    /// Decimal places for ratio-style figures (headline WoW percent).
    pub ratio_decimals: usize,
    /// Decimal places for plain percentages (bot rates, % of change).
    pub percent_decimals: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reclassify_ratio: 0.05,
            bot_alert_rate: 0.70,
            watch_rate_swing_pp: 20.0,
            top_growth_rows: 3,
            top_decline_rows: 5,
            ratio_decimals: 1,
            percent_decimals: 0,
        }
    }
}

impl ReportConfig {
    /// Bot alert threshold on the 0..=100 scale used by the rate helpers.
    pub fn bot_alert_pct(&self) -> f64 {
        self.bot_alert_rate * 100.0
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.reclassify_ratio) {
            return Err(ConfigError::OutOfRange(format!(
                "reclassify_ratio must be within [0, 1], got {}",
                self.reclassify_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.bot_alert_rate) {
            return Err(ConfigError::OutOfRange(format!(
                "bot_alert_rate must be within [0, 1], got {}",
                self.bot_alert_rate
            )));
        }
        if self.watch_rate_swing_pp < 0.0 {
            return Err(ConfigError::OutOfRange(format!(
                "watch_rate_swing_pp must be non-negative, got {}",
                self.watch_rate_swing_pp
            )));
        }
        if self.top_growth_rows == 0 || self.top_decline_rows == 0 {
            return Err(ConfigError::OutOfRange(
                "top_growth_rows and top_decline_rows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ReportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.bot_alert_pct(), 70.0);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = ReportConfig::from_toml_str("top_growth_rows = 10\nbot_alert_rate = 0.6\n").unwrap();
        assert_eq!(config.top_growth_rows, 10);
        assert_eq!(config.bot_alert_rate, 0.6);
        assert_eq!(config.top_decline_rows, 5);
        assert_eq!(config.reclassify_ratio, 0.05);
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        let err = ReportConfig::from_toml_str("reclassify_ratio = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ReportConfig::from_toml_str("reclasify_ratio = 0.05").is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.toml");
        std::fs::write(&path, "top_decline_rows = 7\n").unwrap();
        let config = ReportConfig::from_toml_path(&path).unwrap();
        assert_eq!(config.top_decline_rows, 7);
    }
}
