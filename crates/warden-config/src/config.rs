//! Top-level configuration type.

use crate::ConfigError;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use warden_core::ValidationSettings;
use warden_telemetry::LogConfig;

/// Complete Warden configuration.
///
/// Only plain data lives here. Adapters, handlers and schemas are attached in
/// code when the validator configuration is built from
/// [`WardenConfig::validation`].
///
/// # Example
///
/// ```
/// use warden_config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.validation.validated_namespace, "validated");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Validation behaviour.
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Log output.
    #[serde(default)]
    pub logging: LogConfig,
}

impl WardenConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The validated-data namespace is empty
    /// - The exempt status range is inverted or outside `100..=999`
    /// - The bad-request bypass is not a valid status code
    /// - The log filter does not parse
    pub fn validate(&self) -> Result<(), ConfigError> {
        let validation = &self.validation;

        if validation.validated_namespace.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "validation.validated_namespace",
                "must not be empty",
            ));
        }

        if let Some(range) = validation.exempt_statuses {
            if !range.is_ordered() {
                return Err(ConfigError::invalid_value(
                    "validation.exempt_statuses",
                    format!("start {} is after end {}", range.start, range.end),
                ));
            }
            for code in [range.start, range.end] {
                if StatusCode::from_u16(code).is_err() {
                    return Err(ConfigError::invalid_value(
                        "validation.exempt_statuses",
                        format!("{code} is not a valid status code"),
                    ));
                }
            }
        }

        if let Some(code) = validation.bad_request_bypass {
            if StatusCode::from_u16(code).is_err() {
                return Err(ConfigError::invalid_value(
                    "validation.bad_request_bypass",
                    format!("{code} is not a valid status code"),
                ));
            }
        }

        if self.logging.enabled {
            warden_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, error details in 5xx bodies.
    #[must_use]
    pub fn development() -> Self {
        Self {
            validation: ValidationSettings {
                expose_error_details: true,
                ..ValidationSettings::default()
            },
            logging: LogConfig::development(),
        }
    }

    /// Production preset: JSON logs, every status must have a response rule.
    #[must_use]
    pub fn production() -> Self {
        Self {
            validation: ValidationSettings {
                require_validator: true,
                ..ValidationSettings::default()
            },
            logging: LogConfig::production(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::StatusRange;
    use warden_telemetry::LogFormat;

    #[test]
    fn test_presets_are_valid() {
        assert!(WardenConfig::default().validate().is_ok());
        assert!(WardenConfig::development().validate().is_ok());
        assert!(WardenConfig::production().validate().is_ok());
        assert_eq!(WardenConfig::development().logging.format, LogFormat::Pretty);
        assert!(WardenConfig::production().validation.require_validator);
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let mut config = WardenConfig::default();
        config.validation.validated_namespace = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("validation.validated_namespace"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = WardenConfig::default();
        config.validation.exempt_statuses = Some(StatusRange::new(511, 500));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("start 511 is after end 500"));
    }

    #[test]
    fn test_out_of_range_status_rejected() {
        let mut config = WardenConfig::default();
        config.validation.exempt_statuses = Some(StatusRange::new(500, 1200));
        assert!(config.validate().is_err());

        let mut config = WardenConfig::default();
        config.validation.bad_request_bypass = Some(42);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_log_filter_rejected() {
        let mut config = WardenConfig::default();
        config.logging.level = "warden=loud".to_string();
        assert!(config.validate().is_err());

        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }
}
