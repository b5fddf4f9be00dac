//! Engine configuration.
//!
//! Loads [`EngineConfig`] from a TOML file (`gigo.toml`) with environment
//! variable overrides via `GIGO_CONV_*` prefixed variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default cap on the element count of any single engine-allocated buffer.
pub const DEFAULT_MAX_BUFFER_ELEMENTS: usize = 1 << 28;

const ENV_TRACE_STAGES: &str = "GIGO_CONV_TRACE_STAGES";
const ENV_MAX_BUFFER_ELEMENTS: &str = "GIGO_CONV_MAX_BUFFER_ELEMENTS";
const ENV_REJECT_NON_FINITE: &str = "GIGO_CONV_REJECT_NON_FINITE";

/// Convolution engine configuration loaded from TOML with environment
/// variable overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Report pipeline stages through `tracing`.
    /// Override: `GIGO_CONV_TRACE_STAGES`
    pub trace_stages: bool,

    /// Largest buffer (in `f32` elements) one call may allocate.
    /// Override: `GIGO_CONV_MAX_BUFFER_ELEMENTS`
    pub max_buffer_elements: usize,

    /// Fail the call when the output contains NaN or infinity.
    /// Override: `GIGO_CONV_REJECT_NON_FINITE`
    pub reject_non_finite: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trace_stages: false,
            max_buffer_elements: DEFAULT_MAX_BUFFER_ELEMENTS,
            reject_non_finite: false,
        }
    }
}

/// Errors that can occur when loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

impl EngineConfig {
    /// Generate a default configuration TOML string.
    pub fn default_toml() -> String {
        // A struct of plain scalars always serializes.
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields, then apply environment variable overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut cfg: EngineConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load only from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_buffer_elements == 0 {
            return Err(ConfigError::Validation("max_buffer_elements must be > 0".into()));
        }
        Ok(())
    }

    /// Apply `GIGO_CONV_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var(ENV_TRACE_STAGES) {
            self.trace_stages = parse_flag(ENV_TRACE_STAGES, &val)?;
        }

        if let Ok(val) = std::env::var(ENV_MAX_BUFFER_ELEMENTS) {
            self.max_buffer_elements =
                val.parse::<usize>().map_err(|e| ConfigError::EnvOverride {
                    key: ENV_MAX_BUFFER_ELEMENTS.into(),
                    value: val.clone(),
                    reason: e.to_string(),
                })?;
        }

        if let Ok(val) = std::env::var(ENV_REJECT_NON_FINITE) {
            self.reject_non_finite = parse_flag(ENV_REJECT_NON_FINITE, &val)?;
        }

        Ok(())
    }
}

fn parse_flag(key: &str, val: &str) -> Result<bool, ConfigError> {
    match val.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::EnvOverride {
            key: key.into(),
            value: val.into(),
            reason: "expected a boolean (1/0, true/false, yes/no)".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 3] = [ENV_TRACE_STAGES, ENV_MAX_BUFFER_ELEMENTS, ENV_REJECT_NON_FINITE];

    fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
        ALL_VARS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    #[serial(gigo_env)]
    fn test_default_toml_round_trips() {
        temp_env::with_vars(cleared_env(), || {
            let cfg = EngineConfig::from_toml(&EngineConfig::default_toml()).unwrap();
            assert_eq!(cfg, EngineConfig::default());
        });
    }

    #[test]
    #[serial(gigo_env)]
    fn test_from_toml_partial_uses_defaults() {
        temp_env::with_vars(cleared_env(), || {
            let cfg = EngineConfig::from_toml("reject_non_finite = true\n").unwrap();
            assert!(cfg.reject_non_finite);
            assert!(!cfg.trace_stages);
            assert_eq!(cfg.max_buffer_elements, DEFAULT_MAX_BUFFER_ELEMENTS);
        });
    }

    #[test]
    #[serial(gigo_env)]
    fn test_from_toml_full() {
        temp_env::with_vars(cleared_env(), || {
            let toml_str = r#"
trace_stages = true
max_buffer_elements = 4096
reject_non_finite = true
"#;
            let cfg = EngineConfig::from_toml(toml_str).unwrap();
            assert!(cfg.trace_stages);
            assert_eq!(cfg.max_buffer_elements, 4096);
            assert!(cfg.reject_non_finite);
        });
    }

    #[test]
    fn test_validation_zero_buffer_limit() {
        let cfg = EngineConfig { max_buffer_elements: 0, ..Default::default() };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_buffer_elements must be > 0"));
    }

    #[test]
    #[serial(gigo_env)]
    fn test_env_override_multiple_fields() {
        temp_env::with_vars(
            [
                (ENV_TRACE_STAGES, Some("yes")),
                (ENV_MAX_BUFFER_ELEMENTS, Some("1024")),
                (ENV_REJECT_NON_FINITE, Some("1")),
            ],
            || {
                let cfg = EngineConfig::from_env().unwrap();
                assert!(cfg.trace_stages);
                assert_eq!(cfg.max_buffer_elements, 1024);
                assert!(cfg.reject_non_finite);
            },
        );
    }

    #[test]
    #[serial(gigo_env)]
    fn test_env_override_beats_toml() {
        temp_env::with_vars(
            [
                (ENV_TRACE_STAGES, Some("false")),
                (ENV_MAX_BUFFER_ELEMENTS, None),
                (ENV_REJECT_NON_FINITE, None),
            ],
            || {
                let cfg = EngineConfig::from_toml("trace_stages = true\n").unwrap();
                assert!(!cfg.trace_stages);
            },
        );
    }

    #[test]
    #[serial(gigo_env)]
    fn test_env_override_invalid_number() {
        temp_env::with_vars(
            [
                (ENV_TRACE_STAGES, None),
                (ENV_MAX_BUFFER_ELEMENTS, Some("lots")),
                (ENV_REJECT_NON_FINITE, None),
            ],
            || match EngineConfig::from_env().unwrap_err() {
                ConfigError::EnvOverride { key, value, .. } => {
                    assert_eq!(key, ENV_MAX_BUFFER_ELEMENTS);
                    assert_eq!(value, "lots");
                }
                other => panic!("expected EnvOverride, got: {other}"),
            },
        );
    }

    #[test]
    #[serial(gigo_env)]
    fn test_env_override_invalid_flag() {
        temp_env::with_vars(
            [
                (ENV_TRACE_STAGES, Some("maybe")),
                (ENV_MAX_BUFFER_ELEMENTS, None),
                (ENV_REJECT_NON_FINITE, None),
            ],
            || {
                let err = EngineConfig::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::EnvOverride { .. }));
            },
        );
    }

    #[test]
    #[serial(gigo_env)]
    fn test_env_zero_limit_fails_validation() {
        temp_env::with_vars(
            [
                (ENV_TRACE_STAGES, None),
                (ENV_MAX_BUFFER_ELEMENTS, Some("0")),
                (ENV_REJECT_NON_FINITE, None),
            ],
            || {
                let err = EngineConfig::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::Validation(_)));
            },
        );
    }

    #[test]
    #[serial(gigo_env)]
    fn test_load_from_tempfile() {
        temp_env::with_vars(cleared_env(), || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("gigo.toml");
            std::fs::write(&path, EngineConfig::default_toml()).unwrap();
            let cfg = EngineConfig::load(&path).unwrap();
            assert_eq!(cfg, EngineConfig::default());
        });
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = EngineConfig::load(Path::new("/nonexistent/gigo.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_parse_toml_error() {
        let result = toml::from_str::<EngineConfig>("max_buffer_elements = \"many\"");
        assert!(result.is_err());
    }
}
