//! Runtime configuration
//!
//! Precedence, lowest first: built-in defaults, the TOML file, environment
//! variables (a `.env` file is read first when present).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use dashkit_core_types::Sensitive;
use dashkit_model::errors::{ExError, ExErrorKind};
use dashkit_model::logging_facility::Profile;
use dashkit_model::model::ObjRef;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_WORKSPACE: &str = "DASHKIT_WORKSPACE";
pub const ENV_DASHBOARD: &str = "DASHKIT_DASHBOARD";
pub const ENV_LOG_PROFILE: &str = "DASHKIT_LOG_PROFILE";
pub const ENV_API_TOKEN: &str = "DASHKIT_API_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        ExError::new(ExErrorKind::Config).with_message(err.to_string())
    }
}

/// Per-dashboard behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub max_attribute_filters: usize,
    pub layout_undo: bool,
    /// Capacity of the broadcast bridge behind `Dashboard::event_stream`
    pub event_buffer: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            max_attribute_filters: 30,
            layout_undo: true,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub workspace: String,
    /// Identifier of the dashboard to initialize from
    pub dashboard: Option<String>,
    pub log_profile: String,
    pub settings: DashboardSettings,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_token: Option<Sensitive<String>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workspace: "default".to_string(),
            dashboard: None,
            log_profile: "dev".to_string(),
            settings: DashboardSettings::default(),
            api_token: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the optional config file, then apply process environment overrides
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed, or
    /// when an override holds an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps variable names to values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown log profile or
    /// an empty workspace.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workspace) = lookup(ENV_WORKSPACE) {
            self.workspace = workspace;
        }
        if let Some(dashboard) = lookup(ENV_DASHBOARD) {
            self.dashboard = Some(dashboard);
        }
        if let Some(profile) = lookup(ENV_LOG_PROFILE) {
            self.log_profile = profile;
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.api_token = Some(Sensitive::new(token));
        }
        self.validate()
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown profile name.
    pub fn profile(&self) -> Result<Profile, ConfigError> {
        Profile::from_str(&self.log_profile).map_err(|reason| ConfigError::InvalidValue {
            key: "log_profile".to_string(),
            reason,
        })
    }

    pub fn dashboard_ref(&self) -> Option<ObjRef> {
        self.dashboard.as_deref().map(ObjRef::id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "workspace".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.settings.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "settings.event_buffer".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        self.profile().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.settings.max_attribute_filters, 30);
        assert!(config.settings.layout_undo);
        assert_eq!(config.settings.event_buffer, 256);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            workspace = "ws-1"

            [settings]
            layout_undo = false
            "#,
        )
        .unwrap();

        assert_eq!(config.workspace, "ws-1");
        assert!(!config.settings.layout_undo);
        assert_eq!(config.settings.max_attribute_filters, 30);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = RuntimeConfig::from_toml_str("workspace = \"from-file\"").unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_WORKSPACE, "from-env"),
            (ENV_API_TOKEN, "secret-token"),
        ]
        .into_iter()
        .collect();

        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.workspace, "from-env");
        let token = config.api_token.as_ref().unwrap();
        assert_eq!(token.expose(), "secret-token");
        assert!(!format!("{:?}", config).contains("secret-token"));
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let err = RuntimeConfig::from_toml_str("log_profile = \"verbose\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "log_profile"));
    }
}
