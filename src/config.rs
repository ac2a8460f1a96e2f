//! Configuration module
//!
//! Loaded from a TOML file, by default
//! `~/.config/ochp-service/config.toml` (platform config dir).
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8090
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [direct]
//! default_reservation_secs = 300
//! max_reservation_secs = 1800
//! sweep_interval_secs = 60
//! retention_secs = 3600
//!
//! [[endpoints]]
//! role = "operator"
//! url = "https://cpo.example/ochp/direct"
//! namespace_url = "http://ochp.eu/1.4"
//! access_token = "secret"
//! valid_date = "2030-01-01T00:00:00Z"
//! whitelist = ["DE*GEF"]
//! ```

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::DirectSettings;
use crate::domain::EndpointRegistration;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub direct: DirectConfig,
    /// Endpoints registered at startup.
    pub endpoints: Vec<EndpointRegistration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds allowed for in-flight requests after a shutdown signal.
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    /// `text` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectConfig {
    /// 0 disables the default reservation window.
    pub default_reservation_secs: u64,
    pub max_reservation_secs: u64,
    /// 0 disables the background sweep.
    pub sweep_interval_secs: u64,
    /// How long released/expired sessions stay readable.
    pub retention_secs: u64,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            default_reservation_secs: 300,
            max_reservation_secs: 1800,
            sweep_interval_secs: 60,
            retention_secs: 3600,
        }
    }
}

impl DirectConfig {
    pub fn settings(&self) -> DirectSettings {
        DirectSettings {
            default_reservation: (self.default_reservation_secs > 0)
                .then(|| seconds(self.default_reservation_secs)),
            max_reservation: seconds(self.max_reservation_secs),
        }
    }

    pub fn retention(&self) -> Duration {
        seconds(self.retention_secs)
    }
}

/// Longest accepted reservation or retention window (ten years).
pub const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs.min(MAX_WINDOW_SECS)).unwrap_or(i64::MAX / 1000))
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.direct.max_reservation_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "direct.max_reservation_secs",
                reason: "must be greater than zero".into(),
            });
        }
        let windows = [
            ("direct.default_reservation_secs", self.direct.default_reservation_secs),
            ("direct.max_reservation_secs", self.direct.max_reservation_secs),
            ("direct.retention_secs", self.direct.retention_secs),
        ];
        if let Some((field, secs)) = windows.into_iter().find(|(_, secs)| *secs > MAX_WINDOW_SECS) {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("{} exceeds the limit of {} seconds", secs, MAX_WINDOW_SECS),
            });
        }
        if let Some(endpoint) = self.endpoints.iter().find(|e| e.url.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "endpoints.url",
                reason: format!("{} endpoint without url", endpoint.role),
            });
        }
        match self.logging.format.to_lowercase().as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Invalid {
                field: "logging.format",
                reason: format!("unknown format '{}'", other),
            }),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// `<config dir>/ochp-service/config.toml`, or `./config.toml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("ochp-service"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EndpointRole;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: AppConfig = toml::from_str("[server]\nport = 9100\n").unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.direct, DirectConfig::default());
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn endpoints_are_read_as_registrations() {
        let config: AppConfig = toml::from_str(
            r#"
            [[endpoints]]
            role = "provider"
            url = "https://emp.example/direct"
            namespace_url = "http://ochp.eu/1.4"
            access_token = "t"
            valid_date = "2030-01-01T00:00:00Z"
            whitelist = ["DE-GDF"]
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].role, EndpointRole::Provider);
        assert!(config.endpoints[0].blacklist.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn direct_settings_follow_the_config() {
        let direct = DirectConfig {
            default_reservation_secs: 0,
            max_reservation_secs: 600,
            ..DirectConfig::default()
        };
        let settings = direct.settings();
        assert_eq!(settings.default_reservation, None);
        assert_eq!(settings.max_reservation, Duration::minutes(10));
        assert_eq!(DirectConfig::default().settings(), DirectSettings::default());
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "logging.format", .. })
        ));
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let mut config = AppConfig::default();
        config.direct.max_reservation_secs = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "direct.max_reservation_secs", .. })
        ));

        let mut config = AppConfig::default();
        config.direct.retention_secs = MAX_WINDOW_SECS + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "direct.retention_secs", .. })
        ));

        let mut config = AppConfig::default();
        config.direct.default_reservation_secs = MAX_WINDOW_SECS;
        config.validate().unwrap();
    }

    #[test]
    fn settings_clamp_unvalidated_windows() {
        let direct = DirectConfig {
            max_reservation_secs: u64::MAX,
            retention_secs: u64::MAX,
            ..DirectConfig::default()
        };
        let cap = Duration::seconds(MAX_WINDOW_SECS as i64);
        assert_eq!(direct.settings().max_reservation, cap);
        assert_eq!(direct.retention(), cap);
    }

    #[test]
    fn missing_file_means_defaults() {
        let path = std::env::temp_dir().join("ochp-service-no-such-config.toml");
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn default_path_ends_in_service_dir() {
        assert!(default_config_path().ends_with("config.toml"));
    }
}
