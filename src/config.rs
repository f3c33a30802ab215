use crate::core::db::connection::{
    ConnectionSettings, DEFAULT_CONNECTION_ATTEMPTS, DEFAULT_PROBE_TIMEOUT,
};
use crate::core::{DwhError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub connection: Option<ConnectionConfig>,
}

/// Warehouse endpoint and credentials.
#[derive(Debug, Deserialize)]
pub struct WarehouseConfig {
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub driver_index: Option<usize>,
}

/// Connect-loop tuning.
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    pub attempts: Option<u32>,
    pub probe_timeout_secs: Option<u64>,
}

impl Config {
    /// Converts the parsed configuration into connection settings.
    pub fn settings(&self) -> ConnectionSettings {
        let mut settings = ConnectionSettings::new(
            self.warehouse.server.clone(),
            self.warehouse.database.clone(),
            self.warehouse.username.clone(),
            self.warehouse.password.clone(),
        );
        settings.driver_index = self.warehouse.driver_index;
        if let Some(connection) = &self.connection {
            settings.connection_attempts = connection
                .attempts
                .unwrap_or(DEFAULT_CONNECTION_ATTEMPTS);
            settings.probe_timeout = connection
                .probe_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_PROBE_TIMEOUT);
        }
        settings
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Errors
///
/// Returns `DwhError::Io` if the file cannot be read and
/// `DwhError::Config` if it does not parse as warehouse configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| DwhError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_CONFIG: &str = r#"
[warehouse]
server = "dwh.example.com"
database = "reporting"
username = "svc_report"
password = "s3cret"
driver_index = 1

[connection]
attempts = 5
probe_timeout_secs = 10
"#;

    #[test]
    fn test_load_config_from_str() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.warehouse.server, "dwh.example.com");
        assert_eq!(config.warehouse.database, "reporting");
        assert_eq!(config.warehouse.driver_index, Some(1));
        let connection = config.connection.expect("Connection section not found");
        assert_eq!(connection.attempts, Some(5));
        assert_eq!(connection.probe_timeout_secs, Some(10));
    }

    #[test]
    fn test_settings_conversion() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).unwrap();
        let settings = config.settings();
        assert_eq!(settings.server, "dwh.example.com");
        assert_eq!(settings.driver_index, Some(1));
        assert_eq!(settings.connection_attempts, 5);
        assert_eq!(settings.probe_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_connection_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
[warehouse]
server = "srv"
database = "db"
username = "user"
password = "pass"
"#,
        )
        .unwrap();
        let settings = config.settings();
        assert_eq!(settings.driver_index, None);
        assert_eq!(settings.connection_attempts, DEFAULT_CONNECTION_ATTEMPTS);
        assert_eq!(settings.probe_timeout, DEFAULT_PROBE_TIMEOUT);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(SAMPLE_CONFIG.as_bytes())
            .expect("Failed to write config");
        let config = load_config(file.path()).expect("Failed to load config");
        assert_eq!(config.warehouse.username, "svc_report");
    }

    #[test]
    fn test_load_config_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(b"[warehouse\nserver = ")
            .expect("Failed to write config");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, DwhError::Config(_)));
    }

    #[test]
    fn test_load_config_missing_file_is_io_error() {
        let err = load_config("/nonexistent/dwhq.toml").unwrap_err();
        assert!(matches!(err, DwhError::Io(_)));
    }
}
