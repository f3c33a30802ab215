/// Connection Settings Module
///
/// This module provides the immutable connection parameters for the
/// warehouse accessor, the ODBC connection-string rendering, and the
/// connect-phase state machine.
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;

/// Default retry budget for the connect loop.
pub const DEFAULT_CONNECTION_ATTEMPTS: u32 = 3;

/// Login timeout used while probing drivers with trial connections.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

static PWD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"PWD=[^;]*").expect("static regex"));

/// Represents the connect-phase states of the accessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectState {
    /// No live connection exists
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// A session is open and a cursor is available
    Connected,
    /// The last connect attempt ended in a terminal failure
    Failed,
}

impl Default for ConnectState {
    fn default() -> Self {
        ConnectState::Disconnected
    }
}

/// Immutable connection parameters, fixed once the accessor is built.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Address of the SQL server
    pub server: String,
    /// Name of the database
    pub database: String,
    pub username: String,
    pub password: String,
    /// Index into the installed-driver list; `None` selects by probing
    pub driver_index: Option<usize>,
    /// Retry budget for the connect loop
    pub connection_attempts: u32,
    /// Login timeout for driver-probing trial connections
    pub probe_timeout: Duration,
}

impl ConnectionSettings {
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        ConnectionSettings {
            server: server.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
            driver_index: None,
            connection_attempts: DEFAULT_CONNECTION_ATTEMPTS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Selects a driver by index instead of probing.
    pub fn with_driver_index(mut self, index: usize) -> Self {
        self.driver_index = Some(index);
        self
    }

    /// Overrides the connect-loop retry budget.
    pub fn with_connection_attempts(mut self, attempts: u32) -> Self {
        self.connection_attempts = attempts;
        self
    }

    /// Renders the ODBC connection string for the given driver name.
    ///
    /// Field order matches what the warehouse expects:
    /// `UID;PWD;DRIVER;SERVER;DATABASE;TrustServerCertificate`.
    pub fn connection_string(&self, driver: &str) -> String {
        format!(
            "UID={};PWD={};DRIVER={};SERVER={};DATABASE={};TrustServerCertificate=yes;",
            self.username, self.password, driver, self.server, self.database
        )
    }

    /// The connection string with the password masked, safe for logs.
    pub fn redacted(&self, driver: &str) -> String {
        redact(&self.connection_string(driver))
    }
}

impl fmt::Display for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted(""))
    }
}

/// Masks the `PWD=` field of a connection string.
pub fn redact(connection_string: &str) -> String {
    PWD_PATTERN.replace(connection_string, "PWD=***").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConnectionSettings {
        ConnectionSettings::new("dwh.example.com", "reporting", "svc_report", "s3cret")
    }

    #[test]
    fn test_connection_string_field_order() {
        let s = settings().connection_string("ODBC Driver 18 for SQL Server");
        assert_eq!(
            s,
            "UID=svc_report;PWD=s3cret;DRIVER=ODBC Driver 18 for SQL Server;SERVER=dwh.example.com;DATABASE=reporting;TrustServerCertificate=yes;"
        );
    }

    #[test]
    fn test_redaction_masks_password() {
        let redacted = settings().redacted("Driver1");
        assert!(!redacted.contains("s3cret"));
        assert!(redacted.contains("PWD=***"));
        assert!(redacted.contains("UID=svc_report"));
        assert!(redacted.contains("DATABASE=reporting"));
    }

    #[test]
    fn test_display_uses_redacted_form() {
        let shown = settings().to_string();
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn test_defaults() {
        let s = settings();
        assert_eq!(s.connection_attempts, DEFAULT_CONNECTION_ATTEMPTS);
        assert_eq!(s.probe_timeout, DEFAULT_PROBE_TIMEOUT);
        assert_eq!(s.driver_index, None);
        assert_eq!(ConnectState::default(), ConnectState::Disconnected);
    }

    #[test]
    fn test_builder_overrides() {
        let s = settings().with_driver_index(2).with_connection_attempts(5);
        assert_eq!(s.driver_index, Some(2));
        assert_eq!(s.connection_attempts, 5);
    }
}
