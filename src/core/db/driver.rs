/// Driver Selection Module
///
/// Picks the client driver the accessor will use for its lifetime:
/// either a caller-supplied index validated against the installed-driver
/// list, or the first driver that survives a trial connection with a
/// short login timeout.
use crate::core::db::backend::Backend;
use crate::core::db::connection::ConnectionSettings;
use crate::core::{DwhError, Result};
use tracing::{info, warn};

/// Selects the driver for the accessor.
///
/// With an explicit index this validates against the installed-driver
/// list and performs no network activity at all. Without one, each
/// installed driver gets a trial connection with the settings' probe
/// timeout, and the first that succeeds wins. If no driver succeeds the
/// selection is left empty and the failure surfaces on first use.
///
/// # Errors
///
/// Returns `DwhError::Config` if no drivers are installed or the index
/// is out of range.
pub fn select_driver(
    backend: &dyn Backend,
    settings: &ConnectionSettings,
    driver_index: Option<usize>,
) -> Result<String> {
    let installed = backend.driver_names()?;
    if installed.is_empty() {
        return Err(DwhError::Config(
            "no ODBC drivers are installed on this system".to_string(),
        ));
    }

    match driver_index {
        Some(index) => {
            if index >= installed.len() {
                return Err(DwhError::Config(format!(
                    "driver index {} is out of range; {} drivers are installed",
                    index,
                    installed.len()
                )));
            }
            Ok(installed[index].clone())
        }
        None => Ok(probe_drivers(backend, settings, &installed)),
    }
}

/// Trial-connects each installed driver and returns the first success,
/// or an empty selection when every probe fails.
fn probe_drivers(
    backend: &dyn Backend,
    settings: &ConnectionSettings,
    installed: &[String],
) -> String {
    for driver in installed {
        let connection_string = settings.connection_string(driver);
        match backend.connect(&connection_string, Some(settings.probe_timeout)) {
            Ok(_) => {
                info!(driver = %driver, "selected driver by trial connection");
                return driver.clone();
            }
            Err(err) => {
                info!(driver = %driver, error = %err, "driver could not connect");
            }
        }
    }

    warn!("no installed driver passed a trial connection; leaving driver unselected");
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ConnectScript, ScriptedBackend};

    fn settings() -> ConnectionSettings {
        ConnectionSettings::new("srv", "db", "user", "pass")
    }

    #[test]
    fn test_valid_index_selects_without_probing() {
        let backend = ScriptedBackend::with_drivers(vec!["Driver1", "Driver2", "Driver3"]);
        let driver = select_driver(&backend, &settings(), Some(1)).unwrap();
        assert_eq!(driver, "Driver2");
        // No trial connections were made
        assert_eq!(backend.probe_count(), 0);
    }

    #[test]
    fn test_out_of_range_index_is_a_config_error() {
        let backend = ScriptedBackend::with_drivers(vec!["Driver1", "Driver2"]);
        let err = select_driver(&backend, &settings(), Some(2)).unwrap_err();
        match err {
            DwhError::Config(msg) => {
                assert!(msg.contains("driver index 2"));
                assert!(msg.contains("2 drivers"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
        assert_eq!(backend.probe_count(), 0);
    }

    #[test]
    fn test_no_installed_drivers_is_a_config_error() {
        let backend = ScriptedBackend::with_drivers(Vec::<&str>::new());
        let err = select_driver(&backend, &settings(), None).unwrap_err();
        assert!(matches!(err, DwhError::Config(_)));
    }

    #[test]
    fn test_probing_selects_first_driver_that_connects() {
        let backend = ScriptedBackend::with_drivers(vec!["Driver1", "Driver2", "Driver3"]);
        backend.script_connect(ConnectScript::transient("Driver1 refused"));
        backend.script_connect(ConnectScript::success());

        let driver = select_driver(&backend, &settings(), None).unwrap();
        assert_eq!(driver, "Driver2");
        assert_eq!(backend.probe_count(), 2);
    }

    #[test]
    fn test_probing_leaves_selection_empty_when_all_fail() {
        let backend = ScriptedBackend::with_drivers(vec!["Driver1", "Driver2"]);
        backend.script_connect(ConnectScript::transient("down"));
        backend.script_connect(ConnectScript::transient("down"));

        let driver = select_driver(&backend, &settings(), None).unwrap();
        assert_eq!(driver, "");
        assert_eq!(backend.probe_count(), 2);
    }
}
