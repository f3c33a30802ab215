/// Backend Trait Module
///
/// The seam between the warehouse access logic and the platform driver
/// layer. `Dwh` drives these traits; the `odbc` feature provides the
/// production implementation and `testing::ScriptedBackend` a scripted
/// one, so the retry and drain machinery is testable without a live
/// driver manager.
use crate::core::db::query::Value;
use crate::core::Result;
use std::time::Duration;

/// A source of database sessions.
pub trait Backend {
    /// Names of the client drivers installed on this platform.
    fn driver_names(&self) -> Result<Vec<String>>;

    /// Opens a session using the given connection string.
    ///
    /// `login_timeout` is only supplied during driver probing, where a
    /// short fixed timeout keeps trial connections from hanging.
    fn connect(
        &self,
        connection_string: &str,
        login_timeout: Option<Duration>,
    ) -> Result<Box<dyn Session>>;
}

/// An open database session with a cursor over the active result set.
pub trait Session {
    /// Executes a query with positional parameters. After a successful
    /// call the first result set (if any) is active.
    fn execute(&mut self, query: &str, params: &[Value]) -> Result<()>;

    /// Column names of the active result set, from the query metadata.
    fn column_names(&self) -> Result<Vec<String>>;

    /// Drains all remaining rows of the active result set.
    fn fetch_rows(&mut self) -> Result<Vec<Vec<Value>>>;

    /// Advances to the next result set, reporting whether one exists.
    fn more_results(&mut self) -> Result<bool>;

    /// Commits the current transaction.
    fn commit(&mut self) -> Result<()>;
}
