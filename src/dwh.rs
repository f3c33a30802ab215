/// Warehouse Accessor Module
///
/// `Dwh` is the entry point for talking to the data warehouse. Every
/// public call follows the same bracket: open a fresh connection (with
/// a bounded retry loop), do the work, and close the connection again.
/// No session is ever held between calls, so a `Dwh` can sit idle for
/// hours without pinning warehouse resources.
///
/// The driver is chosen once, at construction time, and used for the
/// accessor's whole lifetime. The backend is injected, which keeps the
/// retry and drain machinery runnable against a scripted backend in
/// tests and against the ODBC driver manager in production.
use crate::core::db::backend::{Backend, Session};
use crate::core::db::connection::{ConnectState, ConnectionSettings};
use crate::core::db::driver::select_driver;
use crate::core::db::query::{ResultSet, Value};
use crate::core::{DwhError, Result};
use crate::table::Table;
use tracing::{error, info, warn};

/// Single-use-connection accessor for a SQL data warehouse.
///
/// Synchronous and single-threaded. The accessor holds no live session
/// between calls; callers that share one across threads must serialize
/// access themselves.
pub struct Dwh {
    settings: ConnectionSettings,
    backend: Box<dyn Backend>,
    driver: String,
    state: ConnectState,
}

impl Dwh {
    /// Builds an accessor and selects its driver.
    ///
    /// Driver selection happens eagerly so misconfiguration surfaces
    /// here instead of on the first query. No persistent connection is
    /// opened; probing trial connections are closed immediately.
    ///
    /// # Errors
    ///
    /// Returns `DwhError::Config` if no drivers are installed or the
    /// settings name an out-of-range driver index.
    pub fn new(backend: Box<dyn Backend>, settings: ConnectionSettings) -> Result<Self> {
        let driver = select_driver(backend.as_ref(), &settings, settings.driver_index)?;
        Ok(Dwh {
            settings,
            backend,
            driver,
            state: ConnectState::Disconnected,
        })
    }

    /// The driver name selected at construction time. Empty when every
    /// probe failed; in that case the first query reports the failure.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// The connection string the accessor connects with.
    pub fn connection_string(&self) -> String {
        self.settings.connection_string(&self.driver)
    }

    /// The current connect-phase state.
    pub fn state(&self) -> ConnectState {
        self.state
    }

    /// Whether a session is currently open. Outside of an in-flight
    /// call this is always `false`.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectState::Connected
    }

    /// Runs a read query and drains every result set it produces, in
    /// production order. A query that returns no rows yields a single
    /// empty result set.
    ///
    /// The connection is closed before this returns, on success and on
    /// failure alike.
    pub fn fetch(&mut self, query: &str) -> Result<Vec<ResultSet>> {
        let mut session = self.connect()?;
        let result = session
            .execute(query, &[])
            .and_then(|_| drain_result_sets(session.as_mut()));
        self.disconnect(session);
        result
    }

    /// Like [`fetch`](Dwh::fetch), but returns only the first result
    /// set. An invocation that produced none yields an empty set.
    pub fn fetch_first(&mut self, query: &str) -> Result<ResultSet> {
        let mut sets = self.fetch(query)?;
        if sets.is_empty() {
            Ok(ResultSet::empty())
        } else {
            Ok(sets.swap_remove(0))
        }
    }

    /// Like [`fetch`](Dwh::fetch), but shapes each result set into a
    /// renderable [`Table`].
    pub fn fetch_tables(&mut self, query: &str) -> Result<Vec<Table>> {
        Ok(self
            .fetch(query)?
            .into_iter()
            .map(Table::from_result_set)
            .collect())
    }

    /// Runs a write statement with positional parameters and commits.
    ///
    /// After a successful execute the statement's result rows are
    /// collected when it produced any (a stored procedure returning a
    /// generated identity, say). A failure while collecting those rows
    /// is logged and yields an empty collection; the commit still
    /// happens. Execute and commit failures propagate.
    pub fn execute(&mut self, query: &str, params: &[Value]) -> Result<Vec<Vec<Value>>> {
        let mut session = self.connect()?;
        let result = match session.execute(query, params) {
            Ok(()) => {
                let rows = match session.fetch_rows() {
                    Ok(rows) => rows,
                    Err(err) => {
                        warn!(error = %err, "statement produced no fetchable rows");
                        Vec::new()
                    }
                };
                session.commit().map(|_| rows)
            }
            Err(err) => Err(err),
        };
        self.disconnect(session);
        result
    }

    /// Opens a session, retrying transient failures until the attempt
    /// budget is spent.
    ///
    /// Terminal errors propagate after a single attempt. When the
    /// budget runs out the last transient error is folded into
    /// `ConnectionExhausted`.
    fn connect(&mut self) -> Result<Box<dyn Session>> {
        self.state = ConnectState::Connecting;
        let connection_string = self.settings.connection_string(&self.driver);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.backend.connect(&connection_string, None) {
                Ok(session) => {
                    self.state = ConnectState::Connected;
                    info!(
                        attempt,
                        server = %self.settings.server,
                        database = %self.settings.database,
                        "connected to the data warehouse"
                    );
                    return Ok(session);
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempt, error = %err, "connect attempt failed");
                    if attempt >= self.settings.connection_attempts {
                        self.state = ConnectState::Failed;
                        return Err(DwhError::ConnectionExhausted { attempts: attempt });
                    }
                }
                Err(err) => {
                    self.state = ConnectState::Failed;
                    error!(error = %err, "connect failed with a non-retryable error");
                    return Err(err);
                }
            }
        }
    }

    /// Closes the session. Sessions are scoped to a single public call,
    /// so this runs on every exit path.
    fn disconnect(&mut self, session: Box<dyn Session>) {
        drop(session);
        self.state = ConnectState::Disconnected;
    }
}

impl std::fmt::Debug for Dwh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dwh")
            .field("settings", &self.settings)
            .field("driver", &self.driver)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Drains the active result set and every one after it.
fn drain_result_sets(session: &mut dyn Session) -> Result<Vec<ResultSet>> {
    let mut sets = Vec::new();
    loop {
        let columns = session.column_names()?;
        let rows = session.fetch_rows()?;
        sets.push(ResultSet::new(columns, rows));
        if !session.more_results()? {
            break;
        }
    }
    Ok(sets)
}
