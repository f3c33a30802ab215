/// # Test Support Module
///
/// Scripted implementations of the [`Backend`]/[`Session`] traits so the
/// accessor's retry and result-set draining logic can be exercised
/// without a database or an installed driver manager.
///
/// A [`ScriptedBackend`] is loaded with an ordered list of
/// [`ConnectScript`] outcomes; each connect attempt consumes the next
/// one. Counters distinguish driver-probing trial connections (which
/// carry a login timeout) from real connect attempts, and a cloneable
/// [`ScriptedStats`] handle keeps those counters observable after the
/// backend has been moved into a `Dwh`.
///
/// Not thread-safe; intended for single-threaded tests, matching the
/// accessor's own single-threaded design.
use crate::core::db::backend::{Backend, Session};
use crate::core::db::query::{ResultSet, Value};
use crate::core::{DwhError, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Observable side effects of a scripted backend.
#[derive(Clone, Default)]
pub struct ScriptedStats {
    connects: Rc<RefCell<usize>>,
    probes: Rc<RefCell<usize>>,
    commits: Rc<RefCell<usize>>,
    queries: Rc<RefCell<Vec<String>>>,
}

impl ScriptedStats {
    /// Connect attempts made without a login timeout (the retry loop).
    pub fn connect_attempts(&self) -> usize {
        *self.connects.borrow()
    }

    /// Trial connections made with a login timeout (driver probing).
    pub fn probe_attempts(&self) -> usize {
        *self.probes.borrow()
    }

    pub fn commit_count(&self) -> usize {
        *self.commits.borrow()
    }

    pub fn executed_queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

/// The scripted outcome of one connect attempt.
pub struct ConnectScript {
    outcome: Outcome,
}

enum Outcome {
    Success(SessionScript),
    Transient(String),
    Terminal(String),
}

struct SessionScript {
    sets: Vec<ResultSet>,
    execute_error: Option<String>,
    fetch_error: bool,
}

impl ConnectScript {
    /// A connection that succeeds and yields a single empty result set.
    pub fn success() -> Self {
        ConnectScript::with_sets(vec![ResultSet::empty()])
    }

    /// A connection that succeeds and replays the given result sets.
    pub fn with_sets(sets: Vec<ResultSet>) -> Self {
        ConnectScript {
            outcome: Outcome::Success(SessionScript {
                sets,
                execute_error: None,
                fetch_error: false,
            }),
        }
    }

    /// A connection that fails with a retryable operational error.
    pub fn transient(message: impl Into<String>) -> Self {
        ConnectScript {
            outcome: Outcome::Transient(message.into()),
        }
    }

    /// A connection that fails with a terminal programming error.
    pub fn terminal(message: impl Into<String>) -> Self {
        ConnectScript {
            outcome: Outcome::Terminal(message.into()),
        }
    }

    /// Makes `Session::execute` fail with a query error.
    pub fn failing_execute(mut self, message: impl Into<String>) -> Self {
        if let Outcome::Success(script) = &mut self.outcome {
            script.execute_error = Some(message.into());
        }
        self
    }

    /// Makes `Session::fetch_rows` fail with a query error, so the
    /// write path's soft-failure handling can be observed.
    pub fn failing_fetch(mut self) -> Self {
        if let Outcome::Success(script) = &mut self.outcome {
            script.fetch_error = true;
        }
        self
    }
}

/// A [`Backend`] that replays scripted connect outcomes in order.
///
/// When the script runs dry, further connect attempts succeed with an
/// empty session.
pub struct ScriptedBackend {
    drivers: Vec<String>,
    scripts: RefCell<VecDeque<ConnectScript>>,
    stats: ScriptedStats,
}

impl ScriptedBackend {
    pub fn with_drivers<I, S>(drivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedBackend {
            drivers: drivers.into_iter().map(Into::into).collect(),
            scripts: RefCell::new(VecDeque::new()),
            stats: ScriptedStats::default(),
        }
    }

    /// Queues the outcome of the next connect attempt.
    pub fn script_connect(&self, script: ConnectScript) {
        self.scripts.borrow_mut().push_back(script);
    }

    /// A handle to the attempt/commit counters that stays valid after
    /// the backend has been boxed into an accessor.
    pub fn stats(&self) -> ScriptedStats {
        self.stats.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.stats.connect_attempts()
    }

    pub fn probe_count(&self) -> usize {
        self.stats.probe_attempts()
    }
}

impl Backend for ScriptedBackend {
    fn driver_names(&self) -> Result<Vec<String>> {
        Ok(self.drivers.clone())
    }

    fn connect(
        &self,
        _connection_string: &str,
        login_timeout: Option<Duration>,
    ) -> Result<Box<dyn Session>> {
        if login_timeout.is_some() {
            *self.stats.probes.borrow_mut() += 1;
        } else {
            *self.stats.connects.borrow_mut() += 1;
        }

        let script = self
            .scripts
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(ConnectScript::success);

        match script.outcome {
            Outcome::Success(session) => Ok(Box::new(ScriptedSession {
                sets: session.sets.into(),
                current: None,
                execute_error: session.execute_error,
                fetch_error: session.fetch_error,
                stats: self.stats.clone(),
            })),
            Outcome::Transient(msg) => Err(DwhError::Operational(msg)),
            Outcome::Terminal(msg) => Err(DwhError::Programming(msg)),
        }
    }
}

/// A [`Session`] that replays scripted result sets.
pub struct ScriptedSession {
    sets: VecDeque<ResultSet>,
    current: Option<ResultSet>,
    execute_error: Option<String>,
    fetch_error: bool,
    stats: ScriptedStats,
}

impl Session for ScriptedSession {
    fn execute(&mut self, query: &str, _params: &[Value]) -> Result<()> {
        if let Some(msg) = self.execute_error.take() {
            return Err(DwhError::Query(msg));
        }
        self.stats.queries.borrow_mut().push(query.to_string());
        self.current = self.sets.pop_front();
        Ok(())
    }

    fn column_names(&self) -> Result<Vec<String>> {
        self.current
            .as_ref()
            .map(|set| set.columns.clone())
            .ok_or_else(|| DwhError::Query("no active result set".to_string()))
    }

    fn fetch_rows(&mut self) -> Result<Vec<Vec<Value>>> {
        if self.fetch_error {
            return Err(DwhError::Query("scripted fetch failure".to_string()));
        }
        match self.current.as_mut() {
            Some(set) => Ok(std::mem::take(&mut set.rows)),
            None => Err(DwhError::Query("no active result set".to_string())),
        }
    }

    fn more_results(&mut self) -> Result<bool> {
        self.current = self.sets.pop_front();
        Ok(self.current.is_some())
    }

    fn commit(&mut self) -> Result<()> {
        *self.stats.commits.borrow_mut() += 1;
        Ok(())
    }
}
