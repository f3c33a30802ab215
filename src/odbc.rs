/// ODBC Backend Module
///
/// Production implementation of the [`Backend`]/[`Session`] traits over
/// the platform's ODBC driver manager, via the `odbc-api` crate. Only
/// compiled with the `odbc` feature, so the rest of the crate and its
/// tests need no driver manager installed.
///
/// One process-wide ODBC environment is shared by every backend handle.
/// Sessions run with autocommit off; the write path decides when to
/// commit. Result cells come back through ODBC's text protocol, so the
/// read path surfaces `Text` and `Null` cells; typed decoding happens
/// downstream where the column domains are known.
use crate::core::db::backend::{Backend, Session};
use crate::core::db::query::{ResultSet, Value};
use crate::core::{DwhError, Result};
use odbc_api::buffers::TextRowSet;
use odbc_api::handles::StatementImpl;
use odbc_api::{
    Connection, ConnectionOptions, Cursor, CursorImpl, Environment, IntoParameter,
    ResultSetMetadata,
};
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Rows fetched per ODBC block cursor round trip.
const BATCH_SIZE: usize = 1024;

/// Upper bound on a single text cell, in bytes.
const MAX_CELL_BYTES: usize = 4096;

static ENVIRONMENT: Lazy<std::result::Result<Environment, odbc_api::Error>> =
    Lazy::new(Environment::new);

fn environment() -> Result<&'static Environment> {
    match ENVIRONMENT.as_ref() {
        Ok(environment) => Ok(environment),
        Err(err) => Err(DwhError::Database(format!(
            "ODBC environment failed to initialize: {err}"
        ))),
    }
}

/// A [`Backend`] over the platform's ODBC driver manager.
#[derive(Debug, Default)]
pub struct OdbcBackend;

impl OdbcBackend {
    pub fn new() -> Self {
        OdbcBackend
    }
}

impl Backend for OdbcBackend {
    fn driver_names(&self) -> Result<Vec<String>> {
        let drivers = environment()?.drivers().map_err(classify)?;
        Ok(drivers.into_iter().map(|d| d.description).collect())
    }

    fn connect(
        &self,
        connection_string: &str,
        login_timeout: Option<Duration>,
    ) -> Result<Box<dyn Session>> {
        let options = ConnectionOptions {
            login_timeout_sec: login_timeout.map(|t| t.as_secs() as u32),
            ..ConnectionOptions::default()
        };
        let connection = environment()?
            .connect_with_connection_string(connection_string, options)
            .map_err(classify)?;
        connection.set_autocommit(false).map_err(classify)?;
        Ok(Box::new(OdbcSession {
            connection,
            sets: VecDeque::new(),
            current: None,
        }))
    }
}

/// A [`Session`] over one live ODBC connection.
///
/// ODBC cursors borrow their connection, so the result sets of a
/// statement are materialized in full while the cursor is alive and
/// replayed afterwards. The warehouse's result sets are bounded by the
/// stored procedures that produce them, the same assumption the block
/// cursor's batch size makes.
pub struct OdbcSession {
    connection: Connection<'static>,
    sets: VecDeque<ResultSet>,
    current: Option<ResultSet>,
}

impl Session for OdbcSession {
    fn execute(&mut self, query: &str, params: &[Value]) -> Result<()> {
        let params = bind_parameters(params);
        let maybe_cursor = self
            .connection
            .execute(query, &params[..])
            .map_err(classify)?;
        self.sets = match maybe_cursor {
            Some(cursor) => materialize(cursor)?,
            None => VecDeque::new(),
        };
        debug!(sets = self.sets.len(), "statement executed");
        self.current = self.sets.pop_front();
        Ok(())
    }

    fn column_names(&self) -> Result<Vec<String>> {
        self.current
            .as_ref()
            .map(|set| set.columns.clone())
            .ok_or_else(|| DwhError::Query("statement produced no result set".to_string()))
    }

    fn fetch_rows(&mut self) -> Result<Vec<Vec<Value>>> {
        match self.current.as_mut() {
            Some(set) => Ok(std::mem::take(&mut set.rows)),
            None => Err(DwhError::Query(
                "statement produced no result set".to_string(),
            )),
        }
    }

    fn more_results(&mut self) -> Result<bool> {
        self.current = self.sets.pop_front();
        Ok(self.current.is_some())
    }

    fn commit(&mut self) -> Result<()> {
        self.connection.commit().map_err(classify)
    }
}

/// Drains every result set of a live cursor into owned data.
///
/// Row-count-only results (zero columns, emitted between the sets of a
/// multi-statement batch) are skipped.
fn materialize(cursor: CursorImpl<StatementImpl<'_>>) -> Result<VecDeque<ResultSet>> {
    let mut sets = VecDeque::new();
    let mut maybe_cursor = Some(cursor);
    while let Some(mut cursor) = maybe_cursor {
        let columns: Vec<String> = cursor
            .column_names()
            .map_err(classify)?
            .collect::<std::result::Result<_, _>>()
            .map_err(classify)?;

        if columns.is_empty() {
            maybe_cursor = cursor.more_results().map_err(classify)?;
            continue;
        }

        let mut buffer =
            TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_CELL_BYTES)).map_err(classify)?;
        let mut block_cursor = cursor.bind_buffer(&mut buffer).map_err(classify)?;
        let mut rows = Vec::new();
        while let Some(batch) = block_cursor.fetch().map_err(classify)? {
            for row_index in 0..batch.num_rows() {
                let row = (0..batch.num_cols())
                    .map(|col_index| match batch.at(col_index, row_index) {
                        Some(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                        None => Value::Null,
                    })
                    .collect();
                rows.push(row);
            }
        }
        let (cursor, _) = block_cursor.unbind().map_err(classify)?;
        sets.push_back(ResultSet::new(columns, rows));
        maybe_cursor = cursor.more_results().map_err(classify)?;
    }
    Ok(sets)
}

/// Converts typed values into ODBC input parameters.
fn bind_parameters(values: &[Value]) -> Vec<Box<dyn odbc_api::parameter::InputParameter>> {
    values
        .iter()
        .map(
            |value| -> Box<dyn odbc_api::parameter::InputParameter> {
                match value {
                    Value::Null => Box::new(None::<String>.into_parameter()),
                    Value::Int(i) => Box::new((*i).into_parameter()),
                    Value::Float(f) => Box::new((*f).into_parameter()),
                    Value::Bool(b) => Box::new((*b).into_parameter()),
                    Value::Text(t) => Box::new(t.clone().into_parameter()),
                    Value::Timestamp(ts) => {
                        Box::new(ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string().into_parameter())
                    }
                    Value::Bytes(b) => Box::new(b.clone().into_parameter()),
                }
            },
        )
        .collect()
}

/// Maps a driver error onto the crate's taxonomy via its SQLSTATE.
fn classify(err: odbc_api::Error) -> DwhError {
    match &err {
        odbc_api::Error::Diagnostics { record, .. } => {
            let state = std::str::from_utf8(&record.state.0)
                .unwrap_or("")
                .to_string();
            classify_state(&state, err.to_string())
        }
        _ => DwhError::Database(err.to_string()),
    }
}

/// SQLSTATE class to error variant. Unrecognized classes fall back to
/// the generic (retryable) database error, matching how the driver
/// taxonomy treats unclassified failures.
fn classify_state(state: &str, message: String) -> DwhError {
    if state.starts_with("HYT") {
        DwhError::Timeout(message)
    } else if state.starts_with("08") {
        DwhError::Operational(message)
    } else if state.starts_with("42") || state.starts_with("37") {
        DwhError::Programming(message)
    } else if state.starts_with("22") {
        DwhError::Data(message)
    } else if state.starts_with("23") {
        DwhError::Integrity(message)
    } else if state == "0A000" {
        DwhError::NotSupported(message)
    } else {
        DwhError::Database(message)
    }
}
