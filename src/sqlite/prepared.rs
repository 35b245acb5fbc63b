use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::error::SqliteAccessError;
use crate::results::{Columns, Row, Table};
use crate::types::Value;

use super::connection::Connection;
use super::params::check_position;
use super::query::run_pass;

/// Execution position of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Freshly prepared or reset; parameters may be bound.
    Ready,
    /// A row is available to [`Statement::fetch_row`].
    HasRow,
    /// The pass is exhausted.
    Done,
    /// The pass failed; only [`Statement::reset`] leaves this state.
    Error,
}

/// Outcome of [`Statement::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Row,
    Done,
}

/// A compiled, parameterized query tied to the [`Connection`] that prepared it.
///
/// A statement borrows its connection, so it can never outlive the engine handle. All mutating
/// operations take `&mut self`; a statement is confined to one owner at a time while the
/// connection itself stays shareable.
///
/// The first [`step`](Statement::step) after `Ready` runs one execution pass under the connection
/// lock: parameters are bound, the engine is stepped until it finishes or fails and every row it
/// produced is copied out. Steps then hand out those rows one at a time; an engine failure is
/// raised by the step that would have read past the last row produced before it.
pub struct Statement<'conn> {
    conn: &'conn Connection,
    sql: String,
    parameter_count: usize,
    params: Vec<Value>,
    columns: Arc<Columns>,
    pending: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    failure: Option<SqliteAccessError>,
    state: StatementState,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn new(
        conn: &'conn Connection,
        sql: String,
        parameter_count: usize,
        column_names: Vec<String>,
    ) -> Self {
        Self {
            conn,
            sql,
            parameter_count,
            params: vec![Value::Null; parameter_count],
            columns: Arc::new(Columns::new(column_names)),
            pending: VecDeque::new(),
            current: None,
            failure: None,
            state: StatementState::Ready,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Number of `?` slots in the SQL text.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Result column names, as of the latest execution pass (or of compilation before the first).
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    #[must_use]
    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Bind `value` to the 1-based parameter `position`, replacing any earlier binding.
    ///
    /// The value is owned by the statement from here on; the engine receives its own copy of text
    /// and blob payloads when the pass runs.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::Misuse`] outside the `Ready` state and
    /// [`SqliteAccessError::EngineError`] if `position` is out of range.
    pub fn bind(
        &mut self,
        position: usize,
        value: impl Into<Value>,
    ) -> Result<(), SqliteAccessError> {
        self.expect_state(StatementState::Ready, "bind")?;
        let idx = check_position(position, self.parameter_count)?;
        self.params[idx] = value.into();
        Ok(())
    }

    /// Bind `values` to consecutive positions starting at 1.
    ///
    /// # Errors
    /// Same as [`bind`](Statement::bind); binding stops at the first failure.
    pub fn bind_all<I>(&mut self, values: I) -> Result<(), SqliteAccessError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        for (idx, value) in values.into_iter().enumerate() {
            self.bind(idx + 1, value)?;
        }
        Ok(())
    }

    /// Advance to the next row.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::EngineError`] (moving to `Error`) if the engine fails, and
    /// [`SqliteAccessError::Misuse`] when called from `Done` or `Error`.
    pub fn step(&mut self) -> Result<Step, SqliteAccessError> {
        match self.state {
            StatementState::Ready => self.execute()?,
            StatementState::HasRow => {}
            StatementState::Done | StatementState::Error => {
                return Err(SqliteAccessError::Misuse(format!(
                    "step called in {:?} state; reset the statement first",
                    self.state
                )));
            }
        }

        if let Some(values) = self.pending.pop_front() {
            self.current = Some(values);
            self.state = StatementState::HasRow;
            Ok(Step::Row)
        } else if let Some(err) = self.failure.take() {
            self.current = None;
            self.state = StatementState::Error;
            Err(err)
        } else {
            self.current = None;
            self.state = StatementState::Done;
            Ok(Step::Done)
        }
    }

    /// Materialize the current row.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::Misuse`] unless the statement is in `HasRow`.
    pub fn fetch_row(&self) -> Result<Row, SqliteAccessError> {
        self.expect_state(StatementState::HasRow, "fetch_row")?;
        let values = self.current.clone().ok_or_else(|| {
            SqliteAccessError::Misuse("fetch_row called without a current row".into())
        })?;
        Ok(Row::new(Arc::clone(&self.columns), values))
    }

    /// Run a whole pass, collect every row, then [`reset`](Statement::reset).
    ///
    /// Bindings are cleared by the reset, so the next pass needs fresh `bind` calls.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::Misuse`] unless the statement is `Ready`, and
    /// [`SqliteAccessError::EngineError`] if the pass fails. A failed pass leaves the statement in
    /// `Error`.
    pub fn fetch_all(&mut self) -> Result<Table, SqliteAccessError> {
        self.expect_state(StatementState::Ready, "fetch_all")?;

        let mut next = self.step()?;
        let mut table = Table::with_capacity(Arc::clone(&self.columns), self.pending.len() + 1);
        while next == Step::Row {
            if let Some(values) = self.current.take() {
                table.add_row_values(values);
            }
            next = self.step()?;
        }

        self.reset();
        Ok(table)
    }

    /// Clear all bindings and return to `Ready` from any state. Never fails.
    pub fn reset(&mut self) {
        self.params.iter_mut().for_each(|p| *p = Value::Null);
        self.pending.clear();
        self.current = None;
        self.failure = None;
        self.state = StatementState::Ready;
    }

    fn execute(&mut self) -> Result<(), SqliteAccessError> {
        let sql = self.sql.as_str();
        let params = self.params.as_slice();
        let result = self.conn.with_handle(|handle| {
            let mut stmt = handle
                .prepare_cached(sql)
                .map_err(SqliteAccessError::EngineError)?;
            run_pass(&mut stmt, params)
        });

        match result {
            Ok(pass) => {
                if pass.column_names != self.columns.names() {
                    self.columns = Arc::new(Columns::new(pass.column_names));
                }
                tracing::trace!(sql = %self.sql, rows = pass.rows.len(), "executed statement");
                self.pending = pass.rows;
                self.failure = pass.failure;
                Ok(())
            }
            Err(err) => {
                self.state = StatementState::Error;
                Err(err)
            }
        }
    }

    fn expect_state(
        &self,
        expected: StatementState,
        operation: &str,
    ) -> Result<(), SqliteAccessError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SqliteAccessError::Misuse(format!(
                "{operation} requires {expected:?} state, statement is {:?}",
                self.state
            )))
        }
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
