use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::SqliteAccessError;

use super::config::{ConnectionOptions, Mode};
use super::prepared::Statement;

/// One open engine handle for a `(path, mode)` pair.
///
/// Connections are handed out as `Arc<Connection>` by the [`ConnectionCache`](crate::ConnectionCache)
/// and may be shared freely across threads; the engine handle sits behind a lock that is held
/// only for the duration of a single engine call sequence (prepare, one execution pass, a batch).
pub struct Connection {
    path: String,
    mode: Mode,
    handle: Mutex<Option<rusqlite::Connection>>,
}

impl Connection {
    /// Open `path` under `mode` and apply `options`.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::OpenError`] if the engine cannot open the file under that mode
    /// or rejects one of the options.
    pub(crate) fn open(
        path: &str,
        mode: Mode,
        options: &ConnectionOptions,
    ) -> Result<Self, SqliteAccessError> {
        let handle = rusqlite::Connection::open_with_flags(path, mode.open_flags())
            .map_err(|e| SqliteAccessError::open(path, e))?;
        apply_options(&handle, mode, options).map_err(|e| SqliteAccessError::open(path, e))?;
        tracing::debug!(path, ?mode, "opened sqlite connection");

        Ok(Self {
            path: path.to_owned(),
            mode,
            handle: Mutex::new(Some(handle)),
        })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Compile `sql` against this connection.
    ///
    /// The compiled form is kept in the connection's statement cache and reused by every
    /// execution pass of the returned [`Statement`].
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::CompileError`] if the text is not valid SQL or references
    /// unknown schema objects. The connection remains usable.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>, SqliteAccessError> {
        let (parameter_count, column_names) = self.with_handle(|handle| {
            let stmt = handle
                .prepare_cached(sql)
                .map_err(SqliteAccessError::CompileError)?;
            let column_names: Vec<String> = stmt
                .column_names()
                .iter()
                .map(std::string::ToString::to_string)
                .collect();
            Ok((stmt.parameter_count(), column_names))
        })?;
        tracing::trace!(sql, parameter_count, "prepared statement");
        Ok(Statement::new(
            self,
            sql.to_owned(),
            parameter_count,
            column_names,
        ))
    }

    /// Run one or more `;`-separated statements without parameters, discarding any rows.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::EngineError`] if any statement fails to compile or run.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqliteAccessError> {
        self.with_handle(|handle| {
            handle
                .execute_batch(sql)
                .map_err(SqliteAccessError::EngineError)
        })
    }

    /// Rowid of the most recent successful INSERT on this connection.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::Misuse`] if the handle has already been closed.
    pub fn last_insert_rowid(&self) -> Result<i64, SqliteAccessError> {
        self.with_handle(|handle| Ok(handle.last_insert_rowid()))
    }

    /// Run `func` with exclusive access to the engine handle.
    pub(crate) fn with_handle<F, R>(&self, func: F) -> Result<R, SqliteAccessError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<R, SqliteAccessError>,
    {
        let guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(handle) => func(handle),
            None => Err(SqliteAccessError::Misuse(format!(
                "connection to {} is closed",
                self.path
            ))),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let handle = self
            .handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            match close_handle(handle) {
                Ok(()) => tracing::debug!(path = %self.path, mode = ?self.mode, "closed sqlite connection"),
                Err(err) => tracing::warn!(
                    path = %self.path,
                    mode = ?self.mode,
                    error = %err,
                    "failed to close sqlite connection"
                ),
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn apply_options(
    handle: &rusqlite::Connection,
    mode: Mode,
    options: &ConnectionOptions,
) -> rusqlite::Result<()> {
    handle.set_prepared_statement_cache_capacity(options.statement_cache_capacity);
    if let Some(timeout) = options.busy_timeout {
        handle.busy_timeout(timeout)?;
    }
    if options.wal && mode.is_writable() {
        let journal_mode: String =
            handle.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        tracing::debug!(journal_mode = %journal_mode, "applied journal mode");
    }
    Ok(())
}

/// Finalize every compiled statement the handle still tracks, then close it.
///
/// Statement wrappers borrow their connection, so none can be mid-pass here; whatever remains
/// lives in the statement cache and is released before the engine is asked to close.
pub(crate) fn close_handle(handle: rusqlite::Connection) -> Result<(), SqliteAccessError> {
    handle.flush_prepared_statement_cache();
    handle
        .close()
        .map_err(|(_, err)| SqliteAccessError::EngineError(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::prepared::Step;
    use crate::types::Value;

    fn open_scratch(dir: &tempfile::TempDir) -> Connection {
        let path = dir.path().join("scratch.db");
        let conn = Connection::open(
            path.to_str().unwrap(),
            Mode::Create,
            &ConnectionOptions::default(),
        )
        .unwrap();
        conn.execute_batch(
            "CREATE TABLE test (code INTEGER, desc TEXT);
             INSERT INTO test (code, desc) VALUES (1, 'one'), (2, 'hello'), (3, 'three');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn read_only_open_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let err = Connection::open(
            path.to_str().unwrap(),
            Mode::ReadOnly,
            &ConnectionOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SqliteAccessError::OpenError { .. }));
        assert!(err.to_string().starts_with("Could not open database"));
        assert!(!path.exists());
    }

    #[test]
    fn compile_error_leaves_connection_usable() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_scratch(&dir);

        let err = conn.prepare("SELEC desc FROM test").unwrap_err();
        assert!(matches!(err, SqliteAccessError::CompileError(_)));
        let err = conn.prepare("SELECT desc FROM no_such_table").unwrap_err();
        assert!(matches!(err, SqliteAccessError::CompileError(_)));

        let mut stmt = conn.prepare("SELECT count(*) AS n FROM test").unwrap();
        let table = stmt.fetch_all().unwrap();
        assert_eq!(table.rows[0].get("n"), Some(&Value::Integer(3)));
    }

    #[test]
    fn close_releases_cached_statements() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_scratch(&dir);
        // each distinct text leaves a compiled statement in the handle's cache
        {
            let mut first = conn.prepare("SELECT desc FROM test ORDER BY code").unwrap();
            let mut second = conn.prepare("SELECT code FROM test WHERE code > ?").unwrap();
            let _third = conn.prepare("UPDATE test SET desc = ? WHERE code = ?").unwrap();
            second.bind(1, 1).unwrap();
            assert_eq!(second.step().unwrap(), Step::Row);
            assert_eq!(first.step().unwrap(), Step::Row);
            drop(first);
            // `second` and `_third` are dropped after `first`, mid-pass and unexecuted
        }

        let mut conn = conn;
        let handle = conn.handle.get_mut().unwrap().take().unwrap();
        handle
            .prepare_cached("SELECT count(*) FROM test")
            .unwrap()
            .query_row([], |row| row.get::<_, i64>(0))
            .unwrap();
        close_handle(handle).unwrap();
        assert!(conn.prepare("SELECT 1").is_err());
    }

    #[test]
    fn last_insert_rowid_tracks_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_scratch(&dir);
        conn.execute_batch("CREATE TABLE ids (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT);")
            .unwrap();
        let mut insert = conn.prepare("INSERT INTO ids (v) VALUES (?)").unwrap();
        insert.bind(1, "a").unwrap();
        insert.fetch_all().unwrap();
        assert_eq!(conn.last_insert_rowid().unwrap(), 1);
    }

    #[test]
    fn wal_option_switches_journal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let opts = ConnectionOptions::builder().wal(true).finish();
        let conn = Connection::open(path.to_str().unwrap(), Mode::Create, &opts).unwrap();
        let mut stmt = conn.prepare("PRAGMA journal_mode").unwrap();
        let table = stmt.fetch_all().unwrap();
        assert_eq!(
            table.rows[0].get_by_index(0).and_then(|v| v.as_text().ok()),
            Some("wal")
        );
    }
}
