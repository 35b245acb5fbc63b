use std::collections::VecDeque;

use rusqlite::types::{FromSql, FromSqlResult, ValueRef};

use crate::blob::Blob;
use crate::error::SqliteAccessError;
use crate::types::Value;

use super::params::bind_params;

/// Convert one engine column into an owned [`Value`].
///
/// Text and blob payloads point at engine memory that is only valid until the next step, so
/// they are copied here. Text that is not valid UTF-8 is decoded lossily.
#[must_use]
pub fn extract_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(Blob::from(bytes)),
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(extract_value(value))
    }
}

/// Read every column of the current engine row, left to right.
///
/// # Errors
/// Returns [`SqliteAccessError::EngineError`] if a column cannot be read.
pub(crate) fn extract_row(
    row: &rusqlite::Row<'_>,
    column_count: usize,
) -> Result<Vec<Value>, SqliteAccessError> {
    let mut values = Vec::with_capacity(column_count);
    for idx in 0..column_count {
        let value: Value = row.get(idx).map_err(SqliteAccessError::EngineError)?;
        values.push(value);
    }
    Ok(values)
}

/// Rows produced by one execution pass, plus the column names the engine reported for it.
///
/// A step failure does not discard the rows produced before it: they stay in `rows` and the
/// failure is kept in `failure`, to be reported once those rows have been consumed.
pub(crate) struct Pass {
    pub(crate) column_names: Vec<String>,
    pub(crate) rows: VecDeque<Vec<Value>>,
    pub(crate) failure: Option<SqliteAccessError>,
}

/// Bind `params`, step the statement until the engine reports completion or failure and copy out
/// every row produced.
///
/// The statement is reset by the engine when the row cursor is dropped.
///
/// # Errors
/// Returns [`SqliteAccessError::EngineError`] if a parameter cannot be bound. Step failures are
/// recorded in [`Pass::failure`] instead.
pub(crate) fn run_pass(
    stmt: &mut rusqlite::Statement<'_>,
    params: &[Value],
) -> Result<Pass, SqliteAccessError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let column_count = column_names.len();

    bind_params(stmt, params)?;

    let mut rows = VecDeque::new();
    let mut failure = None;
    let mut cursor = stmt.raw_query();
    loop {
        match cursor.next() {
            Ok(Some(row)) => match extract_row(row, column_count) {
                Ok(values) => rows.push_back(values),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            },
            Ok(None) => break,
            Err(err) => {
                failure = Some(SqliteAccessError::EngineError(err));
                break;
            }
        }
    }

    Ok(Pass {
        column_names,
        rows,
        failure,
    })
}
