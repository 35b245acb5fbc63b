use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::error::SqliteAccessError;
use crate::types::Value;

/// Values are handed to the engine as borrowed output; `rusqlite` binds borrowed text and blobs
/// with `SQLITE_TRANSIENT`, so the engine copies the bytes before the call returns.
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b.as_slice()),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// Bind every slot of `params` (1-based, in order) onto a compiled statement.
///
/// # Errors
/// Returns [`SqliteAccessError::EngineError`] if the engine rejects a binding.
pub(crate) fn bind_params(
    stmt: &mut rusqlite::Statement<'_>,
    params: &[Value],
) -> Result<(), SqliteAccessError> {
    for (idx, value) in params.iter().enumerate() {
        stmt.raw_bind_parameter(idx + 1, value)
            .map_err(SqliteAccessError::EngineError)?;
    }
    Ok(())
}

/// Validate a 1-based parameter position against the statement's parameter count.
pub(crate) fn check_position(position: usize, count: usize) -> Result<usize, SqliteAccessError> {
    if position == 0 || position > count {
        return Err(SqliteAccessError::EngineError(
            rusqlite::Error::InvalidParameterCount(position, count),
        ));
    }
    Ok(position - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;

    #[test]
    fn text_and_blob_are_borrowed() {
        let text = Value::from("hello");
        match text.to_sql().unwrap() {
            ToSqlOutput::Borrowed(ValueRef::Text(bytes)) => assert_eq!(bytes, b"hello"),
            other => panic!("unexpected output {other:?}"),
        }

        let blob = Value::Blob(Blob::from([0x41u8; 4]));
        match blob.to_sql().unwrap() {
            ToSqlOutput::Borrowed(ValueRef::Blob(bytes)) => assert_eq!(bytes, b"AAAA"),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn positions_are_one_based() {
        assert!(check_position(0, 2).is_err());
        assert_eq!(check_position(1, 2).unwrap(), 0);
        assert_eq!(check_position(2, 2).unwrap(), 1);
        assert!(matches!(
            check_position(3, 2),
            Err(SqliteAccessError::EngineError(
                rusqlite::Error::InvalidParameterCount(3, 2)
            ))
        ));
    }

    #[test]
    fn binds_against_live_statement() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ?1, ?2, ?3").unwrap();
        let params = vec![Value::Integer(7), Value::from("x"), Value::Null];
        bind_params(&mut stmt, &params).unwrap();
        let mut rows = stmt.raw_query();
        let row = rows.next().unwrap().unwrap();
        assert_eq!(row.get::<_, i64>(0).unwrap(), 7);
        assert_eq!(row.get::<_, String>(1).unwrap(), "x");
        assert_eq!(row.get::<_, Option<i64>>(2).unwrap(), None);
    }
}
