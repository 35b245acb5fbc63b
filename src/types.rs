use serde::Serialize;

use crate::blob::Blob;
use crate::error::SqliteAccessError;

/// One column value or statement parameter.
///
/// The same enum is used for binding and for fetching, so values read from one statement can be
/// bound straight into another:
/// ```rust
/// use sqlite_access::Value;
///
/// let params = vec![Value::from(2), Value::from("hello"), Value::Null];
/// assert_eq!(params[0].as_integer().unwrap(), 2);
/// assert!(params[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Real(f64),
    /// UTF-8 text
    Text(String),
    /// Binary data
    Blob(Blob),
}

impl Value {
    /// Name of the variant, as used in [`SqliteAccessError::TypeMismatch`].
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// # Errors
    /// Returns [`SqliteAccessError::TypeMismatch`] unless the value is an `Integer`.
    pub fn as_integer(&self) -> Result<i64, SqliteAccessError> {
        match self {
            Value::Integer(i) => Ok(*i),
            other => Err(other.mismatch("integer")),
        }
    }

    /// # Errors
    /// Returns [`SqliteAccessError::TypeMismatch`] unless the value is a `Real`. Integers are not
    /// widened.
    pub fn as_real(&self) -> Result<f64, SqliteAccessError> {
        match self {
            Value::Real(f) => Ok(*f),
            other => Err(other.mismatch("real")),
        }
    }

    /// # Errors
    /// Returns [`SqliteAccessError::TypeMismatch`] unless the value is `Text`.
    pub fn as_text(&self) -> Result<&str, SqliteAccessError> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }

    /// # Errors
    /// Returns [`SqliteAccessError::TypeMismatch`] unless the value is a `Blob`.
    pub fn as_blob(&self) -> Result<&Blob, SqliteAccessError> {
        match self {
            Value::Blob(b) => Ok(b),
            other => Err(other.mismatch("blob")),
        }
    }

    /// Interpret a `"Y"` / `"N"` text flag.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::TypeMismatch`] for non-text values and
    /// [`SqliteAccessError::InvalidFormat`] for any other text.
    pub fn as_boolean(&self) -> Result<bool, SqliteAccessError> {
        match self.as_text()? {
            "Y" => Ok(true),
            "N" => Ok(false),
            other => Err(SqliteAccessError::InvalidFormat(other.to_owned())),
        }
    }

    fn mismatch(&self, expected: &'static str) -> SqliteAccessError {
        SqliteAccessError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<Blob> for Value {
    fn from(value: Blob) -> Self {
        Value::Blob(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(Blob::from(value))
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(Blob::from(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
