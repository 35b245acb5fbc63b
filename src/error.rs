use thiserror::Error;

/// Errors surfaced by every fallible operation in this crate.
///
/// Engine-originated variants keep the underlying [`rusqlite::Error`] as their source so the
/// engine's diagnostic text is preserved verbatim.
#[derive(Debug, Error)]
pub enum SqliteAccessError {
    /// The engine could not open `path` under the requested mode.
    #[error("Could not open database {path}: {source}")]
    OpenError {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// SQL text failed to compile. The connection stays usable.
    #[error("SQL compile error: {0}")]
    CompileError(#[source] rusqlite::Error),

    /// The engine reported an unexpected status while running a statement.
    #[error("SQL execution error: {0}")]
    EngineError(#[source] rusqlite::Error),

    /// A value accessor was called against the wrong variant.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Boolean conversion of text that is neither `"Y"` nor `"N"`.
    #[error("Invalid format: expected \"Y\" or \"N\", found {0:?}")]
    InvalidFormat(String),

    /// An operation was called from a statement state that does not allow it.
    #[error("Statement misuse: {0}")]
    Misuse(String),
}

impl SqliteAccessError {
    pub(crate) fn open(path: &str, source: rusqlite::Error) -> Self {
        SqliteAccessError::OpenError {
            path: path.to_owned(),
            source,
        }
    }
}
