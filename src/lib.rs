//! Lightweight synchronous access layer over SQLite.
//!
//! Connections come from a [`ConnectionCache`] that shares one live [`Connection`] per
//! `(path, mode)` pair and reopens transparently once every owner has let go. Statements are
//! prepared from a connection, take [`Value`] parameters and hand back [`Row`]s and [`Table`]s.
//!
//! ```rust,no_run
//! use sqlite_access::prelude::*;
//!
//! # fn main() -> Result<(), SqliteAccessError> {
//! let conn = sqlite_access::acquire("db1.db", Mode::ReadOnly)?;
//! let mut stmt = conn.prepare("SELECT desc FROM test WHERE code = ?")?;
//! stmt.bind(1, 2)?;
//! for row in stmt.fetch_all()? {
//!     println!("{}", row.get("desc").map_or(Ok(""), Value::as_text)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod cache;
pub mod error;
pub mod prelude;
pub mod results;
pub mod sqlite;
pub mod types;

pub use blob::Blob;
pub use cache::{ConnectionCache, acquire};
pub use error::SqliteAccessError;
pub use results::{Row, Table};
pub use sqlite::{
    Connection, ConnectionOptions, ConnectionOptionsBuilder, Mode, Statement, StatementState, Step,
};
pub use types::Value;
