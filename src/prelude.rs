//! Convenient imports for common functionality.
//!
//! This module re-exports the types most callers need to acquire a connection, run a statement
//! and read its rows.

pub use crate::blob::Blob;
pub use crate::cache::ConnectionCache;
pub use crate::error::SqliteAccessError;
pub use crate::results::{Row, Table};
pub use crate::sqlite::{Connection, ConnectionOptions, Mode, Statement, StatementState, Step};
pub use crate::types::Value;
