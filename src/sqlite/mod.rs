// SQLite module - the engine-facing half of the crate
//
// - config: open modes and per-connection options
// - params: binding `Value`s onto compiled statements
// - query: reading engine columns back into `Value`s
// - connection: one shared engine handle
// - prepared: the statement state machine

pub mod config;
pub mod connection;
pub mod params;
pub mod prepared;
pub mod query;

// Re-export the public API
pub use config::{ConnectionOptions, ConnectionOptionsBuilder, Mode};
pub use connection::Connection;
pub use prepared::{Statement, StatementState, Step};
pub use query::extract_value;
