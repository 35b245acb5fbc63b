use clap::Parser;
use serde::Serialize;
use sqlite_access::{Mode, Value};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one statement through the sqlite-access connection cache")]
pub(crate) struct Args {
    #[arg(long)]
    pub(crate) db: String,
    #[arg(long, value_enum, default_value = "create")]
    pub(crate) mode: Mode,
    /// Batch of statements executed before the query, e.g. schema and seed rows.
    #[arg(long)]
    pub(crate) setup: Option<String>,
    #[arg(long)]
    pub(crate) sql: String,
    /// Positional parameter; repeat for each `?`. Accepts `null`, integers, floats or text.
    #[arg(long = "param")]
    pub(crate) params: Vec<String>,
    #[arg(long)]
    pub(crate) verbose: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) db: String,
    pub(crate) mode: Mode,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: sqlite_access::Table,
    pub(crate) shared_connection: bool,
}

pub(crate) fn parse_param(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        Value::Null
    } else if let Ok(int) = raw.parse::<i64>() {
        Value::Integer(int)
    } else if let Ok(real) = raw.parse::<f64>() {
        Value::Real(real)
    } else {
        Value::Text(raw.to_owned())
    }
}
