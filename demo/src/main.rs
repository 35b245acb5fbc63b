mod args;

use std::sync::Arc;

use clap::Parser;
use sqlite_access::SqliteAccessError;
use tracing::Level;

use crate::args::{Args, Report, parse_param};

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if args.verbose { Level::TRACE } else { Level::INFO })
        .init();

    match run(args) {
        Ok(report) => {
            let json = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<Report, SqliteAccessError> {
    let conn = sqlite_access::acquire(&args.db, args.mode)?;
    if let Some(setup) = &args.setup {
        conn.execute_batch(setup)?;
    }

    let mut stmt = conn.prepare(&args.sql)?;
    stmt.bind_all(args.params.iter().map(|raw| parse_param(raw)))?;
    let rows = stmt.fetch_all()?;
    let columns = stmt.column_names().to_vec();
    drop(stmt);

    let again = sqlite_access::acquire(&args.db, args.mode)?;
    let shared_connection = Arc::ptr_eq(&conn, &again);
    tracing::info!(rows = rows.len(), shared_connection, "query finished");

    Ok(Report {
        db: args.db,
        mode: args.mode,
        columns,
        rows,
        shared_connection,
    })
}
