use std::time::Duration;

use clap::ValueEnum;
use rusqlite::OpenFlags;
use serde::Serialize;

/// Access intent used when opening a database file.
///
/// Together with the path it forms the key of the [`ConnectionCache`](crate::ConnectionCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
pub enum Mode {
    /// Open an existing file for reading only.
    ReadOnly,
    /// Open an existing file for reading and writing.
    ReadWrite,
    /// Create the file if absent, then open it for reading and writing.
    Create,
}

impl Mode {
    /// Native open flags for this mode.
    ///
    /// URI filenames are always accepted; the engine's own mutex is disabled because every
    /// handle is guarded by its [`Connection`](crate::Connection).
    #[must_use]
    pub fn open_flags(self) -> OpenFlags {
        let access = match self {
            Mode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            Mode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            Mode::Create => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        };
        access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }

    #[must_use]
    pub fn is_writable(self) -> bool {
        !matches!(self, Mode::ReadOnly)
    }
}

/// Settings applied to every handle a cache opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionOptions {
    /// How long the engine retries on a locked database before reporting busy.
    pub busy_timeout: Option<Duration>,
    /// Capacity of the per-connection compiled statement cache.
    pub statement_cache_capacity: usize,
    /// Switch writable connections to write-ahead logging.
    pub wal: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: None,
            statement_cache_capacity: 16,
            wal: false,
        }
    }
}

impl ConnectionOptions {
    #[must_use]
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::new()
    }
}

/// Fluent builder for [`ConnectionOptions`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptionsBuilder {
    opts: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionOptions {
        self.opts
    }
}
