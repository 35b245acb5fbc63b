use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use crate::error::SqliteAccessError;
use crate::sqlite::{Connection, ConnectionOptions, Mode};

static GLOBAL_CACHE: LazyLock<ConnectionCache> = LazyLock::new(ConnectionCache::new);

/// Exact `(path, mode)` pair; paths are compared as given, without normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: String,
    mode: Mode,
}

/// Per-key state. Opening a connection happens under this lock only, never under the registry
/// lock, so a slow open blocks callers of the same key and nobody else.
#[derive(Debug)]
enum Slot {
    /// Registered but no open has succeeded yet.
    Opening,
    Open(Weak<Connection>),
    /// The first open failed and the slot was unregistered; callers still holding it start over.
    Retired,
}

/// Registry handing out at most one live [`Connection`] per `(path, mode)`.
///
/// Entries hold only weak references, so the cache never keeps a connection alive. Once every
/// owner has dropped its `Arc`, the next [`acquire`](ConnectionCache::acquire) for that key opens a
/// fresh connection and reuses the entry in place.
///
/// Entries are never removed once a connection has been opened for them: the registry grows with
/// the number of distinct keys ever requested over the life of the cache.
///
/// ```rust,no_run
/// use sqlite_access::{ConnectionCache, Mode};
///
/// # fn main() -> Result<(), sqlite_access::SqliteAccessError> {
/// let cache = ConnectionCache::new();
/// let a = cache.acquire("app.db", Mode::ReadOnly)?;
/// let b = cache.acquire("app.db", Mode::ReadOnly)?;
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConnectionCache {
    entries: Mutex<HashMap<CacheKey, Arc<Mutex<Slot>>>>,
    options: ConnectionOptions,
}

impl ConnectionCache {
    /// Empty cache opening connections with default [`ConnectionOptions`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty cache applying `options` to every connection it opens.
    #[must_use]
    pub fn with_options(options: ConnectionOptions) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            options,
        }
    }

    /// The process-wide cache behind [`acquire`](crate::acquire).
    #[must_use]
    pub fn global() -> &'static ConnectionCache {
        &GLOBAL_CACHE
    }

    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Return the live connection for `(path, mode)`, opening one if none is alive.
    ///
    /// The registry lock covers only the lookup or insertion of the key's slot. Upgrading or
    /// opening happens under that slot's own lock, so concurrent callers for the same key share a
    /// single instance while other keys are never held up by a slow open.
    ///
    /// # Errors
    /// Returns [`SqliteAccessError::OpenError`] if a new connection has to be opened and the engine
    /// refuses. A key whose first open fails is not registered.
    pub fn acquire(&self, path: &str, mode: Mode) -> Result<Arc<Connection>, SqliteAccessError> {
        let key = CacheKey {
            path: path.to_owned(),
            mode,
        };

        loop {
            let slot = Arc::clone(
                self.entries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(Slot::Opening))),
            );
            let mut state = slot.lock().unwrap_or_else(PoisonError::into_inner);

            let reopening = match &*state {
                Slot::Retired => continue,
                Slot::Open(weak) => {
                    if let Some(conn) = weak.upgrade() {
                        tracing::debug!(path, ?mode, "connection cache hit");
                        return Ok(conn);
                    }
                    true
                }
                Slot::Opening => false,
            };

            return match Connection::open(path, mode, &self.options) {
                Ok(conn) => {
                    let conn = Arc::new(conn);
                    *state = Slot::Open(Arc::downgrade(&conn));
                    if reopening {
                        tracing::debug!(path, ?mode, "connection cache reopened expired entry");
                    } else {
                        tracing::debug!(path, ?mode, "connection cache miss");
                    }
                    Ok(conn)
                }
                Err(err) => {
                    if !reopening {
                        *state = Slot::Retired;
                        let mut entries =
                            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
                        if entries.get(&key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                            entries.remove(&key);
                        }
                    }
                    Err(err)
                }
            };
        }
    }

    /// Number of registered keys, including those whose connection has been dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered keys whose connection is still owned somewhere.
    ///
    /// Waits for any open in progress on a key before counting it.
    #[must_use]
    pub fn live_count(&self) -> usize {
        let slots: Vec<Arc<Mutex<Slot>>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|slot| {
                matches!(
                    &*slot.lock().unwrap_or_else(PoisonError::into_inner),
                    Slot::Open(weak) if weak.strong_count() > 0
                )
            })
            .count()
    }
}

/// Acquire a connection from the process-wide cache.
///
/// # Errors
/// See [`ConnectionCache::acquire`].
pub fn acquire(path: &str, mode: Mode) -> Result<Arc<Connection>, SqliteAccessError> {
    ConnectionCache::global().acquire(path, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn db_path(dir: &tempfile::TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn same_key_shares_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir, "shared.db");
        let cache = ConnectionCache::new();

        let a = cache.acquire(&path, Mode::Create).unwrap();
        let b = cache.acquire(&path, Mode::Create).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.live_count(), 1);
    }

    #[test]
    fn expired_entry_is_reused_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir, "reopen.db");
        let cache = ConnectionCache::new();

        let first = cache.acquire(&path, Mode::Create).unwrap();
        let weak = Arc::downgrade(&first);
        drop(first);
        assert!(weak.upgrade().is_none());
        assert_eq!(cache.live_count(), 0);
        assert_eq!(cache.len(), 1);

        let second = cache.acquire(&path, Mode::Create).unwrap();
        second.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.live_count(), 1);
    }

    #[test]
    fn modes_do_not_share() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir, "modes.db");
        let cache = ConnectionCache::new();

        let create = cache.acquire(&path, Mode::Create).unwrap();
        let rw = cache.acquire(&path, Mode::ReadWrite).unwrap();
        let ro = cache.acquire(&path, Mode::ReadOnly).unwrap();
        assert!(!Arc::ptr_eq(&create, &rw));
        assert!(!Arc::ptr_eq(&rw, &ro));
        assert_eq!(ro.mode(), Mode::ReadOnly);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn failed_open_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir, "absent.db");
        let cache = ConnectionCache::new();

        let err = cache.acquire(&path, Mode::ReadOnly).unwrap_err();
        assert!(matches!(err, SqliteAccessError::OpenError { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_reopen_keeps_entry_expired() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir, "vanishing.db");
        let cache = ConnectionCache::new();

        let seed = cache.acquire(&path, Mode::Create).unwrap();
        seed.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();
        drop(seed);
        drop(cache.acquire(&path, Mode::ReadWrite).unwrap());
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            cache.acquire(&path, Mode::ReadWrite),
            Err(SqliteAccessError::OpenError { .. })
        ));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.live_count(), 0);
    }

    #[test]
    fn concurrent_acquire_yields_one_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir, "race.db");
        let cache = ConnectionCache::new();

        let conns: Vec<Arc<Connection>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.acquire(&path, Mode::Create).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(conns.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_failed_opens_leave_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir, "never.db");
        let cache = ConnectionCache::new();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.acquire(&path, Mode::ReadOnly)))
                .collect();
            for handle in handles {
                assert!(matches!(
                    handle.join().unwrap(),
                    Err(SqliteAccessError::OpenError { .. })
                ));
            }
        });
        assert!(cache.is_empty());
    }

    #[test]
    fn busy_open_does_not_stall_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let locked = db_path(&dir, "locked.db");
        let other = db_path(&dir, "other.db");

        let holder = rusqlite::Connection::open(&locked).unwrap();
        holder
            .execute_batch(
                "CREATE TABLE t (x INTEGER); BEGIN EXCLUSIVE; INSERT INTO t (x) VALUES (1);",
            )
            .unwrap();

        let cache = ConnectionCache::with_options(
            ConnectionOptions::builder()
                .busy_timeout(Duration::from_secs(2))
                .wal(true)
                .finish(),
        );
        let live = cache.acquire(&other, Mode::Create).unwrap();

        std::thread::scope(|scope| {
            // switching to WAL needs the lock `holder` keeps, so this open waits on busy_timeout
            let waiting = scope.spawn(|| cache.acquire(&locked, Mode::ReadWrite));
            std::thread::sleep(Duration::from_millis(200));

            let started = Instant::now();
            let again = cache.acquire(&other, Mode::Create).unwrap();
            let waited = started.elapsed();
            assert!(Arc::ptr_eq(&live, &again));
            assert!(
                waited < Duration::from_millis(500),
                "cache hit waited {waited:?}"
            );

            holder.execute_batch("COMMIT;").unwrap();
            let _ = waiting.join().unwrap();
        });
    }
}
