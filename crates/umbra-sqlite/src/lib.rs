//! SQLite connection adapter.
//!
//! Wraps `rusqlite` with the `sqlite-vec` extension registered, so `vec0`
//! virtual tables are available alongside the bundled FTS5 and JSON1
//! support. One adapter owns one connection; callers serialize access.

mod value;

mod connection;
pub use connection::SqliteConnection;

use std::path::PathBuf;

use umbra_core::Result;

/// Configuration for opening a SQLite database.
///
/// Pragmas are applied once at open. WAL mode defaults to on for file
/// databases and is meaningless for in-memory ones.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    path: Option<PathBuf>,
    wal_mode: bool,
    busy_timeout_ms: u32,
    cache_size: i32,
}

impl SqliteConfig {
    /// An in-memory database, dropped when the connection closes.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            wal_mode: false,
            busy_timeout_ms: 5_000,
            cache_size: -4_000,
        }
    }

    /// A file-backed database at `path`, created if missing.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            wal_mode: true,
            busy_timeout_ms: 5_000,
            cache_size: -4_000,
        }
    }

    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.wal_mode = enabled;
        self
    }

    pub fn busy_timeout_ms(mut self, timeout: u32) -> Self {
        self.busy_timeout_ms = timeout;
        self
    }

    /// Page-cache size, in the units `PRAGMA cache_size` accepts: pages when
    /// positive, kibibytes when negative.
    pub fn cache_size(mut self, cache_size: i32) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Opens the database and applies the configured pragmas.
    pub fn connect(self) -> Result<SqliteConnection> {
        SqliteConnection::connect(self)
    }
}
