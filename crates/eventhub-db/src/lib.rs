pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Result, anyhow};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

pub use queries::{RegistrationInsert, UserInsert};

/// Connection tuning for the store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Number of read-only connections in the reader pool.
    pub readers: usize,
    /// How long a connection waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            readers: 4,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// SQLite store with one writer and a round-robin pool of WAL readers.
///
/// Reads never wait on the writer: WAL lets any number of readers see the
/// last committed snapshot while a write is in progress. Writers are
/// serialized by SQLite itself, `busy_timeout` bounds the wait.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path, options: &StoreOptions) -> Result<Self> {
        let writer = Connection::open(path)?;

        // page_size only takes effect before the first table is created
        writer.pragma_update(None, "page_size", 4096)?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "wal_autocheckpoint", 1000)?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        tune(&writer, options)?;

        migrations::run(&writer)?;
        writer.execute_batch("ANALYZE")?;

        let mut readers = Vec::with_capacity(options.readers.max(1));
        for _ in 0..options.readers.max(1) {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            tune(&conn, options)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            readers.len()
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run `f` on the next reader in the pool.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| anyhow!("Reader lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` on the writer connection.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| anyhow!("Writer lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

/// Read-side pragmas shared by the writer and every reader.
fn tune(conn: &Connection, options: &StoreOptions) -> Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    // Negative means KiB, so this is 64 MB of page cache per connection.
    conn.pragma_update(None, "cache_size", -64000)?;
    conn.pragma_update(None, "mmap_size", 30_000_000_000i64)?;
    conn.busy_timeout(options.busy_timeout)?;
    debug!("Connection tuned (busy_timeout={:?})", options.busy_timeout);
    Ok(())
}
