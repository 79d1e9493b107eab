use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use mergeshard_core::StorageBackend;
use mergeshard_error::{Result, ShardError};
use mergeshard_types::{DdlStatement, Dialect};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::render::{escape_like, render_sqlite};

const TEMPLATE_SQL: &str = "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1";

const EXISTS_SQL: &str = "SELECT EXISTS (SELECT 1 FROM sqlite_master \
     WHERE name = ?1 AND type IN ('table', 'view')) \
     OR EXISTS (SELECT 1 FROM sqlite_temp_master \
     WHERE name = ?1 AND type IN ('table', 'view'))";

const LIST_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE ?1 ESCAPE '\\'";

/// [`StorageBackend`] over one rusqlite connection.
///
/// The connection is the session: temporary unions live as long as the
/// backend does. Calls are serialised through an internal mutex, so one
/// backend can be shared between threads, but a batch begun on one thread
/// holds the connection's transaction for everyone.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            ShardError::backend_with(format!("cannot open {}", path.display()), e)
        })?;
        debug!(path = %path.display(), "sqlite backend opened");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ShardError::backend_with("cannot open in-memory database", e))?;
        Ok(Self::from_connection(conn))
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Wait up to `timeout` for locks held by other connections.
    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self> {
        self.conn
            .lock()
            .busy_timeout(timeout)
            .map_err(|e| ShardError::backend_with("cannot set busy timeout", e))?;
        Ok(self)
    }

    /// Run `f` with the underlying connection, e.g. to create templates or
    /// write rows into partitions.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        f(&self.conn.lock())
    }

    /// Execute a batch of raw SQL on the connection.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(sql)
            .map_err(|e| ShardError::ddl(sql, e))
    }

    fn transaction_control(&self, sql: &str) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(sql)
            .map_err(|e| ShardError::backend_with(format!("{sql} failed"), e))
    }
}

fn template_definition(conn: &Connection, template: &str) -> Result<Option<String>> {
    conn.query_row(TEMPLATE_SQL, [template], |row| row.get::<_, String>(0))
        .optional()
        .map_err(|e| ShardError::backend_with(format!("cannot read definition of {template}"), e))
}

impl StorageBackend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::SqliteView
    }

    fn execute(&self, stmt: &DdlStatement) -> Result<()> {
        let conn = self.conn.lock();
        let template_sql = match stmt {
            DdlStatement::ClonePartition { template, .. } => template_definition(&conn, template)?,
            _ => None,
        };
        for sql in render_sqlite(stmt, template_sql.as_deref())? {
            debug!(kind = stmt.kind(), sql = %sql, "sqlite ddl");
            conn.execute(&sql, []).map_err(|e| ShardError::ddl(sql.as_str(), e))?;
        }
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        self.conn
            .lock()
            .query_row(EXISTS_SQL, [name], |row| row.get::<_, bool>(0))
            .map_err(|e| ShardError::backend_with(format!("cannot look up table {name}"), e))
    }

    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let conn = self.conn.lock();
        let fail = |e: rusqlite::Error| {
            ShardError::backend_with(format!("cannot list tables like {prefix}%"), e)
        };
        let mut stmt = conn.prepare(LIST_SQL).map_err(fail)?;
        let rows = stmt
            .query_map([format!("{}%", escape_like(prefix))], |row| {
                row.get::<_, String>(0)
            })
            .map_err(fail)?;

        // LIKE is case-insensitive for ASCII; the prefix match is not.
        let mut names = BTreeSet::new();
        for row in rows {
            let name = row.map_err(fail)?;
            if name.starts_with(prefix) {
                names.insert(name);
            }
        }
        Ok(names)
    }

    fn begin(&self) -> Result<()> {
        // Take the write lock now; a deferred upgrade can fail with BUSY.
        self.transaction_control("BEGIN IMMEDIATE")
    }

    fn commit(&self) -> Result<()> {
        self.transaction_control("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        let conn = self.conn.lock();
        if conn.is_autocommit() {
            // Nothing open: SQLite already rolled the transaction back.
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")
            .map_err(|e| ShardError::backend_with("ROLLBACK failed", e))
    }
}
