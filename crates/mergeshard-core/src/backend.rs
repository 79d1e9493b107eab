//! Storage backend contract.

use std::collections::BTreeSet;
use std::sync::Arc;

use mergeshard_error::Result;
use mergeshard_types::{DdlStatement, Dialect};

/// The relational backend the lifecycle code issues DDL against.
///
/// All calls are synchronous and hit the live catalog; implementations must
/// not cache existence or listings. Transaction control is best effort: on
/// backends without transactional DDL `begin`/`commit`/`rollback` may be
/// no-ops, and callers must not rely on a rollback undoing DDL.
pub trait StorageBackend {
    /// Dialect used to render [`DdlStatement`]s.
    fn dialect(&self) -> Dialect;

    /// Execute one logical DDL statement.
    fn execute(&self, stmt: &DdlStatement) -> Result<()>;

    /// Whether a table (or union) named `name` currently exists, including
    /// session-scoped temporary tables.
    fn table_exists(&self, name: &str) -> Result<bool>;

    /// Names of the persistent base tables whose names start with `prefix`.
    /// Temporary tables are not listed.
    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for &B {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(&self, stmt: &DdlStatement) -> Result<()> {
        (**self).execute(stmt)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        (**self).table_exists(name)
    }

    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>> {
        (**self).list_tables(prefix)
    }

    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(&self, stmt: &DdlStatement) -> Result<()> {
        (**self).execute(stmt)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        (**self).table_exists(name)
    }

    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>> {
        (**self).list_tables(prefix)
    }

    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(&self, stmt: &DdlStatement) -> Result<()> {
        (**self).execute(stmt)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        (**self).table_exists(name)
    }

    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>> {
        (**self).list_tables(prefix)
    }

    fn begin(&self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }
}
