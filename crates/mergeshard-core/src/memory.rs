//! In-process storage backend.
//!
//! `MemoryBackend` keeps a catalog of table names and union memberships and
//! applies [`DdlStatement`]s with the same acceptance rules a real engine
//! would (conditional clone, `IF EXISTS` drops, atomic multi-rename). It also
//! journals every statement it is asked to execute, supports one-shot failure
//! injection, and can snapshot/restore state on transactional dialects. It is
//! used by the test suites and for dry runs that print the DDL a MERGE backend
//! would receive.

use std::collections::{BTreeMap, BTreeSet};

use mergeshard_error::{Result, ShardError};
use mergeshard_types::{DdlStatement, Dialect};
use parking_lot::Mutex;
use tracing::debug;

use crate::backend::StorageBackend;
use crate::render::render_mysql;

/// A table as tracked by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryTable {
    /// Ordinary writable table (template or partition).
    Plain,
    /// Read-only union over `members`, in order.
    Union { members: Vec<String> },
}

impl MemoryTable {
    #[must_use]
    pub const fn accepts_writes(&self) -> bool {
        matches!(self, Self::Plain)
    }
}

/// Transaction-control call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxnCounts {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Clone, Default)]
struct Catalog {
    tables: BTreeMap<String, MemoryTable>,
    temporary: BTreeMap<String, MemoryTable>,
}

impl Catalog {
    fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name) || self.temporary.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&MemoryTable> {
        self.temporary.get(name).or_else(|| self.tables.get(name))
    }

    fn apply(&mut self, stmt: &DdlStatement) -> std::result::Result<(), String> {
        match stmt {
            DdlStatement::ClonePartition { table, template } => {
                if !self.tables.contains_key(template) {
                    return Err(format!("Table '{template}' doesn't exist"));
                }
                self.tables
                    .entry(table.clone())
                    .or_insert(MemoryTable::Plain);
                Ok(())
            }
            DdlStatement::CreateUnion {
                table,
                template,
                members,
                temporary,
            } => {
                if !self.tables.contains_key(template) {
                    return Err(format!("Table '{template}' doesn't exist"));
                }
                if let Some(missing) = members.iter().find(|m| !self.tables.contains_key(*m)) {
                    return Err(format!("Table '{missing}' doesn't exist"));
                }
                let space = if *temporary {
                    &mut self.temporary
                } else {
                    &mut self.tables
                };
                if space.contains_key(table) {
                    return Err(format!("Table '{table}' already exists"));
                }
                space.insert(
                    table.clone(),
                    MemoryTable::Union {
                        members: members.clone(),
                    },
                );
                Ok(())
            }
            DdlStatement::DropUnion { table, temporary } => {
                let space = if *temporary {
                    &mut self.temporary
                } else {
                    &mut self.tables
                };
                match space.get(table).map(MemoryTable::accepts_writes) {
                    None => Ok(()),
                    Some(true) => Err(format!("refusing to drop '{table}': not a union table")),
                    Some(false) => {
                        space.remove(table);
                        Ok(())
                    }
                }
            }
            DdlStatement::RenameUnions { renames } => {
                // All or nothing: apply to a scratch copy first.
                let mut next = self.tables.clone();
                for (from, to) in renames {
                    let entry = next
                        .remove(from)
                        .ok_or_else(|| format!("Table '{from}' doesn't exist"))?;
                    if next.contains_key(to) {
                        return Err(format!("Table '{to}' already exists"));
                    }
                    next.insert(to.clone(), entry);
                }
                self.tables = next;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    catalog: Catalog,
    snapshot: Option<Catalog>,
    journal: Vec<DdlStatement>,
    failures: Vec<(&'static str, String)>,
    txn: TxnCounts,
}

/// Thread-safe in-memory [`StorageBackend`].
#[derive(Debug)]
pub struct MemoryBackend {
    dialect: Dialect,
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    /// Empty backend. Transactions restore state on rollback only when
    /// `dialect` supports transactional DDL.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Create a plain table out of band, the way an operator creates the
    /// template. Not journaled.
    pub fn create_table(&self, name: &str) {
        self.inner
            .lock()
            .catalog
            .tables
            .insert(name.to_owned(), MemoryTable::Plain);
    }

    /// Drop any table out of band (operator action). Not journaled.
    pub fn drop_table(&self, name: &str) -> bool {
        self.inner.lock().catalog.tables.remove(name).is_some()
    }

    /// End the current session: every temporary table disappears.
    pub fn end_session(&self) {
        self.inner.lock().catalog.temporary.clear();
    }

    /// Make the next executed statement of `kind` targeting `table` fail.
    pub fn fail_on(&self, kind: &'static str, table: &str) {
        self.inner.lock().failures.push((kind, table.to_owned()));
    }

    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.inner.lock().catalog.contains(name)
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.inner.lock().catalog.get(name).cloned()
    }

    /// Members of the union `name`, or `None` if it is missing or plain.
    #[must_use]
    pub fn members(&self, name: &str) -> Option<Vec<String>> {
        match self.table(name)? {
            MemoryTable::Union { members } => Some(members),
            MemoryTable::Plain => None,
        }
    }

    /// Persistent table names, sorted.
    #[must_use]
    pub fn tables(&self) -> BTreeSet<String> {
        self.inner.lock().catalog.tables.keys().cloned().collect()
    }

    /// Temporary table names, sorted.
    #[must_use]
    pub fn temporary_tables(&self) -> BTreeSet<String> {
        self.inner.lock().catalog.temporary.keys().cloned().collect()
    }

    /// Every statement passed to `execute`, including failed ones.
    #[must_use]
    pub fn journal(&self) -> Vec<DdlStatement> {
        self.inner.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.inner.lock().journal.clear();
    }

    /// The journal rendered as MySQL MERGE-engine SQL.
    pub fn journal_sql(&self) -> Result<Vec<String>> {
        let journal = self.journal();
        let mut out = Vec::new();
        for stmt in &journal {
            out.extend(render_mysql(stmt)?);
        }
        Ok(out)
    }

    #[must_use]
    pub fn txn_counts(&self) -> TxnCounts {
        self.inner.lock().txn
    }
}

impl StorageBackend for MemoryBackend {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&self, stmt: &DdlStatement) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.journal.push(stmt.clone());
        if let Some(pos) = inner
            .failures
            .iter()
            .position(|(kind, table)| *kind == stmt.kind() && table == stmt.target())
        {
            inner.failures.remove(pos);
            return Err(ShardError::ddl(stmt.to_string(), "injected failure"));
        }
        inner
            .catalog
            .apply(stmt)
            .map_err(|msg| ShardError::ddl(stmt.to_string(), msg))?;
        debug!(statement = %stmt, "memory backend applied DDL");
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.has_table(name))
    }

    fn list_tables(&self, prefix: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .inner
            .lock()
            .catalog
            .tables
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn begin(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.snapshot.is_some() {
            return Err(ShardError::backend("transaction already active"));
        }
        inner.txn.begins += 1;
        if self.dialect.supports_transactional_ddl() {
            inner.snapshot = Some(inner.catalog.clone());
        }
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.txn.commits += 1;
        inner.snapshot = None;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.txn.rollbacks += 1;
        if let Some(snapshot) = inner.snapshot.take() {
            inner.catalog = snapshot;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn union(table: &str, members: &[&str], temporary: bool) -> DdlStatement {
        DdlStatement::CreateUnion {
            table: table.to_owned(),
            template: "report_model".to_owned(),
            members: members.iter().map(|m| (*m).to_owned()).collect(),
            temporary,
        }
    }

    fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new(Dialect::MySqlMerge);
        backend.create_table("report_model");
        backend.create_table("report_1");
        backend
    }

    #[test]
    fn clone_requires_template() {
        let backend = MemoryBackend::new(Dialect::MySqlMerge);
        let err = backend
            .execute(&DdlStatement::ClonePartition {
                table: "report_1".to_owned(),
                template: "report_model".to_owned(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("report_model"));
    }

    #[test]
    fn unions_reject_writes() {
        let backend = seeded();
        backend.execute(&union("report", &["report_1"], false)).unwrap();
        assert!(!backend.table("report").unwrap().accepts_writes());
        assert!(backend.table("report_1").unwrap().accepts_writes());
    }

    #[test]
    fn drop_union_refuses_plain_tables() {
        let backend = seeded();
        let err = backend
            .execute(&DdlStatement::DropUnion {
                table: "report_1".to_owned(),
                temporary: false,
            })
            .unwrap_err();
        assert!(err.is_backend_failure());
        assert!(backend.has_table("report_1"));
    }

    #[test]
    fn rename_is_all_or_nothing() {
        let backend = seeded();
        backend.execute(&union("report~next", &["report_1"], false)).unwrap();
        let err = backend.execute(&DdlStatement::RenameUnions {
            renames: vec![
                ("report~next".to_owned(), "report".to_owned()),
                ("missing".to_owned(), "elsewhere".to_owned()),
            ],
        });
        assert!(err.is_err());
        assert!(backend.has_table("report~next"));
        assert!(!backend.has_table("report"));
    }

    #[test]
    fn temporary_tables_are_unlisted_and_session_scoped() {
        let backend = seeded();
        backend.execute(&union("report9t1n0", &["report_1"], true)).unwrap();
        assert!(backend.table_exists("report9t1n0").unwrap());
        assert!(!backend.list_tables("report").unwrap().contains("report9t1n0"));
        backend.end_session();
        assert!(!backend.table_exists("report9t1n0").unwrap());
    }

    #[test]
    fn injected_failure_fires_once() {
        let backend = seeded();
        backend.fail_on("create_union", "report");
        assert!(backend.execute(&union("report", &["report_1"], false)).is_err());
        assert!(backend.execute(&union("report", &["report_1"], false)).is_ok());
        assert_eq!(backend.journal().len(), 2);
    }

    #[test]
    fn journal_renders_as_mysql() {
        let backend = seeded();
        backend.execute(&union("report", &["report_1"], false)).unwrap();
        assert_eq!(
            backend.journal_sql().unwrap(),
            [
                "CREATE TABLE `report` LIKE `report_model`",
                "ALTER TABLE `report` ENGINE=MERGE UNION=(`report_1`) INSERT_METHOD=NO",
            ]
        );
    }

    #[test]
    fn nested_begin_is_rejected() {
        let backend = MemoryBackend::new(Dialect::SqliteView);
        backend.begin().unwrap();
        assert!(backend.begin().is_err());
        backend.commit().unwrap();
        backend.begin().unwrap();
        backend.rollback().unwrap();
    }
}
