//! Partition lifecycle: resolve caller keys to a queryable table.

use std::collections::BTreeSet;

use mergeshard_error::{Result, ShardError};
use mergeshard_types::{
    BaseName, DdlStatement, KeySelector, PartitionKey, RebuildStrategy, TableScope,
};
use tracing::{debug, info, warn};

use crate::adhoc::build_temporary_union;
use crate::backend::StorageBackend;
use crate::directory::list_partitions;
use crate::naming::{is_partition_table, partition_name, template_name};
use crate::rebuild::{RebuildOutcome, UnionRebuilder};

/// The host's description of a dataset.
pub trait DatasetDefinition {
    /// Base name the template, partitions, and aggregate derive from.
    /// `None` means the host never defined one.
    fn default_template_base_name(&self) -> Option<String>;
}

impl DatasetDefinition for BaseName {
    fn default_template_base_name(&self) -> Option<String> {
        Some(self.as_str().to_owned())
    }
}

impl DatasetDefinition for str {
    fn default_template_base_name(&self) -> Option<String> {
        Some(self.to_owned())
    }
}

impl DatasetDefinition for String {
    fn default_template_base_name(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl<D: DatasetDefinition + ?Sized> DatasetDefinition for Option<&D> {
    fn default_template_base_name(&self) -> Option<String> {
        self.and_then(DatasetDefinition::default_template_base_name)
    }
}

/// What kind of table a resolution points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    Aggregate,
    Partition,
    TemporaryUnion,
}

/// Result of [`LifecycleManager::ensure_exists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Table subsequent queries should read. Always queryable: if the computed
    /// table turned out to be missing this is the aggregate instead.
    pub name: String,
    pub kind: ResolvedKind,
    /// Partitions created by this call that exist afterwards.
    pub created: Vec<String>,
    /// Set when this call rebuilt the aggregate.
    pub rebuild: Option<RebuildOutcome>,
    /// True when the computed table was missing and `name` fell back to the
    /// aggregate.
    pub degraded: bool,
}

struct PartitionStep {
    table: String,
    created: bool,
}

/// Creates partitions on demand and keeps the aggregate union current for
/// one dataset.
///
/// The manager holds no in-process locks. Concurrent callers racing to
/// create the same partition are safe because creation is a conditional
/// clone; concurrent rebuilds are not coordinated (see [`crate::rebuild`]).
#[derive(Debug)]
pub struct LifecycleManager<B> {
    backend: B,
    base: BaseName,
    rebuilder: UnionRebuilder,
}

impl<B: StorageBackend> LifecycleManager<B> {
    pub fn new(backend: B, base: BaseName) -> Self {
        Self {
            backend,
            base,
            rebuilder: UnionRebuilder::default(),
        }
    }

    /// Manager for the dataset `definition` describes.
    ///
    /// # Errors
    /// [`ShardError::Configuration`] when the definition has no base name or
    /// an empty one.
    pub fn from_definition<D: DatasetDefinition + ?Sized>(
        definition: &D,
        backend: B,
    ) -> Result<Self> {
        let name = definition.default_template_base_name().ok_or_else(|| {
            ShardError::configuration("dataset does not define a template base name")
        })?;
        Ok(Self::new(backend, BaseName::new(name)?))
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: RebuildStrategy) -> Self {
        self.rebuilder = UnionRebuilder::new(strategy);
        self
    }

    pub fn base(&self) -> &BaseName {
        &self.base
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Partition tables present right now.
    pub fn partitions(&self) -> Result<BTreeSet<String>> {
        list_partitions(&self.backend, &self.base)
    }

    /// Rebuild the aggregate over the current partitions.
    pub fn recreate_aggregate(&self) -> Result<RebuildOutcome> {
        self.rebuilder.recreate(&self.backend, &self.base)
    }

    /// Temporary union over existing partitions, by table name.
    pub fn temporary_union(&self, partitions: &[String]) -> Result<String> {
        build_temporary_union(&self.backend, &self.base, partitions)
    }

    /// Resolve `selector` to a queryable table, creating what is missing.
    ///
    /// - No keys: the aggregate, with no backend mutation.
    /// - One key: its partition. A missing partition is cloned from the
    ///   template and the aggregate is rebuilt; an existing one is left alone
    ///   unless `force_recreate` asks for a rebuild anyway.
    /// - Several keys: missing partitions are created, then a temporary union
    ///   over all of them is built in key order. The aggregate is not touched,
    ///   so new partitions join it on the next rebuild. `force_recreate` is
    ///   ignored here.
    ///
    /// A key naming the template (`"model"`) is rejected before any DDL.
    ///
    /// If the resolved table does not exist afterwards (creation silently
    /// failed, or someone dropped it meanwhile), the aggregate name is
    /// returned with `degraded` set instead of a dangling name.
    pub fn ensure_exists(
        &self,
        selector: impl Into<KeySelector>,
        force_recreate: bool,
    ) -> Result<Resolution> {
        let selector = selector.into();
        debug!(
            base = %self.base,
            keys = selector.keys().len(),
            force_recreate,
            "ensure exists"
        );
        let mut resolution = match selector {
            KeySelector::Aggregate => {
                return Ok(Resolution {
                    name: self.base.as_str().to_owned(),
                    kind: ResolvedKind::Aggregate,
                    created: Vec::new(),
                    rebuild: None,
                    degraded: false,
                });
            }
            KeySelector::Single(key) => self.resolve_single(&key, force_recreate)?,
            KeySelector::Many(keys) => self.resolve_many(&keys)?,
        };

        if !self.backend.table_exists(&resolution.name)? {
            warn!(
                base = %self.base,
                table = %resolution.name,
                "resolved table is missing; falling back to aggregate"
            );
            let missing = std::mem::replace(&mut resolution.name, self.base.as_str().to_owned());
            resolution.created.retain(|table| *table != missing);
            resolution.kind = ResolvedKind::Aggregate;
            resolution.degraded = true;
        }
        Ok(resolution)
    }

    /// [`Self::ensure_exists`], returned as a fresh scope for query
    /// construction.
    pub fn scope_for(
        &self,
        selector: impl Into<KeySelector>,
        force_recreate: bool,
    ) -> Result<TableScope> {
        let resolution = self.ensure_exists(selector, force_recreate)?;
        Ok(TableScope::resolved(self.base.clone(), resolution.name))
    }

    fn resolve_single(&self, key: &PartitionKey, force_recreate: bool) -> Result<Resolution> {
        let step = self.ensure_partition(self.partition_table(key)?)?;
        let rebuild = if step.created || force_recreate {
            Some(self.recreate_aggregate()?)
        } else {
            None
        };
        Ok(Resolution {
            created: if step.created {
                vec![step.table.clone()]
            } else {
                Vec::new()
            },
            name: step.table,
            kind: ResolvedKind::Partition,
            rebuild,
            degraded: false,
        })
    }

    fn resolve_many(&self, keys: &[PartitionKey]) -> Result<Resolution> {
        // Reject bad keys before cloning any partition.
        let names = keys
            .iter()
            .map(|key| self.partition_table(key))
            .collect::<Result<Vec<_>>>()?;
        let mut tables = Vec::with_capacity(names.len());
        let mut created = Vec::new();
        for name in names {
            let step = self.ensure_partition(name)?;
            if step.created {
                created.push(step.table.clone());
            }
            tables.push(step.table);
        }
        let name = self.temporary_union(&tables)?;
        Ok(Resolution {
            name,
            kind: ResolvedKind::TemporaryUnion,
            created,
            rebuild: None,
            degraded: false,
        })
    }

    /// Partition table for `key`. Empty keys and the key naming the template
    /// are rejected.
    fn partition_table(&self, key: &PartitionKey) -> Result<String> {
        let table = partition_name(&self.base, key);
        if key.is_empty() {
            return Err(ShardError::invalid_identifier(table, "partition key is empty"));
        }
        if !is_partition_table(&self.base, &table) {
            return Err(ShardError::invalid_identifier(
                table,
                "partition key names the template table",
            ));
        }
        Ok(table)
    }

    /// Clone partition `table` from the template if it is missing.
    /// Does not touch the aggregate.
    fn ensure_partition(&self, table: String) -> Result<PartitionStep> {
        if self.backend.table_exists(&table)? {
            debug!(base = %self.base, table = %table, "partition exists");
            return Ok(PartitionStep {
                table,
                created: false,
            });
        }

        // Conditional clone: a concurrent creator winning the race is fine.
        self.backend.execute(&DdlStatement::ClonePartition {
            table: table.clone(),
            template: template_name(&self.base),
        })?;
        info!(base = %self.base, table = %table, "partition created");
        Ok(PartitionStep {
            table,
            created: true,
        })
    }
}
