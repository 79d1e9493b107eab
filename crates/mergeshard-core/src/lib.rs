//! Partition/union lifecycle for datasets sharded across identically shaped
//! tables.
//!
//! A dataset with base name `report` consists of:
//! - `report_model`, the empty template every partition is cloned from,
//! - `report_<key>`, one partition table per key,
//! - `report`, the read-only aggregate union over every partition.
//!
//! [`LifecycleManager`] resolves caller keys to one of those tables, creating
//! partitions on first use and keeping the aggregate in step. All DDL goes
//! through a [`StorageBackend`].

pub mod adhoc;
pub mod backend;
pub mod batch;
pub mod directory;
pub mod lifecycle;
pub mod memory;
pub mod naming;
pub mod rebuild;
pub mod render;

pub use adhoc::build_temporary_union;
pub use backend::StorageBackend;
pub use batch::run_batch;
pub use directory::list_partitions;
pub use lifecycle::{DatasetDefinition, LifecycleManager, Resolution, ResolvedKind};
pub use memory::{MemoryBackend, MemoryTable, TxnCounts};
pub use rebuild::{ConsistencyWarning, RebuildOutcome, UnionRebuilder, plan_rebuild};
pub use render::render_mysql;

pub use mergeshard_error::{Result, ShardError};
pub use mergeshard_types::{
    BaseName, DdlStatement, Dialect, KeySelector, PartitionKey, RebuildStrategy, TableScope,
};
