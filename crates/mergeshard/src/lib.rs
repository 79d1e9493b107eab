//! Key-partitioned tables behind a single read-only union.
//!
//! A dataset has a template table (`{base}_model`), one partition per key
//! (`{base}_{key}`) cloned from the template on first use, and an aggregate
//! (`{base}`) that unions every partition. [`LifecycleManager::ensure_exists`]
//! maps caller keys to the table to query, creating partitions and rebuilding
//! the aggregate as needed; [`LifecycleManager::temporary_union`] builds a
//! session-scoped union over an explicit partition list.
//!
//! ```no_run
//! use mergeshard::{ShardConfig, open_sqlite};
//!
//! let config = ShardConfig::load("shards.toml")?;
//! let manager = open_sqlite(&config)?;
//! let table = manager.ensure_exists(15432_i64, false)?.name;
//! # Ok::<(), mergeshard::ShardError>(())
//! ```

use std::time::Duration;

pub mod config;
pub mod logging;

pub use config::{DatasetSection, ShardConfig, SqliteSection};
pub use mergeshard_core::naming;
pub use mergeshard_core::{
    ConsistencyWarning, DatasetDefinition, LifecycleManager, MemoryBackend, RebuildOutcome,
    Resolution, ResolvedKind, StorageBackend, UnionRebuilder, build_temporary_union,
    list_partitions, render_mysql,
};
pub use mergeshard_error::{Result, ShardError};
pub use mergeshard_sqlite::SqliteBackend;
pub use mergeshard_types::{
    BaseName, DdlStatement, Dialect, KeySelector, PartitionKey, RebuildStrategy, TableScope,
};

/// Open the SQLite database `config` names and return a manager for its
/// dataset.
///
/// # Errors
/// [`ShardError::Configuration`] when the `[sqlite]` section or the dataset
/// base name is missing; backend errors when the database cannot be opened.
pub fn open_sqlite(config: &ShardConfig) -> Result<LifecycleManager<SqliteBackend>> {
    let sqlite = config
        .sqlite
        .as_ref()
        .ok_or_else(|| ShardError::configuration("no [sqlite] section configured"))?;
    let backend = SqliteBackend::open(&sqlite.path)?
        .with_busy_timeout(Duration::from_millis(sqlite.busy_timeout_ms))?;
    let manager = LifecycleManager::from_definition(config, backend)?
        .with_strategy(config.dataset.rebuild_strategy);
    tracing::info!(
        base = %manager.base(),
        path = %sqlite.path.display(),
        strategy = %config.dataset.rebuild_strategy,
        "dataset opened"
    );
    Ok(manager)
}
