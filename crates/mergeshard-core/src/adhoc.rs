//! Session-scoped unions over an explicit list of partitions.

use mergeshard_error::{Result, ShardError};
use mergeshard_types::{BaseName, DdlStatement};
use tracing::{info, warn};

use crate::backend::StorageBackend;
use crate::naming::{temp_union_name, template_name};

/// Build a temporary, read-only union over exactly `partitions`, in order,
/// and return its generated name.
///
/// Every partition is checked before any DDL is issued; if some are missing
/// the call fails with [`ShardError::MissingPartition`] naming all of them and
/// the backend is left untouched. The union is created as a temporary table,
/// so it disappears with the backend session. A failure halfway through
/// creation leaves at most a temporary table behind, and a retry uses a fresh
/// name.
pub fn build_temporary_union<B: StorageBackend + ?Sized>(
    backend: &B,
    base: &BaseName,
    partitions: &[String],
) -> Result<String> {
    let mut missing = Vec::new();
    for name in partitions {
        if !backend.table_exists(name)? {
            missing.push(name.clone());
        }
    }
    if !missing.is_empty() {
        warn!(
            base = %base,
            missing = ?missing,
            "ad-hoc union references missing partitions"
        );
        return Err(ShardError::missing_partitions(missing));
    }

    let table = temp_union_name(base);
    backend.execute(&DdlStatement::CreateUnion {
        table: table.clone(),
        template: template_name(base),
        members: partitions.to_vec(),
        temporary: true,
    })?;
    info!(
        base = %base,
        table = %table,
        members = partitions.len(),
        "temporary union created"
    );
    Ok(table)
}
