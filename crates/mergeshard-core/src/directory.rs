//! Partition directory: which partition tables exist right now.

use std::collections::BTreeSet;

use mergeshard_error::Result;
use mergeshard_types::BaseName;
use tracing::debug;

use crate::backend::StorageBackend;
use crate::naming::{is_partition_table, mask};

/// List the partition tables of `base` currently present in the backend.
///
/// The listing is taken fresh on every call, so partitions created by other
/// writers since the last call are always included. The template and the
/// aggregate are excluded even if the backend's prefix match returns them.
pub fn list_partitions<B: StorageBackend + ?Sized>(
    backend: &B,
    base: &BaseName,
) -> Result<BTreeSet<String>> {
    let partitions: BTreeSet<String> = backend
        .list_tables(&mask(base))?
        .into_iter()
        .filter(|name| is_partition_table(base, name))
        .collect();
    debug!(base = %base, count = partitions.len(), "listed partitions");
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use mergeshard_types::Dialect;

    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn excludes_template_aggregate_and_other_datasets() {
        let backend = MemoryBackend::new(Dialect::MySqlMerge);
        for name in [
            "report_model",
            "report_1",
            "report_2",
            "reports_1",
            "audit_1",
            "report",
        ] {
            backend.create_table(name);
        }
        let base = BaseName::new("report").unwrap();
        let listed = list_partitions(&backend, &base).unwrap();
        assert_eq!(
            listed,
            BTreeSet::from(["report_1".to_owned(), "report_2".to_owned()])
        );
    }

    #[test]
    fn reflects_tables_added_between_calls() {
        let backend = MemoryBackend::new(Dialect::MySqlMerge);
        backend.create_table("report_model");
        let base = BaseName::new("report").unwrap();
        assert!(list_partitions(&backend, &base).unwrap().is_empty());

        backend.create_table("report_9");
        assert!(list_partitions(&backend, &base).unwrap().contains("report_9"));
    }
}
