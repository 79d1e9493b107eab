//! Ordered DDL batches under a best-effort transaction.

use mergeshard_error::Result;
use mergeshard_types::DdlStatement;
use tracing::{debug, error, warn};

use crate::backend::StorageBackend;

/// Issue `statements` in order inside `begin`/`commit`.
///
/// The first failing statement stops the batch: remaining statements are not
/// issued, a rollback is attempted, and the statement's error is returned. A
/// failed rollback is logged but never replaces the original error.
///
/// Only backends with transactional DDL actually undo the statements that
/// already ran. Elsewhere the rollback is a no-op and the batch may leave
/// partial state behind, so every batch built by this crate is safe to issue
/// again from the start.
pub fn run_batch<B: StorageBackend + ?Sized>(
    backend: &B,
    statements: &[DdlStatement],
) -> Result<()> {
    backend.begin()?;
    for (step, stmt) in statements.iter().enumerate() {
        debug!(
            step,
            kind = stmt.kind(),
            table = stmt.target(),
            "issuing DDL"
        );
        if let Err(err) = backend.execute(stmt) {
            error!(
                step,
                total = statements.len(),
                statement = %stmt,
                error = %err,
                "DDL batch aborted"
            );
            rollback_quietly(backend);
            return Err(err);
        }
    }
    if let Err(err) = backend.commit() {
        error!(error = %err, "DDL batch commit failed");
        rollback_quietly(backend);
        return Err(err);
    }
    Ok(())
}

fn rollback_quietly<B: StorageBackend + ?Sized>(backend: &B) {
    if let Err(err) = backend.rollback() {
        warn!(error = %err, "rollback after failed DDL batch also failed");
    }
}

#[cfg(test)]
mod tests {
    use mergeshard_types::Dialect;

    use super::*;
    use crate::memory::{MemoryBackend, TxnCounts};

    fn clone(table: &str) -> DdlStatement {
        DdlStatement::ClonePartition {
            table: table.to_owned(),
            template: "report_model".to_owned(),
        }
    }

    #[test]
    fn commits_when_every_statement_succeeds() {
        let backend = MemoryBackend::new(Dialect::SqliteView);
        backend.create_table("report_model");
        run_batch(&backend, &[clone("report_1"), clone("report_2")]).unwrap();
        assert!(backend.has_table("report_1"));
        assert!(backend.has_table("report_2"));
        assert_eq!(
            backend.txn_counts(),
            TxnCounts {
                begins: 1,
                commits: 1,
                rollbacks: 0
            }
        );
    }

    #[test]
    fn stops_at_first_failure_and_rolls_back() {
        let backend = MemoryBackend::new(Dialect::SqliteView);
        backend.create_table("report_model");
        backend.fail_on("clone_partition", "report_2");

        let err = run_batch(
            &backend,
            &[clone("report_1"), clone("report_2"), clone("report_3")],
        )
        .unwrap_err();
        assert!(err.is_backend_failure());
        // report_3 was never issued.
        assert_eq!(backend.journal().len(), 2);
        // Transactional dialect: report_1 is undone.
        assert!(!backend.has_table("report_1"));
        assert_eq!(backend.txn_counts().rollbacks, 1);
    }

    #[test]
    fn non_transactional_backend_keeps_partial_state() {
        let backend = MemoryBackend::new(Dialect::MySqlMerge);
        backend.create_table("report_model");
        backend.fail_on("clone_partition", "report_2");

        assert!(run_batch(&backend, &[clone("report_1"), clone("report_2")]).is_err());
        assert!(backend.has_table("report_1"));

        // Re-running the same batch converges.
        run_batch(&backend, &[clone("report_1"), clone("report_2")]).unwrap();
        assert!(backend.has_table("report_2"));
    }
}
