//! Aggregate union rebuilds.
//!
//! A rebuild makes the aggregate (`base`) a union over exactly the partitions
//! the directory lists at that moment. Two strategies exist:
//!
//! - [`RebuildStrategy::Swap`] builds the replacement under a staging name and
//!   renames it over the aggregate in one atomic statement, so readers of the
//!   aggregate never find it missing.
//! - [`RebuildStrategy::DropRecreate`] drops the aggregate and creates it
//!   again. Readers can observe the gap unless the backend runs DDL
//!   transactionally.
//!
//! Swap needs atomic multi-table rename; on dialects without it the rebuild
//! falls back to drop/recreate.
//!
//! Neither strategy coordinates with other rebuilders of the same base. Two
//! concurrent rebuilds race and the last one to finish wins; callers needing
//! more must serialise rebuilds themselves (e.g. with an advisory lock).

use std::collections::BTreeSet;
use std::fmt;

use mergeshard_error::Result;
use mergeshard_types::{BaseName, DdlStatement, RebuildStrategy};
use tracing::{info, warn};

use crate::backend::StorageBackend;
use crate::batch::run_batch;
use crate::directory::list_partitions;
use crate::naming::{retired_name, staging_name, template_name};

/// Non-fatal conditions noticed during a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyWarning {
    /// No partitions exist; the aggregate unions nothing and returns no rows.
    EmptyUnion { aggregate: String },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUnion { aggregate } => {
                write!(f, "aggregate {aggregate} was rebuilt over zero partitions")
            }
        }
    }
}

/// What a rebuild did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub aggregate: String,
    /// Partitions the new aggregate unions.
    pub members: BTreeSet<String>,
    /// Strategy actually used after dialect fallback.
    pub strategy: RebuildStrategy,
    pub warnings: Vec<ConsistencyWarning>,
}

/// Statements replacing the aggregate of `base` with a union over `members`.
///
/// `aggregate_exists` selects between renaming the old aggregate away and
/// simply renaming the staging table into place. Both plans drop leftover
/// scratch tables first, so a plan that failed halfway can be issued again.
#[must_use]
pub fn plan_rebuild(
    strategy: RebuildStrategy,
    base: &BaseName,
    members: &BTreeSet<String>,
    aggregate_exists: bool,
) -> Vec<DdlStatement> {
    let aggregate = base.as_str().to_owned();
    let template = template_name(base);
    let members: Vec<String> = members.iter().cloned().collect();

    match strategy {
        RebuildStrategy::DropRecreate => vec![
            DdlStatement::DropUnion {
                table: aggregate.clone(),
                temporary: false,
            },
            DdlStatement::CreateUnion {
                table: aggregate,
                template,
                members,
                temporary: false,
            },
        ],
        RebuildStrategy::Swap => {
            let staging = staging_name(base);
            let retired = retired_name(base);
            let mut plan = vec![
                DdlStatement::DropUnion {
                    table: staging.clone(),
                    temporary: false,
                },
                DdlStatement::DropUnion {
                    table: retired.clone(),
                    temporary: false,
                },
                DdlStatement::CreateUnion {
                    table: staging.clone(),
                    template,
                    members,
                    temporary: false,
                },
            ];
            if aggregate_exists {
                plan.push(DdlStatement::RenameUnions {
                    renames: vec![
                        (aggregate.clone(), retired.clone()),
                        (staging, aggregate),
                    ],
                });
                plan.push(DdlStatement::DropUnion {
                    table: retired,
                    temporary: false,
                });
            } else {
                plan.push(DdlStatement::RenameUnions {
                    renames: vec![(staging, aggregate)],
                });
            }
            plan
        }
    }
}

/// Recomputes the aggregate union of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnionRebuilder {
    strategy: RebuildStrategy,
}

impl UnionRebuilder {
    #[must_use]
    pub const fn new(strategy: RebuildStrategy) -> Self {
        Self { strategy }
    }

    /// Rebuild the aggregate of `base` over the partitions listed right now.
    ///
    /// The replacement runs as one batch under a best-effort transaction; on
    /// failure the remaining statements are skipped and the error surfaces
    /// unchanged. No retry is attempted.
    pub fn recreate<B: StorageBackend + ?Sized>(
        &self,
        backend: &B,
        base: &BaseName,
    ) -> Result<RebuildOutcome> {
        let members = list_partitions(backend, base)?;
        let strategy = self.strategy.effective(backend.dialect());
        let aggregate_exists = match strategy {
            RebuildStrategy::Swap => backend.table_exists(base.as_str())?,
            RebuildStrategy::DropRecreate => false,
        };

        let plan = plan_rebuild(strategy, base, &members, aggregate_exists);
        run_batch(backend, &plan)?;

        let mut warnings = Vec::new();
        if members.is_empty() {
            let warning = ConsistencyWarning::EmptyUnion {
                aggregate: base.as_str().to_owned(),
            };
            warn!(base = %base, "{warning}");
            warnings.push(warning);
        }
        info!(
            base = %base,
            strategy = %strategy,
            members = members.len(),
            "aggregate union rebuilt"
        );
        Ok(RebuildOutcome {
            aggregate: base.as_str().to_owned(),
            members,
            strategy,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use mergeshard_types::Dialect;

    use super::*;
    use crate::memory::MemoryBackend;

    fn report() -> BaseName {
        BaseName::new("report").unwrap()
    }

    fn backend_with(dialect: Dialect, partitions: &[&str]) -> MemoryBackend {
        let backend = MemoryBackend::new(dialect);
        backend.create_table("report_model");
        for p in partitions {
            backend.create_table(p);
        }
        backend
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn members_match_directory() {
        let backend = backend_with(Dialect::MySqlMerge, &["report_2", "report_1"]);
        let outcome = UnionRebuilder::default()
            .recreate(&backend, &report())
            .unwrap();
        assert_eq!(outcome.members, set(&["report_1", "report_2"]));
        assert_eq!(outcome.strategy, RebuildStrategy::Swap);
        assert!(outcome.warnings.is_empty());
        assert_eq!(
            backend.members("report").unwrap(),
            ["report_1", "report_2"]
        );
        // Scratch tables do not survive.
        assert_eq!(
            backend.tables(),
            set(&["report", "report_1", "report_2", "report_model"])
        );
    }

    #[test]
    fn swap_replaces_existing_aggregate() {
        let backend = backend_with(Dialect::MySqlMerge, &["report_1"]);
        let rebuilder = UnionRebuilder::new(RebuildStrategy::Swap);
        rebuilder.recreate(&backend, &report()).unwrap();
        backend.create_table("report_2");
        backend.clear_journal();

        rebuilder.recreate(&backend, &report()).unwrap();
        assert_eq!(
            backend.members("report").unwrap(),
            ["report_1", "report_2"]
        );
        let journal = backend.journal();
        assert!(journal.iter().any(|s| matches!(
            s,
            DdlStatement::RenameUnions { renames } if renames.len() == 2
        )));
        // The live aggregate is never dropped by name under swap.
        assert!(!journal.iter().any(|s| matches!(
            s,
            DdlStatement::DropUnion { table, .. } if table == "report"
        )));
    }

    #[test]
    fn swap_falls_back_on_sqlite() {
        let backend = backend_with(Dialect::SqliteView, &["report_1"]);
        let outcome = UnionRebuilder::new(RebuildStrategy::Swap)
            .recreate(&backend, &report())
            .unwrap();
        assert_eq!(outcome.strategy, RebuildStrategy::DropRecreate);
        assert!(
            !backend
                .journal()
                .iter()
                .any(|s| matches!(s, DdlStatement::RenameUnions { .. }))
        );
    }

    #[test]
    fn empty_directory_is_a_warning_not_an_error() {
        let backend = backend_with(Dialect::MySqlMerge, &[]);
        let outcome = UnionRebuilder::default()
            .recreate(&backend, &report())
            .unwrap();
        assert!(outcome.members.is_empty());
        assert_eq!(
            outcome.warnings,
            [ConsistencyWarning::EmptyUnion {
                aggregate: "report".to_owned()
            }]
        );
        assert_eq!(backend.members("report").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn failed_rebuild_surfaces_error_and_can_rerun() {
        let backend = backend_with(Dialect::MySqlMerge, &["report_1"]);
        let rebuilder = UnionRebuilder::new(RebuildStrategy::Swap);
        backend.fail_on("rename_unions", "report");

        assert!(rebuilder.recreate(&backend, &report()).is_err());
        // Non-transactional: the staging table is left behind.
        assert!(backend.has_table("report~next"));
        assert_eq!(backend.txn_counts().rollbacks, 1);

        rebuilder.recreate(&backend, &report()).unwrap();
        assert_eq!(backend.members("report").unwrap(), ["report_1"]);
        assert!(!backend.has_table("report~next"));
    }

    #[test]
    fn transactional_drop_recreate_rolls_back() {
        let backend = backend_with(Dialect::SqliteView, &["report_1"]);
        let rebuilder = UnionRebuilder::new(RebuildStrategy::DropRecreate);
        rebuilder.recreate(&backend, &report()).unwrap();

        backend.create_table("report_2");
        backend.fail_on("create_union", "report");
        assert!(rebuilder.recreate(&backend, &report()).is_err());
        // The drop was undone: the previous aggregate is intact.
        assert_eq!(backend.members("report").unwrap(), ["report_1"]);
    }

    #[test]
    fn plan_shapes() {
        let base = report();
        let members = set(&["report_1"]);
        let fresh = plan_rebuild(RebuildStrategy::Swap, &base, &members, false);
        assert_eq!(fresh.len(), 4);
        assert_eq!(
            fresh[3],
            DdlStatement::RenameUnions {
                renames: vec![("report~next".to_owned(), "report".to_owned())]
            }
        );
        let replace = plan_rebuild(RebuildStrategy::Swap, &base, &members, true);
        assert_eq!(replace.len(), 5);
        let drop_recreate = plan_rebuild(RebuildStrategy::DropRecreate, &base, &members, true);
        assert_eq!(drop_recreate.len(), 2);
    }
}
