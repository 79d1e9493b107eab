//! Explicit active-table context for query construction.
//!
//! Every request owns its own [`TableScope`]; table selection never lives in
//! process-wide state.

use mergeshard_error::Result;

use crate::ddl::Dialect;
use crate::name::BaseName;

/// Which physical table queries for one dataset should read.
///
/// Without an override the scope points at the aggregate union (the base
/// name). An override redirects it to a partition or temporary union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScope {
    base: BaseName,
    active: Option<String>,
}

impl TableScope {
    #[must_use]
    pub fn new(base: BaseName) -> Self {
        Self { base, active: None }
    }

    /// Scope already pointing at `name`. Passing the base name yields a scope
    /// without an override.
    #[must_use]
    pub fn resolved(base: BaseName, name: impl Into<String>) -> Self {
        let mut scope = Self::new(base);
        scope.set_override(name);
        scope
    }

    #[must_use]
    pub fn base(&self) -> &BaseName {
        &self.base
    }

    /// The table queries should target right now.
    #[must_use]
    pub fn active(&self) -> &str {
        self.active.as_deref().unwrap_or_else(|| self.base.as_str())
    }

    #[must_use]
    pub fn is_overridden(&self) -> bool {
        self.active.is_some()
    }

    pub fn set_override(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.active = (name != self.base.as_str()).then_some(name);
    }

    /// Drop the override, returning it.
    pub fn clear_override(&mut self) -> Option<String> {
        self.active.take()
    }

    /// `SELECT <columns> FROM <active>` for `dialect`. An empty column list
    /// selects `*`.
    pub fn select_sql(&self, dialect: Dialect, columns: &[&str]) -> Result<String> {
        let projection = if columns.is_empty() {
            "*".to_owned()
        } else {
            columns
                .iter()
                .map(|c| dialect.quote_ident(c))
                .collect::<Result<Vec<_>>>()?
                .join(", ")
        };
        Ok(format!(
            "SELECT {projection} FROM {}",
            dialect.quote_ident(self.active())?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BaseName {
        BaseName::new("report").unwrap()
    }

    #[test]
    fn defaults_to_aggregate() {
        let scope = TableScope::new(report());
        assert_eq!(scope.active(), "report");
        assert!(!scope.is_overridden());
    }

    #[test]
    fn override_and_clear() {
        let mut scope = TableScope::new(report());
        scope.set_override("report_15432");
        assert_eq!(scope.active(), "report_15432");
        assert_eq!(scope.clear_override().as_deref(), Some("report_15432"));
        assert_eq!(scope.active(), "report");
    }

    #[test]
    fn resolving_to_base_is_not_an_override() {
        let scope = TableScope::resolved(report(), "report");
        assert!(!scope.is_overridden());
    }

    #[test]
    fn scopes_are_independent() {
        let mut a = TableScope::new(report());
        let b = a.clone();
        a.set_override("report_1");
        assert_eq!(a.active(), "report_1");
        assert_eq!(b.active(), "report");
    }

    #[test]
    fn select_sql_quotes_per_dialect() {
        let scope = TableScope::resolved(report(), "report_15432");
        assert_eq!(
            scope.select_sql(Dialect::MySqlMerge, &["id", "total"]).unwrap(),
            "SELECT `id`, `total` FROM `report_15432`"
        );
        assert_eq!(
            scope.select_sql(Dialect::SqliteView, &[]).unwrap(),
            "SELECT * FROM \"report_15432\""
        );
    }
}
