//! DDL statement model and backend dialects.
//!
//! The lifecycle code never builds SQL text directly. It emits
//! [`DdlStatement`] values which a backend renders for its [`Dialect`]
//! (MERGE tables on MySQL, read-only views on SQLite).

use std::fmt;

use mergeshard_error::{Result, ShardError};
use serde::{Deserialize, Serialize};

use crate::name::validate_identifier;

/// Maximum identifier length accepted by MySQL.
pub const MYSQL_MAX_IDENTIFIER_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

/// How a backend expresses union tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL/MariaDB `MERGE` storage engine over MyISAM partitions.
    MySqlMerge,
    /// SQLite, where a union is a `UNION ALL` view (views reject writes).
    SqliteView,
}

impl Dialect {
    /// Whether DDL statements take part in transactions, so that a batch of
    /// them commits or rolls back as a unit.
    #[must_use]
    pub const fn supports_transactional_ddl(self) -> bool {
        match self {
            Self::MySqlMerge => false,
            Self::SqliteView => true,
        }
    }

    /// Whether several union tables can be renamed in one atomic statement.
    #[must_use]
    pub const fn supports_atomic_rename(self) -> bool {
        match self {
            Self::MySqlMerge => true,
            Self::SqliteView => false,
        }
    }

    #[must_use]
    pub const fn quote_char(self) -> char {
        match self {
            Self::MySqlMerge => '`',
            Self::SqliteView => '"',
        }
    }

    /// Quote `name` as an identifier, doubling embedded quote characters.
    pub fn quote_ident(self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        if self == Self::MySqlMerge && name.chars().count() > MYSQL_MAX_IDENTIFIER_LEN {
            return Err(ShardError::invalid_identifier(
                name,
                "identifier is longer than 64 characters",
            ));
        }
        let q = self.quote_char();
        let mut out = String::with_capacity(name.len() + 2);
        out.push(q);
        for ch in name.chars() {
            if ch == q {
                out.push(q);
            }
            out.push(ch);
        }
        out.push(q);
        Ok(out)
    }

    /// Quote a list of identifiers and join them with `", "`.
    pub fn quote_list(self, names: &[String]) -> Result<String> {
        let quoted = names
            .iter()
            .map(|n| self.quote_ident(n))
            .collect::<Result<Vec<_>>>()?;
        Ok(quoted.join(", "))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MySqlMerge => f.write_str("mysql-merge"),
            Self::SqliteView => f.write_str("sqlite-view"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rebuild strategy
// ---------------------------------------------------------------------------

/// How the aggregate union is replaced during a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildStrategy {
    /// Build under a staging name, then atomically rename over the aggregate.
    #[default]
    Swap,
    /// Drop the aggregate, then create it again.
    DropRecreate,
}

impl RebuildStrategy {
    /// The strategy actually usable on `dialect`. `Swap` needs atomic rename
    /// and degrades to `DropRecreate` without it.
    #[must_use]
    pub const fn effective(self, dialect: Dialect) -> Self {
        match self {
            Self::Swap if dialect.supports_atomic_rename() => Self::Swap,
            _ => Self::DropRecreate,
        }
    }
}

impl fmt::Display for RebuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swap => f.write_str("swap"),
            Self::DropRecreate => f.write_str("drop_recreate"),
        }
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// One logical DDL step issued by the lifecycle code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStatement {
    /// Create `table` as a schema clone of `template` if it does not exist.
    ClonePartition { table: String, template: String },
    /// Create `table` shaped like `template` and turn it into a read-only
    /// union over `members`, in order. `temporary` scopes it to the session.
    CreateUnion {
        table: String,
        template: String,
        members: Vec<String>,
        temporary: bool,
    },
    /// Drop a union table if it exists. Never issued for partitions.
    DropUnion { table: String, temporary: bool },
    /// Rename union tables as one atomic step, `(from, to)` applied in order.
    RenameUnions { renames: Vec<(String, String)> },
}

impl DdlStatement {
    /// Short statement kind, used as a structured log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClonePartition { .. } => "clone_partition",
            Self::CreateUnion { .. } => "create_union",
            Self::DropUnion { .. } => "drop_union",
            Self::RenameUnions { .. } => "rename_unions",
        }
    }

    /// The table this statement creates, drops, or (for renames) the first
    /// rename target.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::ClonePartition { table, .. }
            | Self::CreateUnion { table, .. }
            | Self::DropUnion { table, .. } => table,
            Self::RenameUnions { renames } => renames.first().map_or("", |(_, to)| to.as_str()),
        }
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClonePartition { table, template } => {
                write!(f, "clone partition {table} from {template}")
            }
            Self::CreateUnion {
                table,
                template,
                members,
                temporary,
            } => {
                let scope = if *temporary { "temporary " } else { "" };
                write!(
                    f,
                    "create {scope}union {table} like {template} over [{}]",
                    members.join(", ")
                )
            }
            Self::DropUnion { table, temporary } => {
                let scope = if *temporary { "temporary " } else { "" };
                write!(f, "drop {scope}union {table}")
            }
            Self::RenameUnions { renames } => {
                f.write_str("rename ")?;
                for (i, (from, to)) in renames.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{from} -> {to}")?;
                }
                Ok(())
            }
        }
    }
}
