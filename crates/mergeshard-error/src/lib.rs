//! Error types for mergeshard.
//!
//! Every fallible operation in the workspace returns [`Result`], whose error
//! side is the single [`ShardError`] enum. Backends wrap their native errors
//! into [`ShardError::DdlExecution`] (for rejected DDL) or
//! [`ShardError::Backend`] (for catalog lookups and transaction control).

use thiserror::Error;

/// Boxed backend error carried as the source of DDL and backend failures.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for mergeshard operations.
#[derive(Error, Debug)]
pub enum ShardError {
    /// The host dataset definition did not supply a usable base/template name.
    #[error("configuration error: {detail}")]
    Configuration { detail: String },

    /// An ad-hoc union referenced partition tables that do not exist.
    /// No DDL was issued.
    #[error("missing partition table(s): {}", .names.join(", "))]
    MissingPartition { names: Vec<String> },

    /// The backend rejected or failed a DDL statement.
    #[error("DDL failed [{statement}]: {source}")]
    DdlExecution {
        statement: String,
        #[source]
        source: BoxedError,
    },

    /// A non-DDL backend request (existence check, listing, transaction
    /// control) failed.
    #[error("backend error: {detail}")]
    Backend {
        detail: String,
        #[source]
        source: Option<BoxedError>,
    },

    /// A table name cannot be expressed as an identifier in the target dialect.
    #[error("invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: &'static str },
}

/// Result type alias using [`ShardError`].
pub type Result<T, E = ShardError> = std::result::Result<T, E>;

impl ShardError {
    /// Create a configuration error.
    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::Configuration {
            detail: detail.into(),
        }
    }

    /// Create a missing-partition error for the given table names.
    pub fn missing_partitions(names: Vec<String>) -> Self {
        Self::MissingPartition { names }
    }

    /// Wrap a backend failure for the given statement.
    pub fn ddl(statement: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::DdlExecution {
            statement: statement.into(),
            source: source.into(),
        }
    }

    /// Create a backend error without an underlying cause.
    pub fn backend(detail: impl Into<String>) -> Self {
        Self::Backend {
            detail: detail.into(),
            source: None,
        }
    }

    /// Create a backend error wrapping an underlying cause.
    pub fn backend_with(detail: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Backend {
            detail: detail.into(),
            source: Some(source.into()),
        }
    }

    /// Create an invalid-identifier error.
    pub fn invalid_identifier(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            reason,
        }
    }

    /// Partition names carried by a [`ShardError::MissingPartition`], or an
    /// empty slice for every other variant.
    pub fn missing_names(&self) -> &[String] {
        match self {
            Self::MissingPartition { names } => names,
            _ => &[],
        }
    }

    /// Whether this error came from the backend rather than from validation
    /// done before any DDL was issued.
    pub const fn is_backend_failure(&self) -> bool {
        matches!(self, Self::DdlExecution { .. } | Self::Backend { .. })
    }
}
