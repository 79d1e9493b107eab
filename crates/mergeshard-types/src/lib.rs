//! Shared vocabulary for the mergeshard workspace: dataset names, partition
//! keys, the DDL statement model, and the explicit active-table scope.

pub mod ddl;
pub mod key;
pub mod name;
pub mod scope;

pub use ddl::{DdlStatement, Dialect, RebuildStrategy};
pub use key::{KeySelector, PartitionKey};
pub use name::{BaseName, validate_identifier};
pub use scope::TableScope;
