//! SQLite storage backend.
//!
//! SQLite has no MERGE engine, so a union is a `UNION ALL` view over its
//! members. Views cannot be written to, which gives the insert-disabled
//! property for free, and SQLite DDL is transactional, so aggregate rebuilds
//! are atomic for readers even without the rename-swap strategy.

mod backend;
pub mod render;

pub use backend::SqliteBackend;
pub use render::{clone_definition, escape_like, render_sqlite};
