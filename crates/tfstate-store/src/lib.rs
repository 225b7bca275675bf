//! State and lock persistence for the tfstate backend.
//!
//! One record per workspace fingerprint: an opaque state blob and an opaque
//! lock envelope. The store never interprets either; lock semantics live in
//! the server's dispatcher.
//!
//! # Storage Backends
//!
//! All backends implement the [`StateStore`] trait:
//!
//! - [`InMemoryStateStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`SqliteStateStore`] -- single-table SQLite database
//!
//! # Design Rules
//!
//! 1. Absent records read as the zero value, never as an error.
//! 2. Every write replaces the whole record with one upsert statement.
//! 3. Conditional writes go through [`StateStore::update`], which reads and
//!    writes atomically; there is no separate existence check.
//! 4. Table and column names come from an immutable [`StateSchema`].
//! 5. All storage errors are propagated, never retried.

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStateStore;
pub use schema::StateSchema;
pub use sqlite::SqliteStateStore;
pub use traits::{StateStore, UpdateFn};
