use tfstate_types::{StateId, StateRecord};

use crate::error::StoreResult;

/// Decides the replacement for a record inside [`StateStore::update`].
///
/// Receives the current record (the zero value if none exists) and returns
/// `Some(next)` to replace it, or `None` to leave storage untouched.
pub type UpdateFn<'a> = dyn FnMut(&StateRecord) -> Option<StateRecord> + 'a;

/// Persistence for workspace state and locks.
///
/// All implementations must satisfy these invariants:
/// - At most one record per [`StateId`]; writes replace the whole record.
/// - A key that was never written reads as [`StateRecord::default()`].
///   Absence is not an error.
/// - [`update`](Self::update) is atomic: no other write to the same key can
///   land between the read it hands to the closure and the write it makes.
/// - Storage errors are propagated, never swallowed or retried.
pub trait StateStore: Send + Sync {
    /// Read the record for `id`, or the zero value if absent.
    fn lookup(&self, id: &StateId) -> StoreResult<StateRecord>;

    /// Insert or replace the record for `id` in a single statement.
    fn upsert(&self, id: &StateId, record: &StateRecord) -> StoreResult<()>;

    /// Every stored record, ordered by key.
    fn scan(&self) -> StoreResult<Vec<StateRecord>>;

    /// Atomic read-decide-write on one record.
    ///
    /// Reads the current record for `id`, passes it to `apply`, and if
    /// `apply` returns a replacement persists it before any other writer to
    /// `id` can observe the old value. Returns the record as it was before
    /// the call, so callers can tell what `apply` saw.
    fn update(&self, id: &StateId, apply: &mut UpdateFn<'_>) -> StoreResult<StateRecord>;
}
