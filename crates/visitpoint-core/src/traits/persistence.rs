//! Persistence provider trait for the engine's durable records.

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;

use crate::result::StoreResult;

/// Read-modify-write closure passed to [`PersistenceProvider::atomic_update`].
///
/// Receives the current value (if any) and returns the replacement, or
/// `None` to leave the stored value untouched.
pub type UpdateFn<V> = Box<dyn FnOnce(Option<&V>) -> Option<V> + Send>;

/// Durable key/value storage for one record type.
///
/// The backing service (a backend-as-a-service document store in
/// production, the in-memory store in `visitpoint-storage` in tests) only has to
/// guarantee per-key atomicity for `atomic_update`. Cross-key consistency
/// is the engine's job.
///
/// Every method fails only with [`UnavailableError`](crate::error::UnavailableError).
#[async_trait]
pub trait PersistenceProvider<K, V>: Send + Sync + fmt::Debug + 'static
where
    K: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Get a record by key.
    async fn get(&self, key: &K) -> StoreResult<Option<V>>;

    /// Insert or replace a record.
    async fn put(&self, key: K, value: V) -> StoreResult<()>;

    /// Remove a record, returning the removed value.
    async fn delete(&self, key: &K) -> StoreResult<Option<V>>;

    /// Snapshot of every stored record, in no particular order.
    async fn values(&self) -> StoreResult<Vec<V>>;

    /// Atomically apply `update` to the record under `key`.
    ///
    /// Returns the value as it was *before* the update.
    async fn atomic_update(&self, key: &K, update: UpdateFn<V>) -> StoreResult<Option<V>>;
}
