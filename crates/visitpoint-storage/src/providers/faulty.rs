//! Fault-injecting wrapper around another persistence provider.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tracing::warn;

use visitpoint_core::error::UnavailableError;
use visitpoint_core::result::StoreResult;
use visitpoint_core::traits::persistence::{PersistenceProvider, UpdateFn};

/// Provider that fails on demand.
///
/// Used to simulate a backend outage: while `offline` is set, or while
/// `fail_next` calls remain, every operation returns [`UnavailableError`]
/// without touching the inner store.
pub struct FaultyStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<dyn PersistenceProvider<K, V>>,
    offline: AtomicBool,
    fail_next: AtomicU32,
}

impl<K, V> FaultyStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Wrap `inner`; starts online.
    pub fn new(inner: Arc<dyn PersistenceProvider<K, V>>) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            fail_next: AtomicU32::new(0),
        }
    }

    /// Take the backend offline or bring it back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` operations, then recover.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    fn check(&self, op: &'static str) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            warn!(op, "Injected persistence outage");
            return Err(UnavailableError::new(format!("{op}: backend offline")));
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            warn!(op, "Injected persistence fault");
            return Err(UnavailableError::new(format!("{op}: injected fault")));
        }
        Ok(())
    }
}

impl<K, V> fmt::Debug for FaultyStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultyStore")
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .field("fail_next", &self.fail_next.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl<K, V> PersistenceProvider<K, V> for FaultyStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn put(&self, key: K, value: V) -> StoreResult<()> {
        self.check("put")?;
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &K) -> StoreResult<Option<V>> {
        self.check("delete")?;
        self.inner.delete(key).await
    }

    async fn values(&self) -> StoreResult<Vec<V>> {
        self.check("values")?;
        self.inner.values().await
    }

    async fn atomic_update(&self, key: &K, update: UpdateFn<V>) -> StoreResult<Option<V>> {
        self.check("atomic_update")?;
        self.inner.atomic_update(key, update).await
    }
}
