//! In-memory persistence provider backed by `DashMap`.

use std::fmt;
use std::hash::Hash;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use visitpoint_core::result::StoreResult;
use visitpoint_core::traits::persistence::{PersistenceProvider, UpdateFn};

/// Key/value store held in process memory.
///
/// `atomic_update` runs the closure while holding the shard lock for the
/// key, so concurrent updates of one key are linearized.
pub struct MemoryStore<K, V> {
    name: &'static str,
    map: DashMap<K, V>,
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty store. `name` only appears in debug output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            map: DashMap::new(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, V> fmt::Debug for MemoryStore<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.name)
            .field("len", &self.map.len())
            .finish()
    }
}

#[async_trait]
impl<K, V> PersistenceProvider<K, V> for MemoryStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        Ok(self.map.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: K, value: V) -> StoreResult<()> {
        self.map.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: &K) -> StoreResult<Option<V>> {
        Ok(self.map.remove(key).map(|(_, v)| v))
    }

    async fn values(&self) -> StoreResult<Vec<V>> {
        Ok(self.map.iter().map(|r| r.value().clone()).collect())
    }

    async fn atomic_update(&self, key: &K, update: UpdateFn<V>) -> StoreResult<Option<V>> {
        match self.map.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.get().clone();
                if let Some(next) = update(Some(&previous)) {
                    occupied.insert(next);
                }
                Ok(Some(previous))
            }
            Entry::Vacant(vacant) => {
                if let Some(next) = update(None) {
                    vacant.insert(next);
                }
                Ok(None)
            }
        }
    }
}
