//! Capacity-bounded in-memory cache of completed, validated question sets,
//! keyed by request signature. Entries are created once and then only read;
//! FIFO eviction keeps the map bounded.

use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use crate::models::domain::question_set::QuestionSet;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

pub struct GenerationCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, QuestionSet>,
    order: VecDeque<String>,
}

impl GenerationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get(&self, key: &str) -> Option<QuestionSet> {
        let inner = self.inner.read().await;
        inner.entries.get(key).cloned()
    }

    /// Stores `set` under `key` unless an entry already exists. Returns
    /// whether the entry was inserted. Cache entries are never mutated in
    /// place.
    pub async fn insert_if_absent(&self, key: &str, set: QuestionSet) -> bool {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(key) {
            return false;
        }

        while inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            } else {
                break;
            }
        }

        inner.entries.insert(key.to_string(), set);
        inner.order.push_back(key.to_string());
        true
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for GenerationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
