//! Bounded cache for validated scenarios.
//!
//! # Responsibilities
//! - Make repeated identical calculation requests cheap
//! - Bound memory with explicit LRU eviction
//!
//! # Design Decisions
//! - Key is `(locale, canonical-input-hash, repair-flag, engine-identity)`:
//!   a scenario validated under one locale or engine must never be served
//!   under another
//! - Canonical hashing relies on `serde_json`'s sorted map serialization,
//!   so key order in the raw input does not fragment the cache
//! - Capacity is injected for deterministic testing; zero disables caching

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::engine::ValidatedScenario;

/// Cache key for one validated scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioKey {
    pub locale: String,
    pub input_hash: u64,
    pub repair: bool,
    pub engine_identity: String,
}

impl ScenarioKey {
    pub fn new(locale: &[String], raw_input: &Value, repair: bool, engine_identity: &str) -> Self {
        Self {
            locale: locale.join(","),
            input_hash: canonical_hash(raw_input),
            repair,
            engine_identity: engine_identity.to_string(),
        }
    }
}

/// Hash of the canonical (sorted-key) JSON text of a value.
pub fn canonical_hash(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.to_string().hash(&mut hasher);
    hasher.finish()
}

struct Entry {
    scenario: Arc<ValidatedScenario>,
    last_used: u64,
}

struct CacheInner {
    map: HashMap<ScenarioKey, Entry>,
    tick: u64,
}

/// Fixed-capacity LRU for validated scenarios.
pub struct ScenarioCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl ScenarioCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                tick: 0,
            }),
            capacity,
        }
    }

    pub fn get(&self, key: &ScenarioKey) -> Option<Arc<ValidatedScenario>> {
        let mut inner = self.inner.lock().ok()?;
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.map.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.scenario.clone())
    }

    pub fn insert(&self, key: ScenarioKey, scenario: Arc<ValidatedScenario>) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.tick += 1;
        let tick = inner.tick;
        if inner.map.len() >= self.capacity && !inner.map.contains_key(&key) {
            // Evict the least recently used entry. Linear scan is fine at
            // the capacities this cache runs with.
            if let Some(oldest) = inner
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
            {
                inner.map.remove(&oldest);
            }
        }
        inner.map.insert(
            key,
            Entry {
                scenario,
                last_used: tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
