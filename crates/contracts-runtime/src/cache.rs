//! Validation result cache.
//!
//! Keys are content hashes of the normalized contract and the candidate, so
//! two separately loaded but identical contracts share entries.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use contracts_core::{Candidate, Contract, ValidationResult};

/// SHA-256 over the canonical contract JSON and the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Hash a contract and candidate.
    ///
    /// Each part is length-prefixed so that different splits of the same
    /// bytes never collide.
    pub fn new(contract: &Contract, candidate: &Candidate) -> Self {
        let contract_json = serde_json::to_string(contract).unwrap_or_default();
        let structured_json = candidate
            .structured
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        for part in [
            contract_json.as_bytes(),
            candidate.text.as_bytes(),
            structured_json.as_bytes(),
        ] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        CacheKey(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

struct CacheEntry {
    result: ValidationResult,
    inserted_at: Instant,
}

/// In-memory TTL cache with a bounded entry count.
pub struct ValidationCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ValidationCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Fetch a live entry. Expired entries are dropped on access.
    pub fn get(&self, key: &CacheKey) -> Option<ValidationResult> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a result, evicting the oldest entry when full.
    pub fn insert(&self, key: CacheKey, result: ValidationResult) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| *k);
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
