//! Label <-> hash registry, shared across threads.
//!
//! A small single-purpose module rather than part of a larger "utils"
//! grab-bag: this file owns exactly the label/hash bijection and its
//! collision bookkeeping.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

use log::warn;

/// A stable 64-bit identifier for a label.
///
/// `DefaultHasher::new()` uses fixed keys (unlike the randomized seed of
/// `HashMap`'s `RandomState`), so `hash_of(label)` is equal across threads
/// and across runs of the same binary, as the design requires.
pub type Hash64 = u64;

fn hash_label(label: &str) -> Hash64 {
    let mut hasher = DefaultHasher::new();
    label.hash(&mut hasher);
    hasher.finish()
}

#[derive(Default)]
struct Inner {
    label_to_hash: HashMap<String, Hash64>,
    hash_to_label: HashMap<Hash64, String>,
}

/// Maps human-readable labels to stable 64-bit identifiers.
///
/// Insertion is idempotent and serialized behind a single writer lock;
/// the common case (label already registered) only needs the read lock.
pub struct HashRegistry {
    inner: RwLock<Inner>,
}

impl HashRegistry {
    pub fn new() -> Self {
        HashRegistry {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Registers `label`, trimmed of surrounding whitespace, returning its
    /// hash. Re-registering the same trimmed label returns the same hash.
    ///
    /// Returns `None` for labels that are empty after trimming; the design
    /// rejects empty labels rather than hashing them.
    pub fn intern(&self, label: &str) -> Option<Hash64> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        if let Some(hash) = self.inner.read().unwrap().label_to_hash.get(label) {
            return Some(*hash);
        }

        let mut inner = self.inner.write().unwrap();
        // Re-check: another writer may have interned it between our read and
        // acquiring the write lock.
        if let Some(hash) = inner.label_to_hash.get(label) {
            return Some(*hash);
        }

        let hash = hash_label(label);
        if let Some(existing) = inner.hash_to_label.get(&hash) {
            if existing != label {
                warn!(
                    "hash registry: label `{label}` collides with existing label \
                     `{existing}` under hash {hash:#x}; keeping `{existing}` as primary"
                );
                inner.label_to_hash.insert(label.to_string(), hash);
                return Some(hash);
            }
        } else {
            inner.hash_to_label.insert(hash, label.to_string());
        }
        inner.label_to_hash.insert(label.to_string(), hash);
        Some(hash)
    }

    /// Looks up the primary (first-inserted) label for a hash, if any.
    pub fn label_of(&self, hash: Hash64) -> Option<String> {
        self.inner.read().unwrap().hash_to_label.get(&hash).cloned()
    }

    /// Discards all registered labels. Used by a full reset; a plain
    /// `clear()` call preserves the registry.
    pub fn reset(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.label_to_hash.clear();
        inner.hash_to_label.clear();
    }
}

impl Default for HashRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_insertion() {
        let registry = HashRegistry::new();
        let a = registry.intern("region").unwrap();
        let b = registry.intern("region").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn whitespace_trimmed_before_hashing() {
        let registry = HashRegistry::new();
        let a = registry.intern("region").unwrap();
        let b = registry.intern("  region  ").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_label_rejected() {
        let registry = HashRegistry::new();
        assert!(registry.intern("").is_none());
        assert!(registry.intern("   ").is_none());
    }

    #[test]
    fn label_of_round_trips() {
        let registry = HashRegistry::new();
        let hash = registry.intern("fib").unwrap();
        assert_eq!(registry.label_of(hash).as_deref(), Some("fib"));
    }
}
