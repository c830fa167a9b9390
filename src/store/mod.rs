//! Shared in-process aggregate store.
//!
//! The store is the only mutable state shared between pipeline stages. It
//! offers Redis-shaped single-key primitives over lock-free structures:
//! numeric values with decimal increment, field hashes, plain sets with
//! atomic pop, and score-ordered indexes with rank and score-range reads.
//! There are no cross-key transactions; every operation is atomic for its
//! key only, which is all the pipeline relies on. Sorted-index mutations
//! are serialized per key while range reads stay lock-free: a score replace
//! inserts the new entry before retiring the old, so a concurrent scan may
//! briefly see a member under two scores but never misses it.

use std::collections::{HashMap, HashSet};
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use rust_decimal::Decimal;

/// Entry in a score-ordered index. Ordered by score first, member second, so
/// equal scores stay deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ScoredMember {
    score: Decimal,
    member: String,
}

/// A score-ordered member index with score replacement on re-add.
///
/// Mutations are serialized by `write_lock` and insert the new entry before
/// retiring the old, so the lock-free range reads never observe a member as
/// absent mid-replace; at worst a scan sees a replaced member under both its
/// old and new score for an instant.
struct SortedIndex {
    by_score: SkipMap<ScoredMember, ()>,
    scores: DashMap<String, Decimal>,
    write_lock: Mutex<()>,
}

impl SortedIndex {
    fn new() -> Self {
        Self {
            by_score: SkipMap::new(),
            scores: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Serialize mutations. Poisoning cannot leave the index inconsistent
    /// (the critical sections never panic between the paired map updates),
    /// so a poisoned lock is simply taken over.
    fn write_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The shared store. Cheap to clone behind an [`Arc`]; all operations take
/// `&self`.
#[derive(Default)]
pub struct Store {
    numbers: DashMap<String, Decimal>,
    hashes: DashMap<String, HashMap<String, Decimal>>,
    sets: DashMap<String, HashSet<String>>,
    zsets: DashMap<String, Arc<SortedIndex>>,
}

impl Store {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // --- numeric values ---

    /// Set a numeric value.
    pub fn set_num(&self, key: &str, value: Decimal) {
        self.numbers.insert(key.to_string(), value);
    }

    /// Read a numeric value.
    pub fn get_num(&self, key: &str) -> Option<Decimal> {
        self.numbers.get(key).map(|entry| *entry.value())
    }

    /// Add `delta` to the numeric value at `key` (missing counts as zero) and
    /// return the new value.
    pub fn incr_by(&self, key: &str, delta: Decimal) -> Decimal {
        let mut entry = self.numbers.entry(key.to_string()).or_insert(Decimal::ZERO);
        *entry += delta;
        *entry
    }

    /// Delete `key` from every namespace.
    pub fn del(&self, key: &str) {
        self.numbers.remove(key);
        self.hashes.remove(key);
        self.sets.remove(key);
        self.zsets.remove(key);
    }

    // --- hashes ---

    /// Set `field` in the hash at `key`.
    pub fn hset(&self, key: &str, field: &str, value: Decimal) {
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Read `field` from the hash at `key`.
    pub fn hget(&self, key: &str, field: &str) -> Option<Decimal> {
        self.hashes.get(key).and_then(|hash| hash.get(field).copied())
    }

    /// Whether `field` exists in the hash at `key`.
    pub fn hexists(&self, key: &str, field: &str) -> bool {
        self.hashes
            .get(key)
            .is_some_and(|hash| hash.contains_key(field))
    }

    /// Remove `field` from the hash at `key`; returns its value if present.
    pub fn hdel(&self, key: &str, field: &str) -> Option<Decimal> {
        self.hashes.get_mut(key).and_then(|mut hash| hash.remove(field))
    }

    /// Number of fields in the hash at `key`.
    pub fn hlen(&self, key: &str) -> usize {
        self.hashes.get(key).map_or(0, |hash| hash.len())
    }

    /// Add `delta` to `field` in the hash at `key` (missing counts as zero)
    /// and return the new value.
    pub fn hincr_by(&self, key: &str, field: &str, delta: Decimal) -> Decimal {
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        let value = hash.entry(field.to_string()).or_insert(Decimal::ZERO);
        *value += delta;
        *value
    }

    /// All `(field, value)` pairs of the hash at `key`.
    pub fn hgetall(&self, key: &str) -> Vec<(String, Decimal)> {
        self.hashes.get(key).map_or_else(Vec::new, |hash| {
            hash.iter().map(|(field, value)| (field.clone(), *value)).collect()
        })
    }

    /// Hash keys beginning with `prefix`.
    pub fn hash_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.hashes
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }

    // --- plain sets ---

    /// Add `member` to the set at `key`.
    pub fn sadd(&self, key: &str, member: &str) {
        self.sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
    }

    /// Atomically remove and return up to `count` members of the set at
    /// `key`. Members are delivered at most once across concurrent callers.
    pub fn spop_n(&self, key: &str, count: usize) -> Vec<String> {
        let Some(mut set) = self.sets.get_mut(key) else {
            return Vec::new();
        };
        let popped: Vec<String> = set.iter().take(count).cloned().collect();
        for member in &popped {
            set.remove(member);
        }
        popped
    }

    /// Number of members in the set at `key`.
    pub fn scard(&self, key: &str) -> usize {
        self.sets.get(key).map_or(0, |set| set.len())
    }

    // --- score-ordered indexes ---

    fn zset(&self, key: &str) -> Arc<SortedIndex> {
        self.zsets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(SortedIndex::new()))
            .clone()
    }

    /// Insert `member` with `score`, replacing any previous score.
    ///
    /// The new entry lands before the old one is retired, so a concurrent
    /// range read always finds the member; during the hand-over it may see
    /// it under both scores, never under none.
    pub fn zadd(&self, key: &str, score: Decimal, member: &str) {
        let index = self.zset(key);
        let _guard = index.write_guard();
        let previous = index.scores.insert(member.to_string(), score);
        index.by_score.insert(
            ScoredMember {
                score,
                member: member.to_string(),
            },
            (),
        );
        if let Some(old) = previous
            && old != score
        {
            index.by_score.remove(&ScoredMember {
                score: old,
                member: member.to_string(),
            });
        }
    }

    /// Remove `member` from the index at `key`.
    pub fn zrem(&self, key: &str, member: &str) {
        let Some(index) = self.zsets.get(key).map(|entry| entry.value().clone()) else {
            return;
        };
        let _guard = index.write_guard();
        if let Some((_, score)) = index.scores.remove(member) {
            index.by_score.remove(&ScoredMember {
                score,
                member: member.to_string(),
            });
        }
    }

    /// Read `count` members starting at rank `offset`, ascending by score or
    /// descending when `desc`. Returns `(member, score)` pairs.
    pub fn zrange_batch(
        &self,
        key: &str,
        offset: usize,
        count: usize,
        desc: bool,
    ) -> Vec<(String, Decimal)> {
        let Some(index) = self.zsets.get(key).map(|entry| entry.value().clone()) else {
            return Vec::new();
        };
        let map_entry =
            |entry: crossbeam_skiplist::map::Entry<'_, ScoredMember, ()>| {
                (entry.key().member.clone(), entry.key().score)
            };
        if desc {
            index.by_score.iter().rev().skip(offset).take(count).map(map_entry).collect()
        } else {
            index.by_score.iter().skip(offset).take(count).map(map_entry).collect()
        }
    }

    /// All members with `min <= score <= max`, ascending. Returns
    /// `(member, score)` pairs.
    pub fn zrange_by_score(&self, key: &str, min: Decimal, max: Decimal) -> Vec<(String, Decimal)> {
        let Some(index) = self.zsets.get(key).map(|entry| entry.value().clone()) else {
            return Vec::new();
        };
        let lower = ScoredMember {
            score: min,
            member: String::new(),
        };
        index
            .by_score
            .range((Bound::Included(lower), Bound::Unbounded))
            .take_while(|entry| entry.key().score <= max)
            .map(|entry| (entry.key().member.clone(), entry.key().score))
            .collect()
    }

    /// Number of members in the index at `key`.
    pub fn zcard(&self, key: &str) -> usize {
        self.zsets.get(key).map_or(0, |entry| entry.value().by_score.len())
    }
}
