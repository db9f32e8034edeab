//! Result cache: one reconciled series per subject.
//!
//! A lookup hits only when subject, datapoints, `from` and `to` all match the
//! stored entry exactly. A store always replaces the subject's previous entry,
//! whatever its parameters. When a capacity is set, the subject whose entry
//! was stored longest ago is evicted first; lookups do not refresh an entry.
//!
//! Entries are never invalidated by upstream data changes: a repeated request
//! returns the series computed the first time.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use vpower_types::{Subject, Timestamp};

use crate::ReconciledSeries;

/// Exact request parameters a cached series was computed for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject: Subject,
    pub datapoints: usize,
    pub from: Timestamp,
    pub to: Timestamp,
}

struct CacheEntry {
    datapoints: usize,
    from: Timestamp,
    to: Timestamp,
    series: Arc<ReconciledSeries>,
    /// Store sequence number, key into `CacheState::order`.
    seq: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Subject, CacheEntry>,
    /// Store order: sequence number → subject. Oldest first.
    order: BTreeMap<u64, Subject>,
    next_seq: u64,
}

pub struct ResultCache {
    state: Mutex<CacheState>,
    capacity: Option<usize>,
}

impl ResultCache {
    /// A cache holding at most `capacity` subjects (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: Some(capacity.max(1)),
        }
    }

    /// A cache that never evicts.
    pub fn unbounded() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: None,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ReconciledSeries>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .get(&key.subject)
            .filter(|e| e.datapoints == key.datapoints && e.from == key.from && e.to == key.to)
            .map(|e| Arc::clone(&e.series))
    }

    /// Store `series` as the subject's only entry, evicting the oldest
    /// subject if the cache is over capacity.
    pub fn put(&self, key: CacheKey, series: Arc<ReconciledSeries>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = state.next_seq;
        state.next_seq += 1;

        let entry = CacheEntry {
            datapoints: key.datapoints,
            from: key.from,
            to: key.to,
            series,
            seq,
        };
        if let Some(previous) = state.entries.insert(key.subject.clone(), entry) {
            state.order.remove(&previous.seq);
        }
        state.order.insert(seq, key.subject);

        if let Some(capacity) = self.capacity {
            while state.entries.len() > capacity {
                let Some((_, oldest)) = state.order.pop_first() else {
                    break;
                };
                state.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    fn key(account: &str, datapoints: usize, from: i64, to: i64) -> CacheKey {
        CacheKey {
            subject: Subject::account(account).unwrap(),
            datapoints,
            from: ts(from),
            to: ts(to),
        }
    }

    fn series(account: &str, block: u64) -> Arc<ReconciledSeries> {
        let mut s = ReconciledSeries::empty(Subject::account(account).unwrap());
        s.blocks.push(block);
        Arc::new(s)
    }

    #[test]
    fn hit_requires_every_parameter() {
        let cache = ResultCache::unbounded();
        cache.put(key("1.2.1", 10, 0, 100), series("1.2.1", 1));

        assert!(cache.get(&key("1.2.1", 10, 0, 100)).is_some());
        assert!(cache.get(&key("1.2.2", 10, 0, 100)).is_none());
        assert!(cache.get(&key("1.2.1", 11, 0, 100)).is_none());
        assert!(cache.get(&key("1.2.1", 10, 1, 100)).is_none());
        assert!(cache.get(&key("1.2.1", 10, 0, 101)).is_none());
    }

    #[test]
    fn subject_kind_is_part_of_the_key() {
        let cache = ResultCache::unbounded();
        cache.put(key("1:0", 10, 0, 100), series("1:0", 1));
        let worker = CacheKey {
            subject: Subject::worker("1:0").unwrap(),
            ..key("1:0", 10, 0, 100)
        };
        assert!(cache.get(&worker).is_none());
    }

    #[test]
    fn put_overwrites_subject_entry() {
        let cache = ResultCache::unbounded();
        cache.put(key("1.2.1", 10, 0, 100), series("1.2.1", 1));
        cache.put(key("1.2.1", 20, 0, 100), series("1.2.1", 2));

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("1.2.1", 10, 0, 100)).is_none());
        assert_eq!(cache.get(&key("1.2.1", 20, 0, 100)).unwrap().blocks, vec![2]);
    }

    #[test]
    fn evicts_oldest_stored_subject() {
        let cache = ResultCache::with_capacity(2);
        cache.put(key("a", 1, 0, 10), series("a", 1));
        cache.put(key("b", 1, 0, 10), series("b", 1));
        // Reading "a" does not refresh it.
        assert!(cache.get(&key("a", 1, 0, 10)).is_some());
        cache.put(key("c", 1, 0, 10), series("c", 1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a", 1, 0, 10)).is_none());
        assert!(cache.get(&key("b", 1, 0, 10)).is_some());
        assert!(cache.get(&key("c", 1, 0, 10)).is_some());
    }

    #[test]
    fn restoring_a_subject_refreshes_its_position() {
        let cache = ResultCache::with_capacity(2);
        cache.put(key("a", 1, 0, 10), series("a", 1));
        cache.put(key("b", 1, 0, 10), series("b", 1));
        cache.put(key("a", 2, 0, 10), series("a", 2));
        cache.put(key("c", 1, 0, 10), series("c", 1));

        assert!(cache.get(&key("b", 1, 0, 10)).is_none());
        assert!(cache.get(&key("a", 2, 0, 10)).is_some());
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let cache = ResultCache::with_capacity(0);
        assert_eq!(cache.capacity(), Some(1));
        cache.put(key("a", 1, 0, 10), series("a", 1));
        assert_eq!(cache.len(), 1);
    }
}
