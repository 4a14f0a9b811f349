//! Per-identifier change cache
//!
//! Remembers the last field values seen for every key and reports which
//! fields differ from them. Unchanged observations report nothing, which is
//! what keeps a bus full of periodic frames from flooding the display.
//!
//! Entries are never evicted. The identifier space of a real bus is small
//! enough that this is not a concern in practice.

use alloc::collections::btree_map::{self, BTreeMap};
use alloc::vec;
use alloc::vec::Vec;

use canlink_protocol::{DecodedFrame, FrameId};

/// Per-field change flags, same length as the fields they describe
pub type DiffMask = Vec<bool>;

/// Cached state for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<F> {
    last_data: Vec<F>,
    diff_mask: DiffMask,
    last_seen_ms: u64,
}

impl<F> CacheEntry<F> {
    /// Field values of the most recent change
    pub fn last_data(&self) -> &[F] {
        &self.last_data
    }

    /// Fields that changed in the most recent change
    pub fn diff_mask(&self) -> &[bool] {
        &self.diff_mask
    }

    /// Time of the most recent change
    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }
}

/// Change cache keyed by identifier
#[derive(Debug, Clone)]
pub struct ChangeCache<K, F> {
    entries: BTreeMap<K, CacheEntry<F>>,
}

impl<K: Ord, F> Default for ChangeCache<K, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, F> ChangeCache<K, F> {
    /// Create an empty cache
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Number of keys seen
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True before the first observation
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached state for `key`
    pub fn get(&self, key: &K) -> Option<&CacheEntry<F>> {
        self.entries.get(key)
    }

    /// All entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, K, CacheEntry<F>> {
        self.entries.iter()
    }

    /// Drop the entry for `key`
    ///
    /// The next observation of `key` is reported as a full change. Returns
    /// true if an entry existed.
    pub fn forget(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }
}

impl<K: Ord, F: PartialEq + Clone> ChangeCache<K, F> {
    /// Record `fields` for `key` and report what changed
    ///
    /// - first sighting: every field is flagged
    /// - identical to the cached value: `None`, the entry is untouched
    /// - same length, different values: element-wise mask
    /// - different length: every field is flagged, no partial alignment
    ///
    /// Whenever a mask is returned the entry is overwritten and stamped
    /// with `now_ms`.
    pub fn observe(&mut self, key: K, fields: &[F], now_ms: u64) -> Option<DiffMask> {
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                let mask = vec![true; fields.len()];
                slot.insert(CacheEntry {
                    last_data: fields.to_vec(),
                    diff_mask: mask.clone(),
                    last_seen_ms: now_ms,
                });
                Some(mask)
            }
            btree_map::Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.last_data.as_slice() == fields {
                    return None;
                }

                let mask: DiffMask = if entry.last_data.len() == fields.len() {
                    entry
                        .last_data
                        .iter()
                        .zip(fields)
                        .map(|(old, new)| old != new)
                        .collect()
                } else {
                    vec![true; fields.len()]
                };

                entry.last_data.clear();
                entry.last_data.extend_from_slice(fields);
                entry.diff_mask.clone_from(&mask);
                entry.last_seen_ms = now_ms;
                Some(mask)
            }
        }
    }
}

impl ChangeCache<FrameId, u8> {
    /// Observe a decoded bus frame
    pub fn observe_frame(&mut self, frame: &DecodedFrame, now_ms: u64) -> Option<DiffMask> {
        self.observe(frame.id, &frame.data, now_ms)
    }
}
