// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Concurrent in-memory store for per-key rate state.
//!
//! Each entry is a small `Copy` value swapped wholesale under the entry's
//! shard lock. Calls for the same key serialize; calls for different keys
//! only contend when they hash to the same shard.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;

/// Thread-safe map from a rate key (IP, session id) to its state.
#[derive(Debug)]
pub struct RateStore<K, S>
where
    K: Eq + Hash,
{
    entries: DashMap<K, S>,
}

impl<K, S> RateStore<K, S>
where
    K: Eq + Hash,
    S: Copy,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Snapshot of the state stored for `key`.
    pub fn get(&self, key: &K) -> Option<S> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    /// Overwrite the state stored for `key`.
    pub fn put(&self, key: K, state: S) {
        self.entries.insert(key, state);
    }

    /// Atomic read-modify-write of a single entry.
    ///
    /// `f` sees the current state (or `None`) and returns the state to write
    /// back together with a result for the caller. The entry stays locked
    /// until the new state is stored, so two callers for the same key can
    /// never both observe the same old state.
    pub fn update<R, F>(&self, key: K, f: F) -> R
    where
        F: FnOnce(Option<S>) -> (S, R),
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let (next, outcome) = f(Some(*occupied.get()));
                occupied.insert(next);
                outcome
            }
            Entry::Vacant(vacant) => {
                let (next, outcome) = f(None);
                vacant.insert(next);
                outcome
            }
        }
    }

    /// Drop the state for one key.
    pub fn remove(&self, key: &K) -> Option<S> {
        self.entries.remove(key).map(|(_, state)| state)
    }

    /// Drop every entry. Returns how many were present.
    ///
    /// Entries written concurrently with the clear may survive it; they are
    /// indistinguishable from entries written just after.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        self.entries.retain(|_, _| {
            dropped += 1;
            false
        });
        dropped
    }

    /// Keep only the entries for which `keep` returns true. Returns how many
    /// were dropped.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&K, &S) -> bool,
    {
        let mut dropped = 0;
        self.entries.retain(|key, state| {
            let kept = keep(key, state);
            if !kept {
                dropped += 1;
            }
            kept
        });
        dropped
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, S> Default for RateStore<K, S>
where
    K: Eq + Hash,
    S: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}
