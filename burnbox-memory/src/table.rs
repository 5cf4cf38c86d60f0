// Copyright 2026 burnbox Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use burnbox_common::{strict_assert, strict_assert_eq};
use bytes::Bytes;
use hashbrown::HashMap;
use tokio::time::Instant;

use crate::{
    queue::{OrderQueue, Token},
    stats::Stats,
    tombstone::{Fate, Tombstones},
};

/// A live secret.
#[derive(Debug)]
pub struct Entry {
    data: Bytes,
    created_at: Instant,
    token: Token,
}

impl Entry {
    /// Size charged against the memory limit.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Consume the entry and take its bytes.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

/// The id index and the insertion-ordered queue of a store, with usage counters.
///
/// Not synchronized. The store guards the whole table with one lock; every method must be called with it held.
#[derive(Debug)]
pub struct EntryTable {
    index: HashMap<String, Entry>,
    order: OrderQueue<String>,

    used: usize,
    limit: usize,

    created: u64,
    retrieved: u64,
}

impl EntryTable {
    /// Create an empty table with the given memory limit in bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            index: HashMap::new(),
            order: OrderQueue::new(),
            used: 0,
            limit,
            created: 0,
            retrieved: 0,
        }
    }

    /// Returns `true` if `id` is live.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Evict the oldest entries until `size` more bytes fit, or the table is empty.
    ///
    /// Evicted ids are recorded as recycled at `now`. Returns the evicted ids, oldest first.
    pub fn make_room(&mut self, size: usize, now: Instant, tombstones: &Tombstones) -> Vec<String> {
        let mut evicted = vec![];
        while self.used + size > self.limit {
            let Some(id) = self.pop_oldest() else {
                break;
            };
            tombstones.record(id.clone(), Fate::Recycled, now);
            evicted.push(id);
        }
        evicted
    }

    /// Insert a new entry at the tail.
    ///
    /// The caller must have checked that `id` is not live and made room for `data`.
    pub fn insert(&mut self, id: String, data: Bytes, now: Instant) {
        strict_assert!(!self.index.contains_key(&id));
        strict_assert!(self.used + data.len() <= self.limit);

        let token = self.order.push(id.clone());
        self.used += data.len();
        self.created += 1;
        self.index.insert(
            id,
            Entry {
                data,
                created_at: now,
                token,
            },
        );
    }

    /// Remove the entry of `id` for redemption, counting it as retrieved.
    pub fn redeem(&mut self, id: &str) -> Option<Entry> {
        let entry = self.index.remove(id)?;
        let queued = self.order.remove(entry.token);
        strict_assert_eq!(queued.as_deref(), Some(id));
        self.used -= entry.size();
        self.retrieved += 1;
        Some(entry)
    }

    /// Remove every entry older than `ttl` at `now`, oldest first, recording each as recycled.
    ///
    /// Stops at the first entry that has not expired. Returns the expired ids.
    pub fn expire(&mut self, now: Instant, ttl: Duration, tombstones: &Tombstones) -> Vec<String> {
        let mut expired = vec![];
        while let Some(id) = self.order.peek() {
            let is_expired = self
                .index
                .get(id.as_str())
                .map_or(true, |entry| now.saturating_duration_since(entry.created_at) > ttl);
            if !is_expired {
                break;
            }
            let Some(id) = self.pop_oldest() else {
                break;
            };
            tombstones.record(id.clone(), Fate::Recycled, now);
            expired.push(id);
        }
        expired
    }

    /// Bytes held by live entries.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Live entry count.
    pub fn len(&self) -> usize {
        strict_assert_eq!(self.index.len(), self.order.len());
        self.index.len()
    }

    /// Returns `true` if no entry is live.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> Stats {
        Stats {
            used: self.used,
            limit: self.limit,
            created: self.created,
            retrieved: self.retrieved,
        }
    }

    /// Creation times of the live entries in queue order.
    #[cfg(test)]
    pub fn creation_times(&self) -> Vec<Instant> {
        self.order
            .iter()
            .filter_map(|id| self.index.get(id.as_str()).map(|entry| entry.created_at))
            .collect()
    }

    fn pop_oldest(&mut self) -> Option<String> {
        let id = self.order.pop()?;
        let entry = self.index.remove(&id);
        strict_assert!(entry.is_some());
        if let Some(entry) = entry {
            self.used -= entry.size();
        }
        Some(id)
    }
}
