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

use burnbox_common::error::Error;
use dashmap::DashMap;
use tokio::time::Instant;

/// How a secret left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fate {
    /// Redeemed by a get.
    Burned,
    /// Removed before redemption, by eviction or expiry.
    Recycled,
}

impl Fate {
    /// The error a get for a tombstoned id returns.
    pub fn error(self, id: &str) -> Error {
        match self {
            Fate::Burned => Error::burned(id),
            Fate::Recycled => Error::recycled(id),
        }
    }

    /// Lowercase name, used in logs and error context.
    pub fn as_str(self) -> &'static str {
        match self {
            Fate::Burned => "burned",
            Fate::Recycled => "recycled",
        }
    }
}

/// A concurrent id → recorded-at map for one kind of tombstone.
///
/// Synchronized independently of the entry table, so repeated reads of resolved ids never contend on the table lock.
#[derive(Debug, Default)]
pub struct TombstoneRegistry {
    marks: DashMap<String, Instant>,
}

impl TombstoneRegistry {
    /// Record `id` at `at`.
    pub fn record(&self, id: String, at: Instant) {
        self.marks.insert(id, at);
    }

    /// Returns `true` if `id` has a tombstone in this registry.
    pub fn contains(&self, id: &str) -> bool {
        self.marks.contains_key(id)
    }

    /// Drop every tombstone older than `ttl` at `now`. Returns the count dropped.
    pub fn purge(&self, now: Instant, ttl: Duration) -> usize {
        let before = self.marks.len();
        self.marks.retain(|_, at| now.saturating_duration_since(*at) <= ttl);
        before.saturating_sub(self.marks.len())
    }
}

/// The burned and recycled registries.
#[derive(Debug, Default)]
pub struct Tombstones {
    burned: TombstoneRegistry,
    recycled: TombstoneRegistry,
}

impl Tombstones {
    /// The fate recorded for `id`, burned first.
    pub fn fate(&self, id: &str) -> Option<Fate> {
        if self.burned.contains(id) {
            Some(Fate::Burned)
        } else if self.recycled.contains(id) {
            Some(Fate::Recycled)
        } else {
            None
        }
    }

    /// Record the fate of `id`.
    pub fn record(&self, id: String, fate: Fate, at: Instant) {
        self.registry(fate).record(id, at);
    }

    /// The registry of one fate.
    pub fn registry(&self, fate: Fate) -> &TombstoneRegistry {
        match fate {
            Fate::Burned => &self.burned,
            Fate::Recycled => &self.recycled,
        }
    }
}

#[cfg(test)]
mod tests {
    use burnbox_common::error::ErrorKind;

    use super::*;

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_purge_by_age() {
        let ttl = Duration::from_secs(60);
        let registry = TombstoneRegistry::default();

        registry.record("old".to_string(), Instant::now());
        tokio::time::advance(Duration::from_secs(30)).await;
        registry.record("young".to_string(), Instant::now());

        // Exactly at the ttl nothing is old enough.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(registry.purge(Instant::now(), ttl), 0);
        assert!(registry.contains("old"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(registry.purge(Instant::now(), ttl), 1);
        assert!(!registry.contains("old"));
        assert!(registry.contains("young"));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(registry.purge(Instant::now(), ttl), 1);
        assert!(!registry.contains("young"));
    }

    #[test]
    fn test_fate() {
        let tombstones = Tombstones::default();
        let now = Instant::now();

        assert_eq!(tombstones.fate("a"), None);

        tombstones.record("a".to_string(), Fate::Burned, now);
        tombstones.record("b".to_string(), Fate::Recycled, now);
        assert_eq!(tombstones.fate("a"), Some(Fate::Burned));
        assert_eq!(tombstones.fate("b"), Some(Fate::Recycled));
        assert!(!tombstones.registry(Fate::Burned).contains("b"));
        assert!(!tombstones.registry(Fate::Recycled).contains("a"));

        assert_eq!(Fate::Burned.error("a").kind(), ErrorKind::Burned);
        assert_eq!(Fate::Recycled.error("b").kind(), ErrorKind::Recycled);
    }
}
