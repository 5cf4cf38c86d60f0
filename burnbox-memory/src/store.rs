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

use std::{borrow::Cow, sync::Arc, time::Duration};

use burnbox_common::{
    error::{Error, Result},
    metrics::{model::Metrics, registry::noop::NoopMetricsRegistry, BoxedRegistry},
};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    reaper::{Reaper, ReaperHandle},
    stats::Stats,
    table::EntryTable,
    tombstone::{Fate, Tombstones},
};

/// Default age after which a live entry expires and a tombstone is purged.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);
/// Default period of the reaper.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// What a single reaper sweep removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReapReport {
    /// Live entries expired and recorded as recycled.
    pub expired: usize,
    /// Burned tombstones purged.
    pub purged_burned: usize,
    /// Recycled tombstones purged.
    pub purged_recycled: usize,
}

/// Builder for [`Store`].
#[derive(Debug)]
pub struct StoreBuilder {
    name: Cow<'static, str>,
    max_memory: usize,
    ttl: Duration,
    reap_interval: Duration,
    registry: BoxedRegistry,
}

impl StoreBuilder {
    /// Create a store builder with the memory limit in bytes.
    pub fn new(max_memory: usize) -> Self {
        Self {
            name: "burnbox".into(),
            max_memory,
            ttl: DEFAULT_TTL,
            reap_interval: DEFAULT_REAP_INTERVAL,
            registry: Box::new(NoopMetricsRegistry),
        }
    }

    /// Set the name of the store.
    ///
    /// The name is used as the label of the store metrics.
    ///
    /// Default: `burnbox`.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the age after which live entries expire and tombstones are purged.
    ///
    /// Default: 15 minutes.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the period of the background reaper.
    ///
    /// Default: 60 seconds.
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set the metrics registry.
    ///
    /// Default: [`NoopMetricsRegistry`].
    pub fn with_metrics_registry(mut self, registry: BoxedRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Build the store and spawn its reaper on the current tokio runtime.
    pub fn build(self) -> Result<Store> {
        if self.max_memory == 0 {
            return Err(Error::config("memory limit must be positive"));
        }
        if self.ttl.is_zero() {
            return Err(Error::config("ttl must be positive"));
        }
        if self.reap_interval.is_zero() {
            return Err(Error::config("reap interval must be positive"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::config("the store must be built within a tokio runtime").with_source(e))?;

        let metrics = Metrics::new(self.name.clone(), self.registry.as_ref());
        let inner = Arc::new(StoreInner {
            name: self.name,
            limit: self.max_memory,
            ttl: self.ttl,
            table: Mutex::new(EntryTable::new(self.max_memory)),
            tombstones: Tombstones::default(),
            metrics,
        });

        let (reaper, handle) = Reaper::new(inner.clone(), self.reap_interval);
        runtime.spawn(reaper.run());

        tracing::info!(
            "[store]: {} built, limit: {} bytes, ttl: {:?}",
            inner.name,
            inner.limit,
            inner.ttl
        );

        Ok(Store {
            inner,
            _reaper: Arc::new(handle),
        })
    }
}

#[derive(Debug)]
pub(crate) struct StoreInner {
    name: Cow<'static, str>,
    limit: usize,
    ttl: Duration,

    table: Mutex<EntryTable>,
    tombstones: Tombstones,

    metrics: Metrics,
}

impl StoreInner {
    fn save(&self, id: String, data: Bytes) -> Result<()> {
        let size = data.len();
        if size > self.limit {
            self.metrics.store_too_large.increase(1);
            return Err(Error::too_large(size, self.limit));
        }

        // Read under the lock so creation times follow the insertion order.
        let mut table = self.table.lock();
        let now = Instant::now();

        if table.contains(&id) {
            drop(table);
            self.metrics.store_collision.increase(1);
            return Err(Error::collision(&id, "live"));
        }
        if let Some(fate) = self.tombstones.fate(&id) {
            drop(table);
            self.metrics.store_collision.increase(1);
            return Err(Error::collision(&id, fate.as_str()));
        }

        let evicted = table.make_room(size, now, &self.tombstones);
        table.insert(id, data, now);
        let used = table.used();
        drop(table);

        if !evicted.is_empty() {
            tracing::debug!("[store]: evicted {} entries to fit {} bytes", evicted.len(), size);
            self.metrics.store_evict.increase(evicted.len() as u64);
        }
        self.metrics.store_save.increase(1);
        self.metrics.store_usage.absolute(used as u64);
        tracing::trace!("[store]: saved {} bytes, used: {}", size, used);

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Bytes> {
        // Resolved ids are answered without touching the table lock.
        if let Some(fate) = self.tombstones.fate(id) {
            return Err(self.resolved(id, fate));
        }

        let mut table = self.table.lock();
        let now = Instant::now();

        let Some(entry) = table.redeem(id) else {
            // A concurrent removal may have landed between the check above and the lock.
            let fate = self.tombstones.fate(id);
            drop(table);
            return match fate {
                Some(fate) => Err(self.resolved(id, fate)),
                None => {
                    self.metrics.store_miss.increase(1);
                    Err(Error::not_found(id))
                }
            };
        };

        // Recorded before the lock is released, so no later get can miss both.
        self.tombstones.record(id.to_string(), Fate::Burned, now);
        let used = table.used();
        drop(table);

        self.metrics.store_redeem.increase(1);
        self.metrics.store_usage.absolute(used as u64);
        tracing::trace!("[store]: redeemed {} bytes", entry.size());

        Ok(entry.into_data())
    }

    fn resolved(&self, id: &str, fate: Fate) -> Error {
        match fate {
            Fate::Burned => self.metrics.store_burned.increase(1),
            Fate::Recycled => self.metrics.store_recycled.increase(1),
        }
        fate.error(id)
    }

    pub(crate) fn reap(&self) -> ReapReport {
        let start = std::time::Instant::now();

        let (now, expired, used) = {
            let mut table = self.table.lock();
            let now = Instant::now();
            let expired = table.expire(now, self.ttl, &self.tombstones);
            (now, expired, table.used())
        };

        let report = ReapReport {
            expired: expired.len(),
            purged_burned: self.tombstones.registry(Fate::Burned).purge(now, self.ttl),
            purged_recycled: self.tombstones.registry(Fate::Recycled).purge(now, self.ttl),
        };

        self.metrics.store_expire.increase(report.expired as u64);
        self.metrics
            .store_purge
            .increase((report.purged_burned + report.purged_recycled) as u64);
        self.metrics.store_usage.absolute(used as u64);
        self.metrics.store_reap_duration.record(start.elapsed().as_secs_f64());

        if report != ReapReport::default() {
            tracing::debug!("[reaper]: {:?}", report);
        }

        report
    }
}

/// An in-memory store of one-time secrets.
///
/// A saved secret can be redeemed exactly once. After it leaves the store, by redemption, eviction or expiry, later
/// gets report how it left until the record of its fate expires as well.
///
/// The store is cheap to clone. The background reaper stops when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
    _reaper: Arc<ReaperHandle>,
}

impl Store {
    /// Save `data` under `id`.
    ///
    /// Evicts the oldest entries, recording them as recycled, until `data` fits the memory limit.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::TooLarge`] if `data` alone exceeds the memory limit. Nothing is evicted.
    /// - [`ErrorKind::Collision`] if `id` is live or tombstoned. Nothing is evicted.
    ///
    /// [`ErrorKind::TooLarge`]: burnbox_common::error::ErrorKind::TooLarge
    /// [`ErrorKind::Collision`]: burnbox_common::error::ErrorKind::Collision
    pub fn save(&self, id: impl Into<String>, data: impl Into<Bytes>) -> Result<()> {
        self.inner.save(id.into(), data.into())
    }

    /// Redeem the secret of `id`, removing it from the store.
    ///
    /// Among any number of concurrent gets for one id, exactly one returns the data.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Burned`] if `id` has been redeemed.
    /// - [`ErrorKind::Recycled`] if `id` was evicted or expired before redemption.
    /// - [`ErrorKind::NotFound`] if `id` was never saved or its tombstone has been purged.
    ///
    /// [`ErrorKind::Burned`]: burnbox_common::error::ErrorKind::Burned
    /// [`ErrorKind::Recycled`]: burnbox_common::error::ErrorKind::Recycled
    /// [`ErrorKind::NotFound`]: burnbox_common::error::ErrorKind::NotFound
    pub fn get(&self, id: &str) -> Result<Bytes> {
        self.inner.get(id)
    }

    /// Snapshot of the store counters.
    pub fn stats(&self) -> Stats {
        self.inner.table.lock().stats()
    }

    /// Run one reaper sweep now.
    pub fn reap(&self) -> ReapReport {
        self.inner.reap()
    }

    /// Live entry count.
    pub fn len(&self) -> usize {
        self.inner.table.lock().len()
    }

    /// Returns `true` if no entry is live.
    pub fn is_empty(&self) -> bool {
        self.inner.table.lock().is_empty()
    }

    /// Name of the store.
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}
