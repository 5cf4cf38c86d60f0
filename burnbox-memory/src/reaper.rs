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

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    time::{Instant, MissedTickBehavior},
};

use crate::store::StoreInner;

/// Stops the reaper when dropped.
///
/// Shared by every clone of a store, so the reaper exits with the last handle.
#[derive(Debug)]
pub(crate) struct ReaperHandle {
    stop_tx: Option<oneshot::Sender<()>>,
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// The background task that expires old entries and purges old tombstones.
#[derive(Debug)]
pub(crate) struct Reaper {
    inner: Arc<StoreInner>,
    interval: Duration,
    stop_rx: oneshot::Receiver<()>,
}

impl Reaper {
    pub(crate) fn new(inner: Arc<StoreInner>, interval: Duration) -> (Self, ReaperHandle) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let reaper = Self {
            inner,
            interval,
            stop_rx,
        };
        let handle = ReaperHandle { stop_tx: Some(stop_tx) };
        (reaper, handle)
    }

    pub(crate) async fn run(mut self) {
        tracing::info!("[reaper]: start, interval: {:?}", self.interval);

        // The first sweep runs one full period after start.
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                // Resolves on an explicit stop and on a dropped sender alike.
                _ = &mut self.stop_rx => {
                    tracing::info!("[reaper]: exit");
                    return;
                }
                _ = interval.tick() => {
                    self.inner.reap();
                }
            }
        }
    }
}
