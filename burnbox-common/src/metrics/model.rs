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

use std::borrow::Cow;

use super::{BoxedCounter, BoxedGauge, BoxedHistogram, RegistryOps};

/// Metrics of a secret store.
#[derive(Debug)]
pub struct Metrics {
    /// Successful saves.
    pub store_save: BoxedCounter,
    /// Saves rejected because the payload exceeds the memory limit.
    pub store_too_large: BoxedCounter,
    /// Saves rejected because the id is live or tombstoned.
    pub store_collision: BoxedCounter,

    /// Successful redemptions.
    pub store_redeem: BoxedCounter,
    /// Gets for ids with no trace in the store.
    pub store_miss: BoxedCounter,
    /// Gets answered by a burned tombstone.
    pub store_burned: BoxedCounter,
    /// Gets answered by a recycled tombstone.
    pub store_recycled: BoxedCounter,

    /// Entries evicted to make room for a save.
    pub store_evict: BoxedCounter,
    /// Entries expired by the reaper.
    pub store_expire: BoxedCounter,
    /// Tombstones purged by the reaper.
    pub store_purge: BoxedCounter,

    /// Bytes held by live entries.
    pub store_usage: BoxedGauge,

    /// Duration of a reaper sweep, in seconds.
    pub store_reap_duration: BoxedHistogram,
}

impl Metrics {
    /// Create a new metric with the given name.
    pub fn new(name: impl Into<Cow<'static, str>>, registry: &dyn RegistryOps) -> Self {
        let name = name.into();

        let burnbox_store_op_total = registry.register_counter_vec(
            "burnbox_store_op_total".into(),
            "burnbox secret store operations".into(),
            &["name", "op"],
        );
        let burnbox_store_usage = registry.register_gauge_vec(
            "burnbox_store_usage".into(),
            "burnbox secret store memory usage in bytes".into(),
            &["name"],
        );
        let burnbox_store_reap_duration = registry.register_histogram_vec(
            "burnbox_store_reap_duration".into(),
            "burnbox secret store reaper sweep durations".into(),
            &["name"],
        );

        let op = |op: &'static str| burnbox_store_op_total.counter(&[name.clone(), op.into()]);

        Self {
            store_save: op("save"),
            store_too_large: op("too_large"),
            store_collision: op("collision"),
            store_redeem: op("redeem"),
            store_miss: op("miss"),
            store_burned: op("burned"),
            store_recycled: op("recycled"),
            store_evict: op("evict"),
            store_expire: op("expire"),
            store_purge: op("purge"),
            store_usage: burnbox_store_usage.gauge(&[name.clone()]),
            store_reap_duration: burnbox_store_reap_duration.histogram(&[name.clone()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::registry::noop::NoopMetricsRegistry;

    #[test]
    fn test_metrics_noop() {
        let metrics = Metrics::new("test", &NoopMetricsRegistry);
        metrics.store_save.increase(1);
        metrics.store_usage.absolute(42);
        metrics.store_reap_duration.record(0.001);
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_metrics_prometheus() {
        use prometheus::{Encoder, Registry, TextEncoder};

        use crate::metrics::registry::prometheus::PrometheusMetricsRegistry;

        let p8s = PrometheusMetricsRegistry::new(Registry::new());
        let m1 = Metrics::new("alpha", &p8s);
        let m2 = Metrics::new("beta", &p8s);
        m1.store_save.increase(3);
        m2.store_evict.increase(1);
        m2.store_usage.absolute(13);

        let mut buf = vec![];
        TextEncoder::new().encode(&p8s.registry().gather(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains(r#"burnbox_store_op_total{name="alpha",op="save"} 3"#));
        assert!(text.contains(r#"burnbox_store_op_total{name="beta",op="evict"} 1"#));
        assert!(text.contains(r#"burnbox_store_usage{name="beta"} 13"#));
    }
}
