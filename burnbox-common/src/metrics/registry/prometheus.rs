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

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use itertools::Itertools;
use parking_lot::Mutex;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry,
    Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Registry,
};

use crate::metrics::{
    BoxedCounter, BoxedCounterVec, BoxedGauge, BoxedGaugeVec, BoxedHistogram, BoxedHistogramVec, Boxer, CounterOps,
    CounterVecOps, GaugeOps, GaugeVecOps, HistogramOps, HistogramVecOps, RegistryOps,
};

#[derive(Debug, Clone)]
enum MetricVec {
    Counter(IntCounterVec),
    Gauge(IntGaugeVec),
    Histogram(HistogramVec),
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct Metadata {
    name: Cow<'static, str>,
    desc: Cow<'static, str>,
    label_names: &'static [&'static str],
}

impl CounterOps for IntCounter {
    fn increase(&self, val: u64) {
        self.inc_by(val);
    }
}

impl CounterVecOps for IntCounterVec {
    fn counter(&self, labels: &[Cow<'static, str>]) -> BoxedCounter {
        let labels = labels.iter().map(Cow::as_ref).collect_vec();
        self.with_label_values(&labels).boxed()
    }
}

impl GaugeOps for IntGauge {
    fn increase(&self, val: u64) {
        self.add(val as _);
    }

    fn decrease(&self, val: u64) {
        self.sub(val as _);
    }

    fn absolute(&self, val: u64) {
        self.set(val as _);
    }
}

impl GaugeVecOps for IntGaugeVec {
    fn gauge(&self, labels: &[Cow<'static, str>]) -> BoxedGauge {
        let labels = labels.iter().map(Cow::as_ref).collect_vec();
        self.with_label_values(&labels).boxed()
    }
}

impl HistogramOps for Histogram {
    fn record(&self, val: f64) {
        self.observe(val);
    }
}

impl HistogramVecOps for HistogramVec {
    fn histogram(&self, labels: &[Cow<'static, str>]) -> BoxedHistogram {
        let labels = labels.iter().map(Cow::as_ref).collect_vec();
        self.with_label_values(&labels).boxed()
    }
}

/// Prometheus metric registry with lib `prometheus`.
///
/// Clones share the set of registered vectors, so several stores may use the same registry without registering a
/// vector twice.
#[derive(Debug, Clone)]
pub struct PrometheusMetricsRegistry {
    registry: Registry,
    vecs: Arc<Mutex<HashMap<Metadata, MetricVec>>>,
}

impl PrometheusMetricsRegistry {
    /// Create an Prometheus metrics registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            vecs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The underlying registry, for gathering.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn get_or_register(&self, metadata: Metadata, register: impl FnOnce(&Metadata, &Registry) -> MetricVec) -> MetricVec {
        self.vecs
            .lock()
            .entry(metadata.clone())
            .or_insert_with(|| register(&metadata, &self.registry))
            .clone()
    }
}

impl RegistryOps for PrometheusMetricsRegistry {
    fn register_counter_vec(
        &self,
        name: Cow<'static, str>,
        desc: Cow<'static, str>,
        label_names: &'static [&'static str],
    ) -> BoxedCounterVec {
        let metadata = Metadata {
            name,
            desc,
            label_names,
        };
        match self.get_or_register(metadata, |m, registry| {
            MetricVec::Counter(
                register_int_counter_vec_with_registry! {
                    m.name.as_ref(), m.desc.as_ref(), m.label_names, registry
                }
                .expect("counter vector metadata must be valid and unique"),
            )
        }) {
            MetricVec::Counter(v) => v.boxed(),
            _ => unreachable!(),
        }
    }

    fn register_gauge_vec(
        &self,
        name: Cow<'static, str>,
        desc: Cow<'static, str>,
        label_names: &'static [&'static str],
    ) -> BoxedGaugeVec {
        let metadata = Metadata {
            name,
            desc,
            label_names,
        };
        match self.get_or_register(metadata, |m, registry| {
            MetricVec::Gauge(
                register_int_gauge_vec_with_registry! {
                    m.name.as_ref(), m.desc.as_ref(), m.label_names, registry
                }
                .expect("gauge vector metadata must be valid and unique"),
            )
        }) {
            MetricVec::Gauge(v) => v.boxed(),
            _ => unreachable!(),
        }
    }

    fn register_histogram_vec(
        &self,
        name: Cow<'static, str>,
        desc: Cow<'static, str>,
        label_names: &'static [&'static str],
    ) -> BoxedHistogramVec {
        let metadata = Metadata {
            name,
            desc,
            label_names,
        };
        match self.get_or_register(metadata, |m, registry| {
            MetricVec::Histogram(
                register_histogram_vec_with_registry! {
                    m.name.as_ref(), m.desc.as_ref(), m.label_names, registry
                }
                .expect("histogram vector metadata must be valid and unique"),
            )
        }) {
            MetricVec::Histogram(v) => v.boxed(),
            _ => unreachable!(),
        }
    }
}
