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

use burnbox::{ErrorKind, Exchange, SecretPayload, StoreBuilder};
use itertools::Itertools;

const KB: usize = 1024;

const READERS: usize = 50;

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 8))]
async fn test_concurrent_retrieve_exactly_once() {
    let exchange = Exchange::new(StoreBuilder::new(64 * KB).build().unwrap());

    for round in 0..10 {
        let ticket = exchange.create(&SecretPayload::text(format!("round {round}"))).unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(READERS));
        let handles = (0..READERS)
            .map(|_| {
                let exchange = exchange.clone();
                let ticket = ticket.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    exchange.retrieve(&ticket.id, &ticket.key)
                })
            })
            .collect_vec();

        let mut opened = vec![];
        for handle in handles {
            match handle.await.unwrap() {
                Ok(payload) => opened.push(payload),
                Err(e) => assert_eq!(e.kind(), ErrorKind::Burned),
            }
        }
        assert_eq!(opened, vec![SecretPayload::text(format!("round {round}"))]);
    }

    assert_eq!(exchange.stats().retrieved, 10);
}

#[test_log::test(tokio::test)]
async fn test_memory_pressure_recycles_oldest() {
    let exchange = Exchange::new(StoreBuilder::new(16 * KB).build().unwrap());

    let tickets = (0..8)
        .map(|i| {
            exchange
                .create(&SecretPayload::file(format!("{i}.bin"), "application/octet-stream", vec![i as u8; 3 * KB]))
                .unwrap()
        })
        .collect_vec();

    let stats = exchange.stats();
    assert!(stats.used <= stats.limit);
    assert_eq!(stats.created, 8);

    let outcomes = tickets
        .iter()
        .map(|t| exchange.retrieve(&t.id, &t.key).map_err(|e| e.kind()))
        .collect_vec();

    // Recycled secrets form a prefix in creation order, followed by the survivors.
    let recycled = outcomes
        .iter()
        .take_while(|o| matches!(o, Err(ErrorKind::Recycled)))
        .count();
    assert!(recycled > 0);
    for (i, outcome) in outcomes.iter().enumerate().skip(recycled) {
        let payload = outcome.as_ref().unwrap();
        assert_eq!(payload.filename, format!("{i}.bin"));
        assert_eq!(payload.file_data, vec![i as u8; 3 * KB]);
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_unclaimed_secret_expires() {
    let exchange = Exchange::new(
        StoreBuilder::new(64 * KB)
            .with_ttl(Duration::from_secs(15 * 60))
            .with_reap_interval(Duration::from_secs(60))
            .build()
            .unwrap(),
    );
    let unclaimed = exchange.create(&SecretPayload::text("unclaimed")).unwrap();

    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    let claimed = exchange.create(&SecretPayload::text("claimed")).unwrap();
    exchange.retrieve(&claimed.id, &claimed.key).unwrap();

    // The sweep at 16 minutes expires the unclaimed secret. The burned one was claimed 7 minutes ago.
    tokio::time::sleep(Duration::from_secs(7 * 60)).await;
    assert!(exchange.store().is_empty());
    assert_eq!(
        exchange.retrieve(&unclaimed.id, &unclaimed.key).unwrap_err().kind(),
        ErrorKind::Recycled
    );
    assert_eq!(
        exchange.retrieve(&claimed.id, &claimed.key).unwrap_err().kind(),
        ErrorKind::Burned
    );

    // By 33 minutes both tombstones have outlived the ttl.
    tokio::time::sleep(Duration::from_secs(16 * 60)).await;
    for ticket in [&claimed, &unclaimed] {
        assert_eq!(
            exchange.retrieve(&ticket.id, &ticket.key).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}

#[cfg(feature = "prometheus")]
#[test_log::test(tokio::test)]
async fn test_prometheus_metrics() {
    use burnbox::PrometheusMetricsRegistry;
    use prometheus::{Encoder, Registry, TextEncoder};

    let registry = Registry::new();
    let exchange = Exchange::new(
        StoreBuilder::new(64 * KB)
            .with_name("it")
            .with_metrics_registry(Box::new(PrometheusMetricsRegistry::new(registry.clone())))
            .build()
            .unwrap(),
    );
    let ticket = exchange.create(&SecretPayload::text("observed")).unwrap();
    exchange.retrieve(&ticket.id, &ticket.key).unwrap();
    let _ = exchange.retrieve(&ticket.id, &ticket.key);

    let mut buf = vec![];
    TextEncoder::new().encode(&registry.gather(), &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains(r#"burnbox_store_op_total{name="it",op="save"} 1"#));
    assert!(text.contains(r#"burnbox_store_op_total{name="it",op="redeem"} 1"#));
    assert!(text.contains(r#"burnbox_store_op_total{name="it",op="burned"} 1"#));
}
