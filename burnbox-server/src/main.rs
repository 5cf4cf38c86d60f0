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

//! burnbox http server.

mod server;
mod service;

use std::{net::SocketAddr, time::Duration};

use burnbox::{Exchange, PrometheusMetricsRegistry, StoreBuilder};
use bytesize::ByteSize;
use clap::Parser;
use prometheus::Registry;

use crate::{server::Server, service::BurnboxService};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Memory budget for stored secrets.
    #[arg(long, default_value = "2GiB")]
    memory: ByteSize,

    /// Age after which unclaimed secrets expire and tombstones are forgotten.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "15m")]
    ttl: Duration,

    /// Period of the expiry sweep.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "60s")]
    reap_interval: Duration,

    /// Largest accepted request body.
    #[arg(long, default_value = "110MiB")]
    max_body_size: ByteSize,

    /// Time allowed for a client to send request headers.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    read_timeout: Duration,

    /// Time allowed to read a request body and produce the response.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    write_timeout: Duration,

    /// Expose prometheus metrics on `/metrics`.
    #[arg(long, default_value_t = false)]
    metrics: bool,
}

fn init_logger() {
    use tracing_subscriber::{prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_line_number(true))
        .with(EnvFilter::from_default_env())
        .init();
}

async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[server]: listen for shutdown signal error: {e}");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    #[cfg(feature = "deadlock")]
    {
        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_secs(1));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if deadlocks.is_empty() {
                continue;
            }

            println!("{} deadlocks detected", deadlocks.len());
            for (i, threads) in deadlocks.iter().enumerate() {
                println!("Deadlock #{}", i);
                for t in threads {
                    println!("Thread Id {:#?}", t.thread_id());
                    println!("{:#?}", t.backtrace());
                }
            }
            panic!()
        });
    }

    let args = Args::parse();
    tracing::info!("[server]: {:?}", args);

    let registry = args.metrics.then(Registry::new);

    let mut builder = StoreBuilder::new(args.memory.as_u64().try_into()?)
        .with_ttl(args.ttl)
        .with_reap_interval(args.reap_interval);
    if let Some(registry) = registry.clone() {
        builder = builder.with_metrics_registry(Box::new(PrometheusMetricsRegistry::new(registry)));
    }
    let exchange = Exchange::new(builder.build()?);

    let service = BurnboxService::new(exchange, args.max_body_size.as_u64().try_into()?, registry)
        .with_write_timeout(args.write_timeout);
    let server = Server::bind(args.listen, service, args.read_timeout).await?;
    tracing::info!("[server]: listening on {}", server.local_addr()?);

    server.run(shutdown()).await;
    Ok(())
}
