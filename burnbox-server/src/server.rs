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

use std::{net::SocketAddr, time::Duration};

use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;

use crate::service::BurnboxService;

/// Accepts connections and serves each on its own task.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    service: BurnboxService,
    read_timeout: Duration,
}

impl Server {
    pub async fn bind(addr: SocketAddr, service: BurnboxService, read_timeout: Duration) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            service,
            read_timeout,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("[server]: exit");
                    return;
                }
                res = self.listener.accept() => match res {
                    Ok(res) => res,
                    Err(e) => {
                        tracing::error!("[server]: accept connection error: {e}");
                        continue;
                    }
                },
            };

            let io = TokioIo::new(stream);
            let service = self.service.clone();
            let read_timeout = self.read_timeout;

            tokio::spawn(async move {
                let res = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .header_read_timeout(read_timeout)
                    .serve_connection(io, service)
                    .await;
                if let Err(e) = res {
                    tracing::error!("[server]: serve connection {peer} error: {e}");
                }
            });
        }
    }
}
