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

//! burnbox - one-time secret exchange for Rust.
//!
//! Secrets are sealed with AES-256-GCM under a random access key, saved into an in-memory [`Store`] and burned on
//! first retrieval.
//!
//! ```
//! use burnbox::{Exchange, SecretPayload, StoreBuilder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let exchange = Exchange::new(StoreBuilder::new(64 * 1024 * 1024).build().unwrap());
//!
//! let ticket = exchange.create(&SecretPayload::text("hunter2")).unwrap();
//! let payload = exchange.retrieve(&ticket.id, &ticket.key).unwrap();
//! assert_eq!(payload.text, "hunter2");
//!
//! // Gone after the first read.
//! assert!(exchange.retrieve(&ticket.id, &ticket.key).is_err());
//! # }
//! ```

pub use burnbox_common as common;
pub use burnbox_memory as memory;

pub mod crypto;
mod exchange;
mod payload;
/// Commonly used items, re-exported at the crate root.
pub mod prelude;

pub use prelude::*;
