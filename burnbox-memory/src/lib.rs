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

//! An in-memory store of one-time secrets.
//!
//! Each secret is saved once and redeemed at most once. The store is bounded by a memory limit, evicting the oldest
//! secrets first, and by a TTL enforced by a background reaper. Secrets that leave the store leave a tombstone behind,
//! so later gets can tell a burned secret from a recycled one until the tombstone expires too.

mod queue;
mod reaper;
mod stats;
mod store;
mod table;
mod tombstone;

/// Commonly used items, re-exported at the crate root.
pub mod prelude;
pub use prelude::*;
