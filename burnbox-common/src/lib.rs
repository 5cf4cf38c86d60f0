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

//! Shared components for burnbox.

/// Allow to enable debug assertions in release profile with feature "strict_assertion".
pub mod assert;
/// The error type shared by all burnbox crates.
pub mod error;
/// Metrics abstraction and provisioned registries.
pub mod metrics;
