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

use serde::Serialize;

/// A point-in-time snapshot of store counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Stats {
    /// Bytes held by live entries.
    pub used: usize,
    /// The memory limit in bytes.
    pub limit: usize,
    /// Successful saves since the store was built.
    pub created: u64,
    /// Successful redemptions since the store was built.
    pub retrieved: u64,
}

impl Stats {
    /// Usage as a percentage of the limit, in `[0, 100]`.
    pub fn percent_used(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        self.used as f64 / self.limit as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_used() {
        let stats = Stats {
            used: 512,
            limit: 2048,
            ..Default::default()
        };
        assert_eq!(stats.percent_used(), 25.0);
        assert_eq!(Stats::default().percent_used(), 0.0);
    }
}
