// Copyright 2025 Sushanth (https://github.com/sushanthpy)
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

//! Aggregate statistics over a trace collection
//!
//! These are derived values: recomputed on demand, never persisted.

use crate::trace::RiskLevel;
use serde::{Deserialize, Serialize};

/// Count of operations per risk level. Every level is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    #[serde(default)]
    pub critical: u64,
    #[serde(default)]
    pub high: u64,
    #[serde(default)]
    pub medium: u64,
    #[serde(default)]
    pub low: u64,
}

impl RiskDistribution {
    pub fn get(&self, level: RiskLevel) -> u64 {
        match level {
            RiskLevel::Critical => self.critical,
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }

    pub fn increment(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Critical => self.critical += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low
    }

    /// `(level, count)` pairs in display order
    pub fn entries(&self) -> [(RiskLevel, u64); 4] {
        RiskLevel::ALL.map(|level| (level, self.get(level)))
    }
}

/// Usage count for one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCount {
    pub tool: String,
    pub count: u64,
}

/// Hourly operation count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Bucket start, `YYYY-MM-DDTHH:00:00Z`
    pub hour: String,
    pub count: u64,
}

/// Latency figures in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub sum: f64,
    pub count: u64,
    pub min: f64,
    pub max: f64,
}

impl LatencySummary {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Token totals over traces that report them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
}

/// Aggregate view of a trace collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub risk_distribution: RiskDistribution,
    /// Ranked by count, most used first
    pub tool_usage: Vec<ToolCount>,
    /// Newest bucket first
    #[serde(default)]
    pub timeline: Vec<TimelinePoint>,
    pub total_operations: u64,
    /// Full precision; display rounding is up to the caller
    pub total_cost_estimate: f64,
    /// Only available from client-side aggregation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencySummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenTotals>,
}

impl Stats {
    /// The `n` most used tools
    pub fn top_tools(&self, n: usize) -> &[ToolCount] {
        &self.tool_usage[..self.tool_usage.len().min(n)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_distribution_partial_payload() {
        let dist: RiskDistribution = serde_json::from_str(r#"{"high": 2}"#).unwrap();
        assert_eq!(
            dist,
            RiskDistribution {
                critical: 0,
                high: 2,
                medium: 0,
                low: 0
            }
        );
        assert_eq!(dist.total(), 2);
    }

    #[test]
    fn test_risk_distribution_entries_in_display_order() {
        let mut dist = RiskDistribution::default();
        dist.increment(RiskLevel::Low);
        dist.increment(RiskLevel::Critical);
        dist.increment(RiskLevel::Low);

        let entries = dist.entries();
        assert_eq!(entries[0], (RiskLevel::Critical, 1));
        assert_eq!(entries[3], (RiskLevel::Low, 2));
    }

    #[test]
    fn test_latency_summary() {
        let mut summary = LatencySummary::default();
        assert_eq!(summary.avg(), 0.0);

        summary.record(120.0);
        summary.record(80.0);
        summary.record(340.0);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 80.0);
        assert_eq!(summary.max, 340.0);
        assert!((summary.avg() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_tools_clamps() {
        let stats = Stats {
            tool_usage: vec![
                ToolCount {
                    tool: "sniff_get".into(),
                    count: 3,
                },
                ToolCount {
                    tool: "sniff_apply".into(),
                    count: 1,
                },
            ],
            ..Default::default()
        };
        assert_eq!(stats.top_tools(5).len(), 2);
        assert_eq!(stats.top_tools(1)[0].tool, "sniff_get");
    }
}
