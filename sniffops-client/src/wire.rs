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


//! Response bodies of the dashboard REST API
//!
//! The API serializes empty collections as `null` and keys its count maps
//! by name, so these shapes are decoded first and then converted into the
//! core types.

use serde::Deserialize;
use sniffops_core::{normalize_epoch_millis, RiskDistribution, Stats, TimelinePoint, ToolCount, Trace};
use sniffops_query::TracePage;
use std::collections::BTreeMap;

/// `GET /api/traces`
#[derive(Debug, Deserialize)]
pub(crate) struct TraceList {
    #[serde(default)]
    pub traces: Option<Vec<Trace>>,
    #[serde(default)]
    pub total: u64,
}

impl From<TraceList> for TracePage {
    fn from(list: TraceList) -> Self {
        TracePage {
            traces: list
                .traces
                .unwrap_or_default()
                .into_iter()
                .map(normalize_trace)
                .collect(),
            total: list.total,
        }
    }
}

/// `GET /api/stats`
#[derive(Debug, Deserialize)]
pub(crate) struct StatsBody {
    #[serde(default)]
    pub risk_distribution: Option<RiskDistribution>,
    #[serde(default)]
    pub tool_usage: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub timeline: Option<Vec<TimelinePoint>>,
    #[serde(default)]
    pub total_operations: u64,
    #[serde(default)]
    pub total_cost_estimate: f64,
}

impl From<StatsBody> for Stats {
    fn from(body: StatsBody) -> Self {
        let mut tool_usage: Vec<ToolCount> = body
            .tool_usage
            .unwrap_or_default()
            .into_iter()
            .map(|(tool, count)| ToolCount { tool, count })
            .collect();
        // stable, so equal counts stay in name order
        tool_usage.sort_by(|a, b| b.count.cmp(&a.count));

        Stats {
            risk_distribution: body.risk_distribution.unwrap_or_default(),
            tool_usage,
            timeline: body.timeline.unwrap_or_default(),
            total_operations: body.total_operations,
            total_cost_estimate: body.total_cost_estimate,
            latency: None,
            tokens: None,
        }
    }
}

/// `{"error": "..."}` bodies on non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Human-readable message from an error response body
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    }
}

pub(crate) fn normalize_trace(mut trace: Trace) -> Trace {
    trace.timestamp = normalize_epoch_millis(trace.timestamp);
    trace
}
