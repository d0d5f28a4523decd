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

//! Client-side aggregation over a trace collection
//!
//! Pure and synchronous. Used by the fixture store to answer stats requests
//! and by the controller as a fallback when the store cannot.

use sniffops_core::{
    format_timestamp, LatencySummary, RiskDistribution, Stats, TimelinePoint, TokenTotals,
    ToolCount, Trace,
};
use std::collections::HashMap;

/// Hourly buckets reported in [`Stats::timeline`]
pub const TIMELINE_BUCKETS: usize = 24;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Exact count per risk level; levels with no traces report 0
pub fn risk_distribution(traces: &[Trace]) -> RiskDistribution {
    let mut distribution = RiskDistribution::default();
    for trace in traces {
        distribution.increment(trace.risk_level);
    }
    distribution
}

/// Tools ranked by usage, most used first, at most `top_n` entries.
///
/// Ties keep the order in which tools first appear in `traces`.
pub fn tool_usage_ranked(traces: &[Trace], top_n: usize) -> Vec<ToolCount> {
    let mut ranked: Vec<ToolCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for trace in traces {
        match positions.get(trace.tool_name.as_str()) {
            Some(&idx) => ranked[idx].count += 1,
            None => {
                positions.insert(trace.tool_name.as_str(), ranked.len());
                ranked.push(ToolCount {
                    tool: trace.tool_name.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}

/// Sum of the cost estimates that are present, at full precision
pub fn total_cost(traces: &[Trace]) -> f64 {
    traces.iter().filter_map(|t| t.cost_estimate).sum()
}

pub fn total_operations(traces: &[Trace]) -> u64 {
    traces.len() as u64
}

/// Latency over all traces
pub fn latency_summary(traces: &[Trace]) -> LatencySummary {
    let mut summary = LatencySummary::default();
    for trace in traces {
        summary.record(trace.latency_ms as f64);
    }
    summary
}

/// Token totals; traces without token counts contribute nothing
pub fn token_totals(traces: &[Trace]) -> TokenTotals {
    traces.iter().fold(TokenTotals::default(), |mut acc, t| {
        acc.input += t.tokens_input.unwrap_or(0);
        acc.output += t.tokens_output.unwrap_or(0);
        acc
    })
}

/// Operation counts per UTC hour, newest first, at most `max_buckets`
pub fn hourly_timeline(traces: &[Trace], max_buckets: usize) -> Vec<TimelinePoint> {
    let mut buckets: HashMap<i64, u64> = HashMap::new();
    for trace in traces {
        let hour = trace.timestamp.div_euclid(HOUR_MS) * HOUR_MS;
        *buckets.entry(hour).or_insert(0) += 1;
    }

    let mut hours: Vec<(i64, u64)> = buckets.into_iter().collect();
    hours.sort_by(|a, b| b.0.cmp(&a.0));
    hours
        .into_iter()
        .take(max_buckets)
        .map(|(hour, count)| TimelinePoint {
            hour: format_timestamp(hour, "%Y-%m-%dT%H:00:00Z"),
            count,
        })
        .collect()
}

/// Full statistics for a collection
pub fn compute_stats(traces: &[Trace]) -> Stats {
    Stats {
        risk_distribution: risk_distribution(traces),
        tool_usage: tool_usage_ranked(traces, usize::MAX),
        timeline: hourly_timeline(traces, TIMELINE_BUCKETS),
        total_operations: total_operations(traces),
        total_cost_estimate: total_cost(traces),
        latency: Some(latency_summary(traces)),
        tokens: Some(token_totals(traces)),
    }
}
