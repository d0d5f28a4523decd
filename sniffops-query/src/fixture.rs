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

//! Deterministic in-memory trace store
//!
//! Behaves like the live store (newest first, `total` independent of the
//! window, distinct sorted filter values) with a fixed clock so stats
//! periods are reproducible.

use crate::aggregation::compute_stats;
use crate::query::TraceQuery;
use crate::store::{StatsPeriod, TracePage, TraceStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use sniffops_core::{Result, RiskLevel, SniffopsError, Stats, Trace, TraceResult};
use std::collections::BTreeSet;

const MINUTE_MS: i64 = 60 * 1000;

/// In-memory [`TraceStore`]
pub struct FixtureTraceStore {
    traces: RwLock<Vec<Trace>>,
    now_ms: i64,
}

impl FixtureTraceStore {
    /// Store over `traces`, with `now_ms` as the reference clock for stats
    pub fn new(traces: Vec<Trace>, now_ms: i64) -> Self {
        Self {
            traces: RwLock::new(traces),
            now_ms,
        }
    }

    /// The standard demo data set, timestamped relative to `now_ms`
    pub fn sample(now_ms: i64) -> Self {
        Self::new(sample_traces(now_ms), now_ms)
    }

    pub fn insert(&self, trace: Trace) {
        self.traces.write().push(trace);
    }

    pub fn len(&self) -> usize {
        self.traces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.read().is_empty()
    }

    fn distinct(&self, field: impl Fn(&Trace) -> &str) -> Vec<String> {
        let traces = self.traces.read();
        let values: BTreeSet<&str> = traces
            .iter()
            .map(field)
            .filter(|v| !v.is_empty())
            .collect();
        values.into_iter().map(str::to_string).collect()
    }
}

#[async_trait]
impl TraceStore for FixtureTraceStore {
    async fn list_traces(&self, query: &TraceQuery) -> Result<TracePage> {
        let traces = self.traces.read();
        let mut matching: Vec<&Trace> = traces.iter().filter(|t| query.matches(t)).collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let traces = matching
            .into_iter()
            .skip(offset)
            .take(query.limit.get() as usize)
            .cloned()
            .collect();

        Ok(TracePage { traces, total })
    }

    async fn get_trace(&self, id: &str) -> Result<Trace> {
        self.traces
            .read()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| SniffopsError::NotFound(id.to_string()))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        Ok(self.distinct(|t| t.namespace.as_str()))
    }

    async fn list_tools(&self) -> Result<Vec<String>> {
        Ok(self.distinct(|t| t.tool_name.as_str()))
    }

    async fn get_stats(&self, period: StatsPeriod) -> Result<Stats> {
        let start = period.start_ms(self.now_ms);
        let traces = self.traces.read();
        let in_period: Vec<Trace> = traces
            .iter()
            .filter(|t| start.map_or(true, |s| t.timestamp >= s))
            .cloned()
            .collect();
        Ok(compute_stats(&in_period))
    }
}

#[allow(clippy::too_many_arguments)]
fn sample(
    id: &str,
    session_id: &str,
    minutes_ago: i64,
    tool_name: &str,
    command: &str,
    namespace: &str,
    resource_kind: &str,
    target_resource: &str,
    risk_level: RiskLevel,
    risk_reason: &str,
    now_ms: i64,
) -> Trace {
    let mut trace = Trace::new(id, tool_name, risk_level, now_ms - minutes_ago * MINUTE_MS);
    trace.session_id = session_id.to_string();
    trace.command = command.to_string();
    trace.namespace = namespace.to_string();
    trace.resource_kind = resource_kind.to_string();
    trace.target_resource = target_resource.to_string();
    trace.risk_reason = Some(risk_reason.to_string());
    trace
}

fn with_metrics(
    mut trace: Trace,
    latency_ms: u64,
    tokens: (u64, u64),
    cost_estimate: f64,
) -> Trace {
    trace.latency_ms = latency_ms;
    trace.tokens_input = Some(tokens.0);
    trace.tokens_output = Some(tokens.1);
    trace.cost_estimate = Some(cost_estimate);
    trace
}

/// Seven representative operations across five namespaces
pub fn sample_traces(now_ms: i64) -> Vec<Trace> {
    let mut failed_apply = with_metrics(
        sample(
            "trace-005",
            "session-def",
            60,
            "sniff_apply",
            "kubectl apply -f service.yaml -n staging",
            "staging",
            "service",
            "api-service",
            RiskLevel::Medium,
            "Service configuration change",
            now_ms,
        ),
        150,
        (110, 40),
        0.001,
    );
    failed_apply.result = TraceResult::Error;
    failed_apply.error_message = Some("Invalid service specification".to_string());

    let mut get_pods = with_metrics(
        sample(
            "trace-003",
            "session-xyz",
            30,
            "sniff_get",
            "kubectl get pods -n development",
            "development",
            "pod",
            "app-pods",
            RiskLevel::Low,
            "Read-only operation in dev namespace",
            now_ms,
        ),
        89,
        (75, 200),
        0.0015,
    );
    get_pods.output = Some(
        r#"{"kind":"PodList","items":[{"name":"app-7f9c","phase":"Running"}],"metadata":{"resourceVersion":"48213"}}"#
            .to_string(),
    );

    vec![
        with_metrics(
            sample(
                "trace-001",
                "session-abc",
                5,
                "sniff_apply",
                "kubectl apply -f deployment.yaml -n production",
                "production",
                "deployment",
                "nginx-deployment",
                RiskLevel::Medium,
                "Production namespace modification",
                now_ms,
            ),
            245,
            (120, 50),
            0.0012,
        ),
        with_metrics(
            sample(
                "trace-002",
                "session-abc",
                15,
                "sniff_delete",
                "kubectl delete pod critical-pod -n kube-system",
                "kube-system",
                "pod",
                "critical-pod",
                RiskLevel::Critical,
                "Critical namespace deletion",
                now_ms,
            ),
            120,
            (95, 30),
            0.0008,
        ),
        get_pods,
        with_metrics(
            sample(
                "trace-004",
                "session-xyz",
                45,
                "sniff_logs",
                "kubectl logs nginx-7d9c8f -n production --tail=100",
                "production",
                "pod",
                "nginx-7d9c8f",
                RiskLevel::Low,
                "Read-only log access",
                now_ms,
            ),
            340,
            (85, 450),
            0.0028,
        ),
        failed_apply,
        with_metrics(
            sample(
                "trace-006",
                "session-ghi",
                90,
                "sniff_get",
                "kubectl get nodes",
                "default",
                "node",
                "cluster-nodes",
                RiskLevel::Low,
                "Cluster-level read operation",
                now_ms,
            ),
            67,
            (60, 180),
            0.0013,
        ),
        with_metrics(
            sample(
                "trace-007",
                "session-ghi",
                120,
                "sniff_apply",
                "kubectl apply -f configmap.yaml -n production",
                "production",
                "configmap",
                "app-config",
                RiskLevel::High,
                "Production configuration change",
                now_ms,
            ),
            198,
            (130, 45),
            0.0011,
        ),
    ]
}
