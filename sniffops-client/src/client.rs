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


//! HTTP trace store
//!
//! Talks to the dashboard REST API served next to the trace database.
//! Every failure to get a usable answer (transport error, non-success
//! status, undecodable body) becomes `StoreUnavailable`; only a 404 on a
//! single-trace lookup is reported as `NotFound`.

use crate::wire::{error_message, normalize_trace, StatsBody, TraceList};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use sniffops_core::{Result, SniffopsError, Stats, Trace};
use sniffops_query::{StatsPeriod, TracePage, TraceQuery, TraceStore};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default address of the dashboard API
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9090";

/// HTTP store configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the dashboard API
    pub base_url: String,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// [`TraceStore`] backed by the dashboard REST API
#[derive(Debug, Clone)]
pub struct HttpTraceStore {
    base: Url,
    http: HttpClient,
}

impl HttpTraceStore {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            SniffopsError::StoreUnavailable(format!("invalid base url {}: {}", config.base_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(SniffopsError::StoreUnavailable(format!(
                "invalid base url {}",
                config.base_url
            )));
        }

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SniffopsError::StoreUnavailable(format!("http client: {}", e)))?;

        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // checked in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, segments: &[&str], params: &[(&str, String)]) -> Result<Response> {
        let url = self.endpoint(segments);
        debug!(%url, ?params, "GET");

        self.http
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "request failed");
                SniffopsError::StoreUnavailable(format!("request to {} failed: {}", url.path(), e))
            })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let path = response.url().path().to_string();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!(path = %path, status = status.as_u16(), message = %message, "api error");
            return Err(SniffopsError::StoreUnavailable(format!(
                "{} returned {}: {}",
                path,
                status.as_u16(),
                message
            )));
        }

        response.json::<T>().await.map_err(|e| {
            warn!(path = %path, error = %e, "undecodable response");
            SniffopsError::StoreUnavailable(format!("undecodable response from {}: {}", path, e))
        })
    }
}

#[async_trait]
impl TraceStore for HttpTraceStore {
    async fn list_traces(&self, query: &TraceQuery) -> Result<TracePage> {
        let params = query.to_pairs();
        let response = self.get(&["api", "traces"], &params).await?;
        let list: TraceList = Self::decode(response).await?;
        Ok(list.into())
    }

    async fn get_trace(&self, id: &str) -> Result<Trace> {
        let response = self.get(&["api", "traces", id], &[]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SniffopsError::NotFound(id.to_string()));
        }
        let trace: Trace = Self::decode(response).await?;
        Ok(normalize_trace(trace))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let response = self.get(&["api", "namespaces"], &[]).await?;
        let namespaces: Option<Vec<String>> = Self::decode(response).await?;
        Ok(namespaces.unwrap_or_default())
    }

    async fn list_tools(&self) -> Result<Vec<String>> {
        let response = self.get(&["api", "tools"], &[]).await?;
        let tools: Option<Vec<String>> = Self::decode(response).await?;
        Ok(tools.unwrap_or_default())
    }

    async fn get_stats(&self, period: StatsPeriod) -> Result<Stats> {
        let response = self
            .get(&["api", "stats"], &[("period", period.to_string())])
            .await?;
        let body: StatsBody = Self::decode(response).await?;
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use sniffops_core::RiskLevel;
    use sniffops_query::QueryPatch;

    const TRACE_JSON: &str = r#"{
        "id": "trace-002",
        "session_id": "session-abc",
        "timestamp": 1750000000000,
        "tool_name": "sniff_delete",
        "command": "kubectl delete pod critical-pod -n kube-system",
        "namespace": "kube-system",
        "resource_kind": "pod",
        "target_resource": "critical-pod",
        "risk_level": "critical",
        "risk_reason": "Critical namespace deletion",
        "result": "success",
        "latency_ms": 120,
        "tokens_input": 95,
        "tokens_output": 30,
        "cost_estimate": 0.0008
    }"#;

    fn store(server: &Server) -> HttpTraceStore {
        HttpTraceStore::new(ClientConfig::new(server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_list_traces_sends_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/traces")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("namespace".into(), "kube-system".into()),
                Matcher::UrlEncoded("risk".into(), "critical".into()),
                Matcher::UrlEncoded("limit".into(), "25".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"traces":[{}],"total":1,"limit":25,"offset":0}}"#,
                TRACE_JSON
            ))
            .create_async()
            .await;

        let query = TraceQuery::parse("limit=25").with_patch(
            QueryPatch::new()
                .namespace("kube-system")
                .risk(RiskLevel::Critical),
        );
        let page = store(&server).list_traces(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.total, 1);
        assert_eq!(page.traces[0].id, "trace-002");
        assert_eq!(page.traces[0].cost_estimate, Some(0.0008));
        assert_eq!(page.traces[0].output, None);
    }

    #[tokio::test]
    async fn test_get_trace_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/traces/missing")
            .with_status(404)
            .with_body(r#"{"error":"trace not found: missing"}"#)
            .create_async()
            .await;

        let err = store(&server).get_trace("missing").await.unwrap_err();
        assert_eq!(err, SniffopsError::NotFound("missing".into()));
    }

    #[tokio::test]
    async fn test_get_trace() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/traces/trace-002")
            .with_status(200)
            .with_body(TRACE_JSON)
            .create_async()
            .await;

        let trace = store(&server).get_trace("trace-002").await.unwrap();
        assert_eq!(trace.risk_level, RiskLevel::Critical);
        assert_eq!(trace.tokens_input, Some(95));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/traces")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"error":"database is locked"}"#)
            .create_async()
            .await;

        let err = store(&server)
            .list_traces(&TraceQuery::default())
            .await
            .unwrap_err();
        match err {
            SniffopsError::StoreUnavailable(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("database is locked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/tools")
            .with_status(200)
            .with_body("<html>proxy login</html>")
            .create_async()
            .await;

        let err = store(&server).list_tools().await.unwrap_err();
        assert!(err.is_store_failure());
    }

    #[tokio::test]
    async fn test_null_lists_are_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/namespaces")
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;
        server
            .mock("GET", "/api/tools")
            .with_status(200)
            .with_body(r#"["sniff_get","sniff_logs"]"#)
            .create_async()
            .await;

        let store = store(&server);
        assert!(store.list_namespaces().await.unwrap().is_empty());
        assert_eq!(store.list_tools().await.unwrap(), vec!["sniff_get", "sniff_logs"]);
    }

    #[tokio::test]
    async fn test_stats_period_parameter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/stats")
            .match_query(Matcher::UrlEncoded("period".into(), "7d".into()))
            .with_status(200)
            .with_body(
                r#"{"risk_distribution":{"high":2},"tool_usage":{"sniff_exec":2},"timeline":[{"hour":"2025-06-15T14:00:00Z","count":2}],"total_operations":2,"total_cost_estimate":0.0021}"#,
            )
            .create_async()
            .await;

        let stats = store(&server).get_stats(StatsPeriod::LastWeek).await.unwrap();
        mock.assert_async().await;
        assert_eq!(stats.total_operations, 2);
        assert_eq!(stats.risk_distribution.high, 2);
        assert_eq!(stats.tool_usage[0].tool, "sniff_exec");
        assert_eq!(stats.timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        // nothing listens on the discard port
        let store = HttpTraceStore::new(
            ClientConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let err = store.list_namespaces().await.unwrap_err();
        assert!(err.is_store_failure());
    }

    #[test]
    fn test_base_url_with_prefix() {
        let store = HttpTraceStore::new(ClientConfig::new("http://dash.local/sniffops/")).unwrap();
        assert_eq!(
            store.endpoint(&["api", "traces", "a b"]).as_str(),
            "http://dash.local/sniffops/api/traces/a%20b"
        );
        assert!(HttpTraceStore::new(ClientConfig::new("not a url")).is_err());
    }
}
