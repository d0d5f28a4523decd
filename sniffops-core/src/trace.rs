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

//! Recorded tool invocations
//!
//! A [`Trace`] is produced by the trace store and never mutated by the
//! dashboard. Timestamps are milliseconds since the Unix epoch everywhere in
//! the workspace; stores that report seconds are normalized at their boundary
//! with [`normalize_epoch_millis`].

use crate::error::SniffopsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Epoch values with a smaller magnitude than this are taken to be seconds.
///
/// 1e11 ms is March 1973, 1e11 s is the year 5138.
pub const SECONDS_THRESHOLD: i64 = 100_000_000_000;

/// Convert an epoch timestamp of unknown unit to milliseconds
pub fn normalize_epoch_millis(raw: i64) -> i64 {
    if raw.abs() < SECONDS_THRESHOLD {
        raw.saturating_mul(1000)
    } else {
        raw
    }
}

/// Render a millisecond timestamp in UTC with a chrono format string
pub fn format_timestamp(timestamp_ms: i64, fmt: &str) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format(fmt).to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// Severity assigned to an operation.
///
/// Ordered by severity: `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels in display order, most severe first
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = SniffopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(RiskLevel::Critical),
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            other => Err(SniffopsError::MalformedQuery(format!(
                "unknown risk level: {other}"
            ))),
        }
    }
}

/// Outcome of the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceResult {
    Success,
    Error,
}

impl TraceResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceResult::Success => "success",
            TraceResult::Error => "error",
        }
    }
}

impl fmt::Display for TraceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded tool invocation against the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub session_id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_intent: Option<String>,
    pub tool_name: String,

    pub command: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub resource_kind: String,
    #[serde(default)]
    pub target_resource: String,

    pub risk_level: RiskLevel,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub risk_reason: Option<String>,

    pub result: TraceResult,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub output: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,

    // Absent metrics are not zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_input: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_output: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_name: Option<String>,
}

impl Trace {
    /// Minimal successful trace; remaining fields are empty or absent
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        risk_level: RiskLevel,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: String::new(),
            timestamp,
            user_intent: None,
            tool_name: tool_name.into(),
            command: String::new(),
            namespace: String::new(),
            resource_kind: String::new(),
            target_resource: String::new(),
            risk_level,
            risk_reason: None,
            result: TraceResult::Success,
            latency_ms: 0,
            output: None,
            error_message: None,
            tokens_input: None,
            tokens_output: None,
            cost_estimate: None,
            cluster_name: None,
        }
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
    }

    pub fn is_error(&self) -> bool {
        self.result == TraceResult::Error
    }

    /// Tool name without the `sniff_` prefix
    pub fn short_tool_name(&self) -> &str {
        self.tool_name
            .strip_prefix("sniff_")
            .unwrap_or(&self.tool_name)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
