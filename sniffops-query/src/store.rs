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

//! Trace store abstraction
//!
//! The dashboard never talks to storage directly. Anything that can answer
//! these five calls (the live HTTP API, an in-memory fixture) can back it.

use crate::query::TraceQuery;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sniffops_core::{Result, SniffopsError, Stats, Trace};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One window of matching traces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracePage {
    /// At most `query.limit` traces
    pub traces: Vec<Trace>,
    /// Every match for the predicates, regardless of the window
    pub total: u64,
}

/// Source of traces for the dashboard
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Traces matching `query` within its pagination window
    async fn list_traces(&self, query: &TraceQuery) -> Result<TracePage>;

    /// A single trace; `NotFound` when no trace has this id
    async fn get_trace(&self, id: &str) -> Result<Trace>;

    /// Distinct namespaces, for filter population
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Distinct tool names, for filter population
    async fn list_tools(&self) -> Result<Vec<String>>;

    /// Store-side aggregation over `period`
    async fn get_stats(&self, period: StatsPeriod) -> Result<Stats>;
}

/// Look-back window for store-side statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatsPeriod {
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "24h")]
    #[default]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
    #[serde(rename = "all")]
    AllTime,
}

impl StatsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::LastHour => "1h",
            StatsPeriod::LastDay => "24h",
            StatsPeriod::LastWeek => "7d",
            StatsPeriod::LastMonth => "30d",
            StatsPeriod::AllTime => "all",
        }
    }

    /// Window length; `None` for all-time
    pub fn duration(&self) -> Option<Duration> {
        const HOUR: u64 = 60 * 60;
        match self {
            StatsPeriod::LastHour => Some(Duration::from_secs(HOUR)),
            StatsPeriod::LastDay => Some(Duration::from_secs(24 * HOUR)),
            StatsPeriod::LastWeek => Some(Duration::from_secs(7 * 24 * HOUR)),
            StatsPeriod::LastMonth => Some(Duration::from_secs(30 * 24 * HOUR)),
            StatsPeriod::AllTime => None,
        }
    }

    /// Earliest included timestamp relative to `now_ms`
    pub fn start_ms(&self, now_ms: i64) -> Option<i64> {
        self.duration()
            .map(|d| now_ms.saturating_sub(d.as_millis() as i64))
    }

    /// Lenient parse: empty or unknown means all-time, as the store treats it
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(StatsPeriod::AllTime)
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsPeriod {
    type Err = SniffopsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(StatsPeriod::LastHour),
            "24h" => Ok(StatsPeriod::LastDay),
            "7d" => Ok(StatsPeriod::LastWeek),
            "30d" => Ok(StatsPeriod::LastMonth),
            "all" => Ok(StatsPeriod::AllTime),
            other => Err(SniffopsError::MalformedQuery(format!(
                "unknown stats period: {other}"
            ))),
        }
    }
}
