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

//! SniffOps Core
//!
//! Data structures shared by every dashboard component: recorded tool
//! invocation traces, aggregate statistics, the error taxonomy and the
//! JSON flattener used by detail views.

pub mod error;
pub mod flatten;
pub mod stats;
pub mod trace;

pub use error::{Result, SniffopsError};
pub use flatten::{flatten_json, FlatRow};
pub use stats::{LatencySummary, RiskDistribution, Stats, TimelinePoint, TokenTotals, ToolCount};
pub use trace::{
    format_timestamp, normalize_epoch_millis, RiskLevel, Trace, TraceResult, SECONDS_THRESHOLD,
};
