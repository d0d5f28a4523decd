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


//! SniffOps Query
//!
//! Everything between a persisted query string and the page on screen:
//! the query model and its codec, pagination arithmetic, client-side
//! aggregation, the trace store abstraction and the controller that
//! orders fetches against it.

pub mod aggregation;
pub mod controller;
pub mod fixture;
pub mod pagination;
pub mod query;
pub mod store;

pub use aggregation::{
    compute_stats, hourly_timeline, latency_summary, risk_distribution, token_totals,
    tool_usage_ranked, total_cost, total_operations, TIMELINE_BUCKETS,
};
pub use controller::{
    FetchHandle, FetchOutcome, FilterOptions, PageState, QueryController, ResultPage,
    StatsReport, StatsSource,
};
pub use fixture::{sample_traces, FixtureTraceStore};
pub use pagination::PageWindow;
pub use query::{PageSize, QueryPatch, TraceQuery, ALLOWED_PAGE_SIZES, DEFAULT_PAGE_SIZE};
pub use store::{StatsPeriod, TracePage, TraceStore};
