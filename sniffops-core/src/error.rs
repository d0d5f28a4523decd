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

//! Error taxonomy for the dashboard core

use thiserror::Error;

/// Errors produced by trace stores and the query layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SniffopsError {
    /// Single-trace lookup miss
    #[error("Trace not found: {0}")]
    NotFound(String),

    /// Transport or backend failure
    #[error("Trace store unavailable: {0}")]
    StoreUnavailable(String),

    /// A persisted value could not be decoded.
    ///
    /// The lenient query codec recovers from these locally; only the strict
    /// parsing helpers return it.
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// A response arrived after a newer request was issued
    #[error("Stale response for request {request_id} (latest is {latest})")]
    Stale { request_id: u64, latest: u64 },
}

impl SniffopsError {
    /// Whether the failure came from the store side (and should be shown)
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, SniffopsError>;
