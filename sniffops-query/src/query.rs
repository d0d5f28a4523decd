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

//! Trace query model
//!
//! [`TraceQuery`] is the canonical description of "which traces are being
//! viewed": a handful of equality/range predicates plus a pagination window.
//! It round-trips through a URL query string so a view can be bookmarked and
//! shared:
//!
//! ```text
//! tool=sniff_apply&namespace=production&risk=high&search=nginx&limit=25&offset=50&start=..&end=..
//! ```
//!
//! Parsing is lenient (unknown keys ignored, bad values fall back to their
//! defaults) and serialization omits defaults so that equal views always
//! produce equal strings.
//!
//! Mutations go through [`TraceQuery::with_patch`], which resets the page
//! position whenever the result set or the page size changes.

use crate::pagination::PageWindow;
use serde::{Deserialize, Serialize};
use sniffops_core::{RiskLevel, SniffopsError, Trace};
use std::fmt;
use std::str::FromStr;

/// Page size used when none (or an unsupported one) is given
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Page sizes offered by the dashboard
pub const ALLOWED_PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];

/// Query string keys, in serialization order
pub const QUERY_KEYS: [&str; 8] = [
    "tool",
    "namespace",
    "risk",
    "search",
    "limit",
    "offset",
    "start",
    "end",
];

/// A page size restricted to [`ALLOWED_PAGE_SIZES`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    pub const DEFAULT: PageSize = PageSize(DEFAULT_PAGE_SIZE);

    pub fn new(size: u32) -> Option<Self> {
        ALLOWED_PAGE_SIZES.contains(&size).then_some(PageSize(size))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for PageSize {
    type Error = SniffopsError;

    fn try_from(size: u32) -> Result<Self, Self::Error> {
        PageSize::new(size).ok_or_else(|| {
            SniffopsError::MalformedQuery(format!(
                "page size {size} is not one of {ALLOWED_PAGE_SIZES:?}"
            ))
        })
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> u32 {
        size.0
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filter predicates plus pagination window.
///
/// Unset predicates impose no constraint; set ones are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceQuery {
    pub tool: Option<String>,
    pub namespace: Option<String>,
    pub risk: Option<RiskLevel>,
    /// Case-insensitive substring of command or target resource
    pub search: Option<String>,
    /// Inclusive lower bound, ms since epoch
    pub start: Option<i64>,
    /// Inclusive upper bound, ms since epoch
    pub end: Option<i64>,
    pub limit: PageSize,
    pub offset: u64,
}

impl TraceQuery {
    /// Decode a persisted query string. Never fails.
    ///
    /// A leading `?` is accepted. Unknown keys are ignored, repeated keys
    /// take the last value, empty values mean unset, and values that do not
    /// decode fall back to their defaults.
    pub fn parse(serialized: &str) -> Self {
        let mut query = TraceQuery::default();
        let input = serialized.trim().trim_start_matches('?');

        for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
            let value = value.as_ref();
            match key.as_ref() {
                "tool" => query.tool = non_empty(value),
                "namespace" => query.namespace = non_empty(value),
                "search" => query.search = non_empty(value),
                "risk" => query.risk = value.parse().ok(),
                "limit" => {
                    query.limit = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .and_then(PageSize::new)
                        .unwrap_or_default();
                }
                "offset" => query.offset = value.trim().parse().unwrap_or(0),
                "start" => query.start = value.trim().parse().ok(),
                "end" => query.end = value.trim().parse().ok(),
                _ => {}
            }
        }

        query
    }

    /// Encode as a query string, omitting unset and default fields
    pub fn serialize(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.to_pairs() {
            serializer.append_pair(key, &value);
        }
        serializer.finish()
    }

    /// Non-default fields as `(key, value)` pairs in [`QUERY_KEYS`] order
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(QUERY_KEYS.len());
        if let Some(tool) = &self.tool {
            pairs.push(("tool", tool.clone()));
        }
        if let Some(namespace) = &self.namespace {
            pairs.push(("namespace", namespace.clone()));
        }
        if let Some(risk) = self.risk {
            pairs.push(("risk", risk.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if self.limit != PageSize::DEFAULT {
            pairs.push(("limit", self.limit.to_string()));
        }
        if self.offset != 0 {
            pairs.push(("offset", self.offset.to_string()));
        }
        if let Some(start) = self.start {
            pairs.push(("start", start.to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("end", end.to_string()));
        }
        pairs
    }

    /// Apply a patch. The only sanctioned way to derive a new query.
    ///
    /// Touching any predicate or the limit resets `offset` to 0.
    pub fn with_patch(&self, patch: QueryPatch) -> Self {
        let resets_position = patch.touches_predicates() || patch.limit.is_some();
        let mut next = self.clone();

        if let Some(tool) = patch.tool {
            next.tool = tool;
        }
        if let Some(namespace) = patch.namespace {
            next.namespace = namespace;
        }
        if let Some(risk) = patch.risk {
            next.risk = risk;
        }
        if let Some(search) = patch.search {
            next.search = search;
        }
        if let Some(start) = patch.start {
            next.start = start;
        }
        if let Some(end) = patch.end {
            next.end = end;
        }
        if let Some(limit) = patch.limit {
            next.limit = limit;
        }

        if resets_position {
            next.offset = 0;
        } else if let Some(offset) = patch.offset {
            next.offset = offset;
        }

        next
    }

    /// Whether any predicate is set
    pub fn has_filters(&self) -> bool {
        self.tool.is_some()
            || self.namespace.is_some()
            || self.risk.is_some()
            || self.search.is_some()
            || self.start.is_some()
            || self.end.is_some()
    }

    /// Evaluate the predicates against a trace
    pub fn matches(&self, trace: &Trace) -> bool {
        if let Some(tool) = &self.tool {
            if &trace.tool_name != tool {
                return false;
            }
        }
        if let Some(namespace) = &self.namespace {
            if &trace.namespace != namespace {
                return false;
            }
        }
        if let Some(risk) = self.risk {
            if trace.risk_level != risk {
                return false;
            }
        }
        if let Some(start) = self.start {
            if trace.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if trace.timestamp > end {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = trace.command.to_lowercase().contains(&needle)
                || trace.target_resource.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Pagination arithmetic for this query against a result total
    pub fn window(&self, total: u64) -> PageWindow {
        PageWindow::new(self.limit, self.offset, total)
    }

    /// The query for the page following this one
    pub fn next_page(&self) -> Self {
        let offset = self.offset.saturating_add(u64::from(self.limit.get()));
        self.with_patch(QueryPatch::new().offset(offset))
    }
}

impl fmt::Display for TraceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for TraceQuery {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TraceQuery::parse(s))
    }
}

/// A partial update to a [`TraceQuery`].
///
/// For each predicate: `None` leaves it alone, `Some(None)` clears it,
/// `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPatch {
    pub tool: Option<Option<String>>,
    pub namespace: Option<Option<String>>,
    pub risk: Option<Option<RiskLevel>>,
    pub search: Option<Option<String>>,
    pub start: Option<Option<i64>>,
    pub end: Option<Option<i64>>,
    pub limit: Option<PageSize>,
    pub offset: Option<u64>,
}

impl QueryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every predicate, keeping the page size
    pub fn clear_filters() -> Self {
        Self {
            tool: Some(None),
            namespace: Some(None),
            risk: Some(None),
            search: Some(None),
            start: Some(None),
            end: Some(None),
            limit: None,
            offset: None,
        }
    }

    /// Set the tool filter; an empty string clears it
    pub fn tool(mut self, tool: impl AsRef<str>) -> Self {
        self.tool = Some(non_empty(tool.as_ref()));
        self
    }

    pub fn clear_tool(mut self) -> Self {
        self.tool = Some(None);
        self
    }

    /// Set the namespace filter; an empty string clears it
    pub fn namespace(mut self, namespace: impl AsRef<str>) -> Self {
        self.namespace = Some(non_empty(namespace.as_ref()));
        self
    }

    pub fn clear_namespace(mut self) -> Self {
        self.namespace = Some(None);
        self
    }

    pub fn risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(Some(risk));
        self
    }

    pub fn clear_risk(mut self) -> Self {
        self.risk = Some(None);
        self
    }

    /// Set the search text; an empty string clears it
    pub fn search(mut self, search: impl AsRef<str>) -> Self {
        self.search = Some(non_empty(search.as_ref()));
        self
    }

    pub fn clear_search(mut self) -> Self {
        self.search = Some(None);
        self
    }

    pub fn start(mut self, start_ms: Option<i64>) -> Self {
        self.start = Some(start_ms);
        self
    }

    pub fn end(mut self, end_ms: Option<i64>) -> Self {
        self.end = Some(end_ms);
        self
    }

    pub fn limit(mut self, limit: PageSize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether applying this patch changes the result set
    pub fn touches_predicates(&self) -> bool {
        self.tool.is_some()
            || self.namespace.is_some()
            || self.risk.is_some()
            || self.search.is_some()
            || self.start.is_some()
            || self.end.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.touches_predicates() && self.limit.is_none() && self.offset.is_none()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn page(size: u32) -> PageSize {
        PageSize::new(size).unwrap()
    }

    #[test]
    fn test_default_query_serializes_empty() {
        assert_eq!(TraceQuery::default().serialize(), "");
        assert_eq!(TraceQuery::parse(""), TraceQuery::default());
    }

    #[test]
    fn test_serialize_key_order_and_omission() {
        let query = TraceQuery {
            end: Some(2_000),
            start: Some(1_000),
            offset: 25,
            limit: page(25),
            risk: Some(RiskLevel::High),
            namespace: Some("production".into()),
            tool: Some("sniff_apply".into()),
            search: Some("nginx deploy".into()),
        };
        assert_eq!(
            query.serialize(),
            "tool=sniff_apply&namespace=production&risk=high&search=nginx+deploy&limit=25&offset=25&start=1000&end=2000"
        );

        let minimal = TraceQuery {
            namespace: Some("kube-system".into()),
            ..Default::default()
        };
        assert_eq!(minimal.serialize(), "namespace=kube-system");
    }

    #[test]
    fn test_parse_recovers_from_bad_values() {
        let query =
            TraceQuery::parse("?risk=severe&limit=abc&offset=-5&start=yesterday&colour=blue&tool=");
        assert_eq!(query, TraceQuery::default());
    }

    #[test]
    fn test_parse_unsupported_page_size_falls_back() {
        assert_eq!(TraceQuery::parse("limit=7").limit, PageSize::DEFAULT);
        assert_eq!(TraceQuery::parse("limit=100").limit, page(100));
    }

    #[test]
    fn test_parse_tolerates_unaligned_offset() {
        let query = TraceQuery::parse("limit=10&offset=13");
        assert_eq!(query.offset, 13);
        assert_eq!(query.window(40).current_page(), 2);
    }

    #[test]
    fn test_parse_last_value_wins() {
        let query = TraceQuery::parse("tool=sniff_get&tool=sniff_logs");
        assert_eq!(query.tool.as_deref(), Some("sniff_logs"));
    }

    #[test]
    fn test_parse_decodes_escapes() {
        let query = TraceQuery::parse("search=kubectl%20delete&namespace=a%26b");
        assert_eq!(query.search.as_deref(), Some("kubectl delete"));
        assert_eq!(query.namespace.as_deref(), Some("a&b"));
    }

    #[test]
    fn test_predicate_patch_resets_offset() {
        let query = TraceQuery {
            offset: 150,
            ..Default::default()
        };
        let next = query.with_patch(QueryPatch::new().namespace("x"));
        assert_eq!(next.offset, 0);
        assert_eq!(next.namespace.as_deref(), Some("x"));

        // Reset wins even when the patch names an offset
        let next = query.with_patch(QueryPatch::new().risk(RiskLevel::Low).offset(50));
        assert_eq!(next.offset, 0);
    }

    #[test]
    fn test_limit_patch_resets_offset() {
        let query = TraceQuery {
            offset: 100,
            ..Default::default()
        };
        let next = query.with_patch(QueryPatch::new().limit(page(10)));
        assert_eq!(next.offset, 0);
        assert_eq!(next.limit, page(10));
    }

    #[test]
    fn test_offset_only_patch_keeps_filters() {
        let query = TraceQuery::parse("tool=sniff_get&limit=25");
        let next = query.with_patch(QueryPatch::new().offset(75));
        assert_eq!(next.offset, 75);
        assert_eq!(next.tool.as_deref(), Some("sniff_get"));
        assert_eq!(next.limit, page(25));
    }

    #[test]
    fn test_empty_string_patch_clears() {
        let query = TraceQuery::parse("tool=sniff_get");
        let next = query.with_patch(QueryPatch::new().tool(""));
        assert_eq!(next.tool, None);
    }

    #[test]
    fn test_clear_filters_keeps_limit() {
        let query = TraceQuery::parse("tool=a&namespace=b&risk=low&search=c&limit=10&offset=20&start=1&end=2");
        let next = query.with_patch(QueryPatch::clear_filters());
        assert!(!next.has_filters());
        assert_eq!(next.limit, page(10));
        assert_eq!(next.offset, 0);
    }

    #[test]
    fn test_next_page() {
        let query = TraceQuery::parse("limit=25&offset=25&risk=high");
        let next = query.next_page();
        assert_eq!(next.offset, 50);
        assert_eq!(next.risk, Some(RiskLevel::High));
    }

    #[test]
    fn test_matches() {
        let mut trace = Trace::new("t-1", "sniff_delete", RiskLevel::Critical, 5_000);
        trace.namespace = "kube-system".into();
        trace.command = "kubectl delete pod critical-pod -n kube-system".into();
        trace.target_resource = "critical-pod".into();

        assert!(TraceQuery::default().matches(&trace));
        assert!(TraceQuery::parse("tool=sniff_delete&risk=critical").matches(&trace));
        assert!(!TraceQuery::parse("namespace=production").matches(&trace));
        assert!(TraceQuery::parse("search=CRITICAL-POD").matches(&trace));
        assert!(!TraceQuery::parse("search=nginx").matches(&trace));
        assert!(TraceQuery::parse("start=5000&end=5000").matches(&trace));
        assert!(!TraceQuery::parse("start=5001").matches(&trace));
        assert!(!TraceQuery::parse("end=4999").matches(&trace));
    }

    #[test]
    fn test_page_size_serde() {
        let size: PageSize = serde_json::from_str("25").unwrap();
        assert_eq!(size, page(25));
        assert!(serde_json::from_str::<PageSize>("30").is_err());
        assert!(PageSize::try_from(0).is_err());
    }

    fn text() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[a-zA-Z0-9 _&=?%+./-]{1,16}")
    }

    fn risk() -> impl Strategy<Value = Option<RiskLevel>> {
        proptest::option::of(proptest::sample::select(RiskLevel::ALL.to_vec()))
    }

    prop_compose! {
        fn arb_query()(
            tool in text(),
            namespace in text(),
            risk in risk(),
            search in text(),
            start in proptest::option::of(any::<i64>()),
            end in proptest::option::of(any::<i64>()),
            limit in proptest::sample::select(ALLOWED_PAGE_SIZES.to_vec()),
            offset in any::<u64>(),
        ) -> TraceQuery {
            TraceQuery {
                tool,
                namespace,
                risk,
                search,
                start,
                end,
                limit: PageSize::new(limit).unwrap(),
                offset,
            }
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip(query in arb_query()) {
            prop_assert_eq!(TraceQuery::parse(&query.serialize()), query);
        }

        #[test]
        fn prop_serialize_is_stable(query in arb_query()) {
            let once = query.serialize();
            prop_assert_eq!(TraceQuery::parse(&once).serialize(), once);
        }

        #[test]
        fn prop_predicate_change_resets_offset(query in arb_query(), ns in "[a-z]{1,8}") {
            prop_assert_eq!(query.with_patch(QueryPatch::new().namespace(ns)).offset, 0);
        }
    }
}
