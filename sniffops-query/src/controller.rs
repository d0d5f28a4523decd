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

//! Query controller
//!
//! Turns a [`TraceQuery`] into the page the dashboard shows. Every fetch is
//! tagged with a request id taken from a monotonically increasing counter;
//! a response is only applied if its id is still the latest issued, so a
//! slow answer to an old query can never replace the answer to a newer one.
//!
//! Two pagination modes:
//! - [`QueryController::set_query`] / [`QueryController::apply_patch`]
//!   replace the displayed page (table view)
//! - [`QueryController::load_more`] fetches the next window and appends it
//!   to what is already displayed (timeline view)
//!
//! A failed fetch moves to [`PageState::Failed`] but keeps the last good
//! page around so the view is never blanked. A failed append also rolls the
//! current query back to the accumulated page, so calling `load_more` again
//! retries the same window. Nothing is retried automatically and no timeout
//! is imposed here; the store owns its own timeout policy.
//!
//! Fetches run on spawned tokio tasks, so the mutating methods must be
//! called from within a tokio runtime.

use crate::aggregation::compute_stats;
use crate::pagination::PageWindow;
use crate::query::{QueryPatch, TraceQuery};
use crate::store::{StatsPeriod, TracePage, TraceStore};
use parking_lot::Mutex;
use serde::Serialize;
use sniffops_core::{Result, SniffopsError, Stats, Trace};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A settled page of results for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage {
    /// Displayed traces. After `load_more` this spans several windows.
    pub traces: Vec<Trace>,
    /// Matches for the query's predicates, independent of the window
    pub total: u64,
    /// The query whose response produced this page
    pub query: TraceQuery,
    pub request_id: u64,
}

impl ResultPage {
    /// Whether another window exists past the one last fetched
    pub fn has_more(&self) -> bool {
        self.query
            .offset
            .saturating_add(u64::from(self.query.limit.get()))
            < self.total
    }

    pub fn window(&self) -> PageWindow {
        self.query.window(self.total)
    }
}

/// What the view should render
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// Nothing issued yet
    Idle,
    /// Waiting on the store for `query`. `extending` is the accumulated
    /// page an append will grow; a replacing fetch carries none.
    Pending {
        query: TraceQuery,
        request_id: u64,
        extending: Option<ResultPage>,
    },
    Ready(ResultPage),
    /// The latest fetch failed; `last_good` is what to keep showing
    Failed {
        query: TraceQuery,
        cause: String,
        last_good: Option<ResultPage>,
    },
}

impl PageState {
    pub fn is_pending(&self) -> bool {
        matches!(self, PageState::Pending { .. })
    }

    pub fn ready(&self) -> Option<&ResultPage> {
        match self {
            PageState::Ready(page) => Some(page),
            _ => None,
        }
    }

    /// The page to draw: the settled page, the last good one on failure,
    /// or the page an in-flight append is extending
    pub fn displayed(&self) -> Option<&ResultPage> {
        match self {
            PageState::Ready(page) => Some(page),
            PageState::Failed { last_good, .. } => last_good.as_ref(),
            PageState::Pending { extending, .. } => extending.as_ref(),
            PageState::Idle => None,
        }
    }
}

/// How a fetch settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response became the current page
    Shown,
    /// The store rejected the request; state is now `Failed`
    Failed,
    /// A newer request was issued first; the response was dropped
    Superseded,
}

/// Handle to an issued fetch
#[derive(Debug)]
pub struct FetchHandle {
    request_id: u64,
    task: JoinHandle<FetchOutcome>,
}

impl FetchHandle {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Wait for the fetch to settle
    pub async fn settled(self) -> FetchOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(request_id = self.request_id, error = %err, "fetch task did not complete");
                FetchOutcome::Failed
            }
        }
    }
}

/// Which aggregation path produced a [`StatsReport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsSource {
    /// Store-side aggregation over the whole period
    Store,
    /// Client-side aggregation over the displayed traces only
    Page,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub period: StatsPeriod,
    pub source: StatsSource,
    pub stats: Stats,
}

/// Values available for the filter dropdowns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub namespaces: Vec<String>,
    pub tools: Vec<String>,
}

enum FetchMode {
    Replace,
    /// Append onto the page that was displayed when the fetch was issued
    Append(ResultPage),
}

struct Inner {
    query: TraceQuery,
    latest_request: u64,
    state: PageState,
    last_good: Option<ResultPage>,
}

impl Inner {
    /// Page the next `load_more` would extend.
    ///
    /// After a failed append the current query still matches the last good
    /// page, which stays extendable. After any other failure it does not.
    fn append_base(&self) -> Option<&ResultPage> {
        let page = match &self.state {
            PageState::Ready(page) => page,
            PageState::Failed {
                last_good: Some(page),
                ..
            } if page.query == self.query => page,
            _ => return None,
        };
        page.has_more().then_some(page)
    }
}

struct Shared {
    inner: Mutex<Inner>,
    changes: watch::Sender<u64>,
}

impl Shared {
    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    fn settle(
        &self,
        request_id: u64,
        query: TraceQuery,
        mode: FetchMode,
        result: Result<TracePage>,
    ) -> FetchOutcome {
        let outcome = {
            let mut inner = self.inner.lock();

            if request_id != inner.latest_request {
                let stale = SniffopsError::Stale {
                    request_id,
                    latest: inner.latest_request,
                };
                debug!(%stale, "discarding response");
                return FetchOutcome::Superseded;
            }

            match result {
                Ok(page) => {
                    let traces = match mode {
                        FetchMode::Replace => page.traces,
                        FetchMode::Append(base) => append_unique(base.traces, page.traces),
                    };
                    debug!(
                        request_id,
                        shown = traces.len(),
                        total = page.total,
                        "fetch settled"
                    );
                    let page = ResultPage {
                        traces,
                        total: page.total,
                        query,
                        request_id,
                    };
                    inner.last_good = Some(page.clone());
                    inner.state = PageState::Ready(page);
                    FetchOutcome::Shown
                }
                Err(err) => {
                    warn!(request_id, query = %query, error = %err, "trace fetch failed");
                    if let FetchMode::Append(base) = &mode {
                        inner.query = base.query.clone();
                    }
                    inner.state = PageState::Failed {
                        query,
                        cause: err.to_string(),
                        last_good: inner.last_good.clone(),
                    };
                    FetchOutcome::Failed
                }
            }
        };

        self.notify();
        outcome
    }
}

fn append_unique(mut base: Vec<Trace>, next: Vec<Trace>) -> Vec<Trace> {
    let mut seen: HashSet<String> = base.iter().map(|t| t.id.clone()).collect();
    base.extend(next.into_iter().filter(|t| seen.insert(t.id.clone())));
    base
}

/// Owner of the current query and the page displayed for it
#[derive(Clone)]
pub struct QueryController {
    store: Arc<dyn TraceStore>,
    shared: Arc<Shared>,
}

impl QueryController {
    pub fn new(store: Arc<dyn TraceStore>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    query: TraceQuery::default(),
                    latest_request: 0,
                    state: PageState::Idle,
                    last_good: None,
                }),
                changes,
            }),
        }
    }

    /// Make `query` current and fetch it, replacing the displayed page
    pub fn set_query(&self, query: TraceQuery) -> FetchHandle {
        let request_id = {
            let mut inner = self.shared.inner.lock();
            Self::begin(&mut inner, &query, None)
        };
        self.spawn_fetch(request_id, query, FetchMode::Replace)
    }

    /// Derive the next query from the current one and fetch it
    pub fn apply_patch(&self, patch: QueryPatch) -> FetchHandle {
        let (request_id, query) = {
            let mut inner = self.shared.inner.lock();
            let query = inner.query.with_patch(patch);
            (Self::begin(&mut inner, &query, None), query)
        };
        self.spawn_fetch(request_id, query, FetchMode::Replace)
    }

    /// Fetch the window after the displayed one and append it.
    ///
    /// `None` while a fetch is pending, when no page has settled, after a
    /// failed replacing fetch, or when the displayed page already reaches
    /// `total`. After a failed append it retries the same window.
    pub fn load_more(&self) -> Option<FetchHandle> {
        let (request_id, query, base) = {
            let mut inner = self.shared.inner.lock();
            let base = inner.append_base()?.clone();
            let query = base.query.next_page();
            let request_id = Self::begin(&mut inner, &query, Some(base.clone()));
            (request_id, query, base)
        };
        Some(self.spawn_fetch(request_id, query, FetchMode::Append(base)))
    }

    /// Re-fetch the current query
    pub fn refresh(&self) -> FetchHandle {
        self.set_query(self.query())
    }

    fn begin(inner: &mut Inner, query: &TraceQuery, extending: Option<ResultPage>) -> u64 {
        inner.latest_request += 1;
        inner.query = query.clone();
        inner.state = PageState::Pending {
            query: query.clone(),
            request_id: inner.latest_request,
            extending,
        };
        inner.latest_request
    }

    fn spawn_fetch(&self, request_id: u64, query: TraceQuery, mode: FetchMode) -> FetchHandle {
        self.shared.notify();
        debug!(request_id, query = %query, "issuing trace fetch");

        let store = Arc::clone(&self.store);
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let result = store.list_traces(&query).await;
            shared.settle(request_id, query, mode, result)
        });

        FetchHandle { request_id, task }
    }

    pub fn current_page(&self) -> PageState {
        self.shared.inner.lock().state.clone()
    }

    pub fn query(&self) -> TraceQuery {
        self.shared.inner.lock().query.clone()
    }

    /// Whether `load_more` would issue a fetch
    pub fn has_more(&self) -> bool {
        self.shared.inner.lock().append_base().is_some()
    }

    /// Pagination window of the settled page
    pub fn page_window(&self) -> Option<PageWindow> {
        self.shared.inner.lock().state.ready().map(ResultPage::window)
    }

    /// Receiver that changes whenever the page state does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    /// Namespaces and tools, loaded concurrently
    pub async fn filter_options(&self) -> Result<FilterOptions> {
        let (namespaces, tools) =
            tokio::try_join!(self.store.list_namespaces(), self.store.list_tools())?;
        Ok(FilterOptions { namespaces, tools })
    }

    /// Statistics for `period`, aggregated locally if the store fails.
    ///
    /// The local fallback only covers the traces currently displayed, so
    /// its numbers need not agree with the store's.
    pub async fn stats(&self, period: StatsPeriod) -> StatsReport {
        match self.store.get_stats(period).await {
            Ok(stats) => StatsReport {
                period,
                source: StatsSource::Store,
                stats,
            },
            Err(err) => {
                warn!(%period, error = %err, "store stats unavailable, aggregating displayed page");
                let traces = self
                    .shared
                    .inner
                    .lock()
                    .last_good
                    .as_ref()
                    .map(|page| page.traces.clone())
                    .unwrap_or_default();
                StatsReport {
                    period,
                    source: StatsSource::Page,
                    stats: compute_stats(&traces),
                }
            }
        }
    }

    /// Single trace lookup, straight through to the store
    pub async fn trace(&self, id: &str) -> Result<Trace> {
        self.store.get_trace(id).await
    }
}
