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

//! Page arithmetic for the table view

use crate::query::{PageSize, QueryPatch};
use serde::Serialize;

/// Position of a query's window within a result set.
///
/// Offsets that are not a multiple of the limit (hand-edited URLs) are
/// tolerated: the current page is the one the offset falls into, and
/// navigating snaps back to page boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

impl PageWindow {
    pub fn new(limit: PageSize, offset: u64, total: u64) -> Self {
        Self {
            limit: u64::from(limit.get()),
            offset,
            total,
        }
    }

    /// 1-based page the offset falls into
    pub fn current_page(&self) -> u64 {
        self.offset / self.limit + 1
    }

    /// 0 when there are no results
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.limit)
    }

    /// 1-based inclusive range of visible rows, `None` past the end
    pub fn visible_range(&self) -> Option<(u64, u64)> {
        if self.offset >= self.total {
            return None;
        }
        let last = self.offset.saturating_add(self.limit).min(self.total);
        Some((self.offset + 1, last))
    }

    pub fn has_previous(&self) -> bool {
        self.current_page() > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page() < self.total_pages()
    }

    /// Patch that moves to a 1-based page; page 0 is treated as 1
    pub fn go_to_page(&self, page: u64) -> QueryPatch {
        let page = page.max(1);
        QueryPatch::new().offset((page - 1).saturating_mul(self.limit))
    }

    pub fn first_page(&self) -> QueryPatch {
        self.go_to_page(1)
    }

    pub fn previous_page(&self) -> QueryPatch {
        self.go_to_page(self.current_page().saturating_sub(1))
    }

    pub fn next_page(&self) -> QueryPatch {
        self.go_to_page(self.current_page() + 1)
    }

    pub fn last_page(&self) -> QueryPatch {
        self.go_to_page(self.total_pages())
    }

    /// `Showing 51 to 100 of 156 results`
    pub fn summary(&self) -> String {
        match self.visible_range() {
            Some((first, last)) => {
                format!("Showing {} to {} of {} results", first, last, self.total)
            }
            None => format!("Showing 0 of {} results", self.total),
        }
    }
}
