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

//! JSON flattening for tabular detail views
//!
//! Turns a parsed JSON document into ordered `key = value` rows:
//!
//! - nested objects are walked depth-first, keys joined with `.`
//! - arrays below the root are not walked; they become one row holding
//!   their compact JSON text
//! - scalars are stringified, `null` as the text `null`
//!
//! Row order follows the document's key order (serde_json is built with
//! `preserve_order`). A `Value` is an owned tree, so there are no cycles to
//! guard against.
//!
//! Callers only flatten text that parsed as JSON; anything else is shown as
//! opaque text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One flattened `key = value` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRow {
    pub key: String,
    pub value: String,
}

impl FlatRow {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Flatten a JSON value into ordered rows.
///
/// A root array is enumerated by index (`0`, `1.name`, ...); a root scalar
/// yields a single row with an empty key.
pub fn flatten_json(value: &Value) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(key.clone(), child, &mut rows);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(index.to_string(), child, &mut rows);
            }
        }
        scalar => rows.push(FlatRow::new("", scalar_text(scalar))),
    }
    rows
}

fn flatten_into(path: String, value: &Value, rows: &mut Vec<FlatRow>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(format!("{path}.{key}"), child, rows);
            }
        }
        // Display for Value is compact JSON
        Value::Array(_) => rows.push(FlatRow::new(path, value.to_string())),
        scalar => rows.push(FlatRow::new(path, scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
