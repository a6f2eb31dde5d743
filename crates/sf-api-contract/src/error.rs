// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logical-failure detection for query payloads

use serde_json::Value;

/// Whether a successfully-transported payload is a logical query failure: a
/// JSON object carrying an `error` key instead of a result array.
pub fn is_error_payload(payload: &Value) -> bool {
    payload.as_object().is_some_and(|map| map.contains_key("error"))
}
