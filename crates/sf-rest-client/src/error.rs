// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the Starfish REST client

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by client operations. Nothing is caught or retried
/// internally; the first failure aborts the operation and partial effects
/// (tags already added in a batch) are left as-is.
#[derive(Debug, Error)]
pub enum RestClientError {
    /// Transport failure, including any non-2xx response status.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to decode response body: {0}")]
    Json(#[from] serde_json::Error),

    /// A 2xx response whose payload reports a query failure.
    #[error("Starfish reported a query failure: {payload}")]
    Query { payload: serde_json::Value },

    /// Polling exceeded its wall-clock deadline without observing
    /// completion.
    #[error("query {query_id} did not complete within {timeout:?}")]
    Timeout { query_id: String, timeout: Duration },

    /// A result row arrived without an attribute the caller asked to
    /// interpret.
    #[error("result row is missing required attribute `{0}`")]
    MissingAttribute(&'static str),

    /// Required identifying information was missing; raised before any
    /// network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RestClientResult<T> = Result<T, RestClientError>;
