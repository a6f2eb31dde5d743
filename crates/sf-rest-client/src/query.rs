// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Asynchronous query execution and polling
//!
//! A query submission either completes synchronously or hands back a job
//! id. [`wait_for_result`] drives the deferred case: sleep an interval,
//! check completion, and fetch the result exactly once after completion is
//! observed, all under a wall-clock deadline enforced by the loop itself.

use async_trait::async_trait;
use serde_json::Value;
use sf_api_contract::{
    is_error_payload, QueryOptions, QueryScope, QuerySubmission, QueryTerms, ResultRow,
};
use std::time::Duration;
use tracing::debug;

use crate::client::StarfishClient;
use crate::error::{RestClientError, RestClientResult};

/// Polling cadence and deadline for deferred queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

/// The two calls the poller needs, split from the concrete client so the
/// polling protocol is testable against a scripted implementation.
#[async_trait]
pub trait QueryApi {
    async fn query_status(&self, query_id: &str) -> RestClientResult<bool>;
    async fn fetch_query_result(&self, query_id: &str) -> RestClientResult<Vec<ResultRow>>;
}

#[async_trait]
impl QueryApi for StarfishClient {
    async fn query_status(&self, query_id: &str) -> RestClientResult<bool> {
        StarfishClient::query_status(self, query_id).await
    }

    async fn fetch_query_result(&self, query_id: &str) -> RestClientResult<Vec<ResultRow>> {
        StarfishClient::fetch_query_result(self, query_id).await
    }
}

/// Poll a deferred query to completion and fetch its result once.
///
/// The status endpoint may be hit many times; the result endpoint is hit
/// exactly once, after completion is observed. Exceeding the deadline
/// without completion fails with a timeout error naming the job, and zero
/// result fetches.
pub async fn wait_for_result<C: QueryApi + ?Sized>(
    client: &C,
    query_id: &str,
    options: &PollOptions,
) -> RestClientResult<Vec<ResultRow>> {
    let mut waited = Duration::ZERO;
    while waited + options.interval <= options.timeout {
        tokio::time::sleep(options.interval).await;
        waited += options.interval;
        if client.query_status(query_id).await? {
            return client.fetch_query_result(query_id).await;
        }
        debug!("query {} not done after {:?}", query_id, waited);
    }
    Err(RestClientError::Timeout {
        query_id: query_id.to_string(),
        timeout: options.timeout,
    })
}

/// Interpret a query result payload: a logical failure object raises, an
/// array decodes into rows.
pub(crate) fn decode_result_rows(payload: Value) -> RestClientResult<Vec<ResultRow>> {
    if is_error_payload(&payload) {
        return Err(RestClientError::Query { payload });
    }
    Ok(serde_json::from_value(payload)?)
}

impl StarfishClient {
    /// Run a query to completion: submit, and poll when the service defers.
    pub async fn query(
        &self,
        scopes: Option<&[String]>,
        terms: &QueryTerms,
        options: &QueryOptions,
        poll: &PollOptions,
    ) -> RestClientResult<Vec<ResultRow>> {
        match self.submit_query(scopes, terms, options).await? {
            QuerySubmission::Complete { rows, .. } => Ok(rows),
            QuerySubmission::Deferred { query_id } => {
                wait_for_result(self, &query_id, poll).await
            }
        }
    }

    /// Depth-0 query across all volumes.
    pub async fn volumes_query(&self) -> RestClientResult<Vec<ResultRow>> {
        self.query(
            None,
            &QueryTerms::depth(0),
            &QueryOptions::default(),
            &PollOptions::default(),
        )
        .await
    }

    /// Depth-1 directory listing with size aggregates under one scope.
    pub async fn subfolder_size_query(
        &self,
        scope: &QueryScope,
    ) -> RestClientResult<Vec<ResultRow>> {
        let scopes = vec![scope.to_string()];
        self.query(
            Some(&scopes),
            &QueryTerms::depth(1),
            &QueryOptions::default(),
            &PollOptions::default(),
        )
        .await
    }
}
