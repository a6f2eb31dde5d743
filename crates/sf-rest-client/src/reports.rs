// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Query-result download client
//!
//! The reporting side of a Starfish host exposes saved query results for
//! download under `https://{host}/redash/api/`, authorized with `Key`
//! tokens rather than `Bearer`. Results are streamed to disk as CSV, named
//! by query id.

use futures::StreamExt;
use reqwest::Client as HttpClient;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::auth::AuthConfig;
use crate::error::RestClientResult;

/// Client for the report/query-download API.
#[derive(Debug, Clone)]
pub struct ReportsClient {
    http_client: HttpClient,
    base_url: Url,
    auth: AuthConfig,
}

impl ReportsClient {
    /// Create a client for `https://{host}/redash/api/`.
    pub fn for_host(host: &str, api_key: impl Into<String>) -> RestClientResult<Self> {
        let base_url = Url::parse(&format!("https://{host}/redash/api/"))?;
        let http_client = HttpClient::builder()
            .user_agent("sf-rest-client/0.1")
            .build()
            .expect("Failed to create HTTP client");
        Ok(Self {
            http_client,
            base_url,
            auth: AuthConfig::Key(api_key.into()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Download a saved query's results into `dir` as `{query_id}.csv`,
    /// streaming chunks straight to disk. Returns the written path.
    pub async fn download_query_results(
        &self,
        query_id: u64,
        dir: &Path,
    ) -> RestClientResult<PathBuf> {
        let url = self.base_url.join(&format!("queries/{query_id}/results.csv"))?;
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .headers(self.auth.headers()?)
            .send()
            .await?
            .error_for_status()?;

        let path = dir.join(format!("{query_id}.csv"));
        let mut file = tokio::fs::File::create(&path).await?;
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(path)
    }
}
