// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main Starfish REST client implementation

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sf_api_contract::*;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use url::Url;

use crate::auth::AuthConfig;
use crate::error::{RestClientError, RestClientResult};
use crate::query::decode_result_rows;

/// Header carrying the job id the service issues alongside a synchronous
/// query result.
pub const QUERY_ID_HEADER: &str = "SF-Query-Id";

/// Authenticated client for the Starfish REST API. Base URL and token are
/// immutable after construction.
#[derive(Debug, Clone)]
pub struct StarfishClient {
    http_client: HttpClient,
    base_url: Url,
    auth: AuthConfig,
}

impl StarfishClient {
    /// Create a client against an explicit API base URL.
    pub fn new(base_url: Url, auth: AuthConfig) -> Self {
        let http_client = HttpClient::builder()
            .user_agent("sf-rest-client/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url,
            auth,
        }
    }

    /// Create a client from a base URL string.
    pub fn from_url(base_url: &str, auth: AuthConfig) -> RestClientResult<Self> {
        let base_url = Url::parse(base_url)?;
        Ok(Self::new(base_url, auth))
    }

    /// Create a client for `https://{host}/api/` with an existing token.
    pub fn for_host(host: &str, token: impl Into<String>) -> RestClientResult<Self> {
        Self::from_url(
            &format!("https://{host}/api/"),
            AuthConfig::Bearer(token.into()),
        )
    }

    /// Obtain a token through the auth endpoint and build a client with it.
    pub async fn login(host: &str, username: &str, password: &str) -> RestClientResult<Self> {
        let base_url = Url::parse(&format!("https://{host}/api/"))?;
        let credentials = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let http_client = HttpClient::builder()
            .user_agent("sf-rest-client/0.1")
            .build()
            .expect("Failed to create HTTP client");
        let response = http_client
            .post(base_url.join("auth/")?)
            .json(&credentials)
            .send()
            .await?
            .error_for_status()?;
        let auth: AuthResponse = response.json().await?;
        Ok(Self {
            http_client,
            base_url,
            auth: AuthConfig::Bearer(auth.token),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    // Volumes and mappings

    /// List volumes, dropping any whose name appears in `exclude`.
    pub async fn get_volumes(&self, exclude: &[&str]) -> RestClientResult<Vec<Volume>> {
        let volumes: Vec<Volume> = self.get("volume").await?;
        Ok(volumes.into_iter().filter(|v| !exclude.contains(&v.vol.as_str())).collect())
    }

    pub async fn volume_names(&self, exclude: &[&str]) -> RestClientResult<Vec<String>> {
        Ok(self.get_volumes(exclude).await?.into_iter().map(|v| v.vol).collect())
    }

    /// Set of group names known to Starfish.
    pub async fn get_groups(&self) -> RestClientResult<BTreeSet<String>> {
        let groups: Vec<MappingGroup> = self.get("mapping/group/").await?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    /// Raw membership listing for one volume; `voltype` is `user` or
    /// `group`.
    pub async fn get_vol_membership(&self, volume: &str, voltype: &str) -> RestClientResult<Value> {
        self.get(&format!("mapping/{voltype}_membership?volume_name={volume}")).await
    }

    /// uid → username map for one volume.
    pub async fn get_vol_user_name_ids(
        &self,
        volume: &str,
    ) -> RestClientResult<HashMap<u32, String>> {
        let users: Vec<MappingUser> =
            self.get(&format!("mapping/user?volume_name={volume}")).await?;
        Ok(users.into_iter().map(|u| (u.uid, u.name)).collect())
    }

    pub async fn get_user_membership_groups(&self) -> RestClientResult<Vec<String>> {
        let groups: Vec<MappingGroup> = self.get("mapping/user_membership").await?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    // Zones

    pub async fn get_zones(&self) -> RestClientResult<Vec<Zone>> {
        self.get("zone").await
    }

    pub async fn get_zone(&self, zone_id: u64) -> RestClientResult<Zone> {
        self.get(&format!("zone/{zone_id}")).await
    }

    /// Client-side lookup; the service has no by-name endpoint.
    pub async fn get_zone_by_name(&self, zone_name: &str) -> RestClientResult<Option<Zone>> {
        let zones = self.get_zones().await?;
        Ok(zones.into_iter().find(|z| z.name == zone_name))
    }

    pub async fn create_zone(&self, spec: &ZoneSpec) -> RestClientResult<Zone> {
        self.post("zone", spec, None).await
    }

    /// Update a zone in place. Empty field arguments keep the zone's
    /// current values.
    pub async fn update_zone(
        &self,
        zone: &Zone,
        paths: Vec<String>,
        managers: Vec<String>,
        managing_groups: Vec<String>,
    ) -> RestClientResult<Zone> {
        let spec = ZoneSpec {
            name: zone.name.clone(),
            paths: if paths.is_empty() { zone.paths.clone() } else { paths },
            managers: if managers.is_empty() { zone.managers.clone() } else { managers },
            managing_groups: if managing_groups.is_empty() {
                zone.managing_groups.clone()
            } else {
                managing_groups
            },
        };
        self.put(&format!("zone/{}/", zone.id), &spec).await
    }

    /// Delete a zone by id, or by name when no id is known. Missing both,
    /// or a name that resolves to nothing, is an argument error raised
    /// before any network call for the delete itself.
    pub async fn delete_zone(
        &self,
        zone_id: Option<u64>,
        zone_name: Option<&str>,
    ) -> RestClientResult<()> {
        let zone_id = match (zone_id, zone_name) {
            (Some(id), _) => id,
            (None, Some(name)) => self
                .get_zone_by_name(name)
                .await?
                .ok_or_else(|| {
                    RestClientError::InvalidArgument(format!("zone {name} not found"))
                })?
                .id,
            (None, None) => {
                return Err(RestClientError::InvalidArgument(
                    "either zone_id or zone_name must be provided".to_string(),
                ))
            }
        };
        self.delete(&format!("zone/{zone_id}")).await
    }

    // Scans

    /// Scan records for the given volumes, or for all volumes when none are
    /// named.
    pub async fn get_scans(&self, volumes: Option<&[&str]>) -> RestClientResult<Vec<Scan>> {
        let endpoint = match volumes {
            Some(volumes) => {
                let filter: Vec<String> = volumes.iter().map(|v| format!("volume={v}")).collect();
                format!("scan/?{}", filter.join("&"))
            }
            None => "scan".to_string(),
        };
        let listing: ScanListResponse = self.get(&endpoint).await?;
        Ok(listing.scans)
    }

    // Tags

    /// Tag definitions, returned uninterpreted.
    pub async fn get_tags(&self) -> RestClientResult<Value> {
        self.get("tag").await
    }

    /// Associate each tag with each path. Non-strict: unknown paths or tags
    /// do not abort the batch.
    pub async fn add_tags(
        &self,
        paths: impl Into<BulkArgs>,
        tags: impl Into<BulkArgs>,
    ) -> RestClientResult<Value> {
        let body = TagAssignRequest {
            paths: paths.into().0,
            tags: tags.into().0,
            strict: Some(false),
        };
        self.post("tag/bulk", &body, Some(TAG_BULK_CONTENT_TYPE)).await
    }

    /// Rename a tag globally across all paths carrying it.
    pub async fn rename_tag(
        &self,
        tag: impl Into<BulkArgs>,
        new_tag: impl Into<BulkArgs>,
    ) -> RestClientResult<Value> {
        let body = TagRenameRequest {
            tag: tag.into().0,
            new_tag: new_tag.into().0,
        };
        self.post("tag/rename", &body, Some(TAG_RENAME_CONTENT_TYPE)).await
    }

    /// Remove a tag association from specific paths without deleting the
    /// tag definition.
    pub async fn detach_tags(
        &self,
        paths: impl Into<BulkArgs>,
        tags: impl Into<BulkArgs>,
    ) -> RestClientResult<Value> {
        let body = TagAssignRequest {
            paths: paths.into().0,
            tags: tags.into().0,
            strict: None,
        };
        self.post("tag/detach", &body, Some(TAG_DETACH_CONTENT_TYPE)).await
    }

    /// Remove a tag mapping outright. Server-side this is stronger than
    /// detach; the two are distinct calls, not aliases.
    pub async fn purge_tags(
        &self,
        paths: impl Into<BulkArgs>,
        tags: impl Into<BulkArgs>,
    ) -> RestClientResult<Value> {
        let body = TagAssignRequest {
            paths: paths.into().0,
            tags: tags.into().0,
            strict: None,
        };
        self.post("tag/purge", &body, Some(TAG_PURGE_CONTENT_TYPE)).await
    }

    // Asynchronous query protocol

    /// Submit a query. A 200 carries the rows inline (with the job id from
    /// the `SF-Query-Id` header when one was issued anyway); a 202 defers
    /// to asynchronous execution and returns only the job id.
    pub async fn submit_query(
        &self,
        scopes: Option<&[String]>,
        terms: &QueryTerms,
        options: &QueryOptions,
    ) -> RestClientResult<QuerySubmission> {
        let request = QueryRequest::build(scopes, terms, options);
        let response = self.send(Method::POST, "async/query/", Some(&request), None).await?;
        let status = response.status();
        let query_id = response
            .headers()
            .get(QUERY_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let payload: Value = response.json().await?;
        interpret_submission(status, query_id.as_deref(), payload)
    }

    /// Whether an asynchronous query has finished.
    pub async fn query_status(&self, query_id: &str) -> RestClientResult<bool> {
        let status: QueryStatus = self.get(&format!("async/query/{query_id}")).await?;
        Ok(status.is_done)
    }

    /// Fetch the result of a completed query. Not cached server- or
    /// client-side; calling again re-hits the service.
    pub async fn fetch_query_result(&self, query_id: &str) -> RestClientResult<Vec<ResultRow>> {
        let payload: Value = self.get(&format!("async/query_result/{query_id}")).await?;
        decode_result_rows(payload)
    }

    /// Delete a query's server-side result, cancelling it if still running.
    pub async fn delete_query_result(&self, query_id: &str) -> RestClientResult<()> {
        self.delete(&format!("async/query_result/{query_id}")).await
    }

    // Private helper methods

    async fn get<T: DeserializeOwned>(&self, path: &str) -> RestClientResult<T> {
        let response = self.send::<()>(Method::GET, path, None, None).await?;
        Ok(response.json().await?)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        content_type: Option<&'static str>,
    ) -> RestClientResult<T> {
        let response = self.send(Method::POST, path, Some(body), content_type).await?;
        Ok(response.json().await?)
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> RestClientResult<T> {
        let response = self.send(Method::PUT, path, Some(body), None).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, path: &str) -> RestClientResult<()> {
        self.send::<()>(Method::DELETE, path, None, None).await?;
        Ok(())
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        content_type: Option<&'static str>,
    ) -> RestClientResult<Response> {
        let url = self.base_url.join(path)?;
        debug!("{} {}", method, url);

        let mut request = self.http_client.request(method, url).headers(self.auth.headers()?);
        match (body, content_type) {
            // Vendor content-type marker: serialize by hand so the marker is
            // the only content-type on the request.
            (Some(body), Some(content_type)) => {
                request = request
                    .header(CONTENT_TYPE, content_type)
                    .body(serde_json::to_vec(body)?);
            }
            (Some(body), None) => request = request.json(body),
            (None, _) => {}
        }

        let response = request.send().await?;
        Ok(response.error_for_status()?)
    }
}

/// Interpret a submission response: a 202 defers with a job id in the body;
/// any other success carries the rows inline, keeping the header-issued job
/// id when one is present.
fn interpret_submission(
    status: StatusCode,
    query_id_header: Option<&str>,
    payload: Value,
) -> RestClientResult<QuerySubmission> {
    if status == StatusCode::ACCEPTED {
        let deferred: DeferredQuery = serde_json::from_value(payload)?;
        return Ok(QuerySubmission::Deferred {
            query_id: deferred.query_id,
        });
    }
    let rows = decode_result_rows(payload)?;
    Ok(QuerySubmission::Complete {
        query_id: query_id_header.map(str::to_owned),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> StarfishClient {
        StarfishClient::for_host("starfish.example.org", "t0ken").unwrap()
    }

    #[test]
    fn for_host_builds_the_api_base_url() {
        let client = client();
        assert_eq!(client.base_url().as_str(), "https://starfish.example.org/api/");
        assert_eq!(client.auth(), &AuthConfig::Bearer("t0ken".to_string()));
    }

    #[test]
    fn endpoint_paths_join_under_the_api_base() {
        let client = client();
        let url = client.base_url().join("async/query/").unwrap();
        assert_eq!(url.as_str(), "https://starfish.example.org/api/async/query/");
        let url = client.base_url().join("tag/bulk").unwrap();
        assert_eq!(url.as_str(), "https://starfish.example.org/api/tag/bulk");
    }

    #[tokio::test]
    async fn delete_zone_without_id_or_name_fails_before_any_request() {
        let err = client().delete_zone(None, None).await.unwrap_err();
        assert!(matches!(err, RestClientError::InvalidArgument(_)));
    }

    #[test]
    fn accepted_submission_defers_with_the_body_job_id() {
        let outcome =
            interpret_submission(StatusCode::ACCEPTED, None, json!({"query_id": "q-42"}))
                .unwrap();
        assert!(matches!(outcome, QuerySubmission::Deferred { query_id } if query_id == "q-42"));
    }

    #[test]
    fn synchronous_submission_keeps_rows_and_the_header_job_id() {
        let outcome = interpret_submission(
            StatusCode::OK,
            Some("q-7"),
            json!([{"fn": "data", "tags_explicit": []}]),
        )
        .unwrap();
        match outcome {
            QuerySubmission::Complete { query_id, rows } => {
                assert_eq!(query_id.as_deref(), Some("q-7"));
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].file_name.as_deref(), Some("data"));
            }
            other => panic!("expected inline rows, got {other:?}"),
        }
    }

    #[test]
    fn synchronous_submission_without_the_header_has_no_job_id() {
        let outcome = interpret_submission(StatusCode::OK, None, json!([])).unwrap();
        match outcome {
            QuerySubmission::Complete { query_id, rows } => {
                assert!(query_id.is_none());
                assert!(rows.is_empty());
            }
            other => panic!("expected inline rows, got {other:?}"),
        }
    }

    #[test]
    fn synchronous_error_payload_raises_the_logical_query_error() {
        let err = interpret_submission(StatusCode::OK, None, json!({"error": "bad terms"}))
            .unwrap_err();
        assert!(matches!(err, RestClientError::Query { .. }));
    }
}
