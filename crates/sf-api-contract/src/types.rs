// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! API contract types for the Starfish REST service

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Characters left verbatim when escaping the subpath of a scope. Everything
/// else, including `/`, is percent-encoded on the wire.
const SCOPE_PATH_KEEP: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Default row cap for multi-scope async queries.
pub const DEFAULT_QUERY_LIMIT: u64 = 100_000;

/// Row cap used by the deprecated single-scope query path.
pub const LEGACY_QUERY_LIMIT: u64 = 15_000;

/// How long the service attempts synchronous execution before deferring.
pub const DEFAULT_ASYNC_AFTER_SEC: u64 = 5;

/// Output columns requested for every query.
pub const DEFAULT_QUERY_COLUMNS: &[&str] = &[
    "aggrs",
    "rec_aggrs",
    "rec_aggrs.mtime",
    "username",
    "groupname",
    "gid",
    "tags_explicit",
    "tags_inherited",
    "nlinks",
    "errors",
    "type_hum",
    "valid_from",
    "valid_to",
    "cost",
    "total_capacity",
    "logical_size",
    "physical_size",
    "physical_nlinks_size",
    "size_nlinks",
    "entries_count",
    "mode",
    "mode_hum",
    "mount_path",
];

/// Content-type markers for the bulk tag endpoints.
pub const TAG_BULK_CONTENT_TYPE: &str = "application/vnd.sf.tag.bulk+json";
pub const TAG_RENAME_CONTENT_TYPE: &str = "application/vnd.sf.tag.rename+json";
pub const TAG_DETACH_CONTENT_TYPE: &str = "application/vnd.sf.tag.detach+json";
pub const TAG_PURGE_CONTENT_TYPE: &str = "application/vnd.sf.tag.purge+json";

/// A volume name plus optional subpath identifying the filesystem subtree a
/// query runs under. Immutable once constructed; serializes to
/// `"{volume}:{path}"` with the subpath percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryScope {
    volume: String,
    path: String,
}

impl QueryScope {
    pub fn new(volume: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            path: path.into(),
        }
    }

    /// Scope covering a whole volume.
    pub fn volume(volume: impl Into<String>) -> Self {
        Self::new(volume, "")
    }

    pub fn volume_name(&self) -> &str {
        &self.volume
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for QueryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.volume,
            utf8_percent_encode(&self.path, SCOPE_PATH_KEEP)
        )
    }
}

/// Ordered predicate key/value tokens filtering which filesystem entries a
/// query matches. Keys are unique; setting an existing key replaces its
/// value in place, preserving the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms(Vec<(String, String)>);

impl QueryTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single `depth=N` predicate, the most common query shape.
    pub fn depth(depth: u32) -> Self {
        Self::new().with("depth", depth.to_string())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Space-joined `key=value` tokens as the service expects them.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Tuning knobs for query submission. `Default` matches the service
/// defaults; `legacy()` reproduces the row cap of the deprecated
/// single-scope query path.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub limit: u64,
    pub sort_by: Option<String>,
    pub group_by: Option<String>,
    pub async_after_sec: u64,
    pub columns: Vec<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUERY_LIMIT,
            sort_by: None,
            group_by: None,
            async_after_sec: DEFAULT_ASYNC_AFTER_SEC,
            columns: DEFAULT_QUERY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl QueryOptions {
    pub fn legacy() -> Self {
        Self {
            limit: LEGACY_QUERY_LIMIT,
            ..Self::default()
        }
    }
}

/// Body of `POST async/query/`. Several fields are stringly-typed flags;
/// the service parses them from strings, so they are kept that way on the
/// wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub queries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumes_and_paths: Option<Vec<String>>,
    pub limit: u64,
    pub sort_by: Option<String>,
    pub group_by: Option<String>,
    pub async_after_sec: u64,
    pub format: String,
    pub force_tag_inherit: String,
    pub output_format: String,
    pub delimiter: String,
    pub escape_paths: String,
    pub print_headers: String,
    pub size_unit: String,
    pub humanize_nested: String,
    pub mount_agent: String,
}

impl QueryRequest {
    /// Assemble the submission body from a scope list and predicate terms.
    ///
    /// A fresh terms value with `type=d` merged in is built here; the
    /// caller's terms are never mutated, and the serialized query carries
    /// exactly one `type` token.
    pub fn build(scopes: Option<&[String]>, terms: &QueryTerms, options: &QueryOptions) -> Self {
        let terms = terms.clone().with("type", "d");
        Self {
            queries: vec![terms.to_query_string()],
            volumes_and_paths: scopes.map(|s| s.to_vec()),
            limit: options.limit,
            sort_by: options.sort_by.clone(),
            group_by: options.group_by.clone(),
            async_after_sec: options.async_after_sec,
            format: options.columns.join(" "),
            force_tag_inherit: "false".to_string(),
            output_format: "json".to_string(),
            delimiter: ",".to_string(),
            escape_paths: "false".to_string(),
            print_headers: "true".to_string(),
            size_unit: "B".to_string(),
            humanize_nested: "false".to_string(),
            mount_agent: "None".to_string(),
        }
    }
}

/// Body of the 202 response to a deferred query submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredQuery {
    pub query_id: String,
}

/// Completion flag returned by `GET async/query/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatus {
    pub is_done: bool,
}

/// Outcome of a query submission: either the rows arrived inline, or the
/// service deferred to asynchronous execution and handed back a job id.
#[derive(Debug, Clone)]
pub enum QuerySubmission {
    Complete {
        /// Id issued via the `SF-Query-Id` header even for synchronous
        /// results, when present.
        query_id: Option<String>,
        rows: Vec<ResultRow>,
    },
    Deferred {
        query_id: String,
    },
}

/// One matched filesystem entry. The attributes the client interprets are
/// typed; everything else the service returns rides along in `extra`.
/// `tags_explicit` is required: a row without it fails the decode rather
/// than passing an empty tag list into tag-state decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    pub tags_explicit: Vec<String>,
    #[serde(default)]
    pub tags_inherited: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggrs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rec_aggrs: Option<Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Which attribute names an entry: `fn` for ordinary volumes, `full_path`
/// for path-style volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameAttr {
    #[default]
    FileName,
    FullPath,
}

impl FilenameAttr {
    /// Name of the attribute as it appears on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::FileName => "fn",
            Self::FullPath => "full_path",
        }
    }
}

impl ResultRow {
    pub fn filename(&self, attr: FilenameAttr) -> Option<&str> {
        match attr {
            FilenameAttr::FileName => self.file_name.as_deref(),
            FilenameAttr::FullPath => self.full_path.as_deref(),
        }
    }
}

/// Scalar-or-sequence normalization for the bulk tag endpoints: a single
/// path or tag becomes a one-element sequence on the wire, identical to
/// passing the sequence directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkArgs(pub Vec<String>);

impl From<&str> for BulkArgs {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for BulkArgs {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for BulkArgs {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<&[String]> for BulkArgs {
    fn from(value: &[String]) -> Self {
        Self(value.to_vec())
    }
}

impl From<&[&str]> for BulkArgs {
    fn from(value: &[&str]) -> Self {
        Self(value.iter().map(|v| v.to_string()).collect())
    }
}

/// Body of `POST tag/bulk`, `tag/detach`, and `tag/purge`. `strict` is only
/// sent on the bulk (add) endpoint, where `false` keeps unknown paths or
/// tags from aborting the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssignRequest {
    pub paths: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// Body of `POST tag/rename`. Renames apply globally across all paths
/// carrying the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRenameRequest {
    pub tag: Vec<String>,
    pub new_tag: Vec<String>,
}

/// Credentials for `POST auth/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

/// Token issued by `POST auth/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// A storage volume as returned by `GET volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub vol: String,
    #[serde(flatten)]
    pub attributes: HashMap<String, Value>,
}

/// A group or user record from the mapping endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingGroup {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingUser {
    pub uid: u32,
    pub name: String,
}

/// A management zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub managers: Vec<String>,
    #[serde(default)]
    pub managing_groups: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Body of `POST zone` and `PUT zone/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub name: String,
    pub paths: Vec<String>,
    pub managers: Vec<String>,
    pub managing_groups: Vec<String>,
}

/// Execution state of a volume scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanState {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_successful: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One scan record as returned by `GET scan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub volume: String,
    pub creation_time: i64,
    pub state: ScanState,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Envelope of `GET scan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanListResponse {
    pub scans: Vec<Scan>,
}
