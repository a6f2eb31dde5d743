// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Reporting tag policy
//!
//! Walks the immediate subdirectories of a scope, finds the ones the
//! `Reporting:` namespace has not been attached to yet, narrows them by the
//! historical selection rule, and tags each survivor through the bulk tag
//! endpoint. The policy is generic over [`TaggingApi`] so it can run
//! against a scripted client in tests.

use async_trait::async_trait;
use sf_api_contract::{FilenameAttr, QueryScope, ResultRow};
use sf_rest_client::{RestClientError, RestClientResult, StarfishClient};
use tracing::info;

/// Sentinel tag namespace marking an entry as already processed.
pub const REPORTING_NAMESPACE: &str = "Reporting:";

/// The two client calls the policy drives.
#[async_trait]
pub trait TaggingApi {
    async fn subfolder_size_query(&self, scope: &QueryScope) -> RestClientResult<Vec<ResultRow>>;
    async fn add_tag(&self, path: &str, tag: &str) -> RestClientResult<()>;
}

#[async_trait]
impl TaggingApi for StarfishClient {
    async fn subfolder_size_query(&self, scope: &QueryScope) -> RestClientResult<Vec<ResultRow>> {
        StarfishClient::subfolder_size_query(self, scope).await
    }

    async fn add_tag(&self, path: &str, tag: &str) -> RestClientResult<()> {
        self.add_tags(path, tag).await.map(|_| ())
    }
}

/// Applies the reporting tag policy through a client.
#[derive(Debug)]
pub struct ReportingTagger<'a, C: TaggingApi> {
    client: &'a C,
}

impl<'a, C: TaggingApi> ReportingTagger<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Tag every selected untagged subdirectory of `volume`/`path` with
    /// `Reporting:{name}`. The first mutator error aborts the remaining
    /// iterations; entries already tagged are left alone.
    pub async fn add_reporting_tags(
        &self,
        volume: &str,
        path: &str,
        fn_attr: FilenameAttr,
        blacklist: &[String],
    ) -> RestClientResult<()> {
        let scope = QueryScope::new(volume, path);
        let rows = self.client.subfolder_size_query(&scope).await?;
        let filenames = untagged_filenames(&rows, fn_attr)?;
        let filenames = filter_filenames(filenames, blacklist);
        for name in filenames {
            info!("adding reporting tag for {}...", name);
            self.client
                .add_tag(&format!("{volume}:{name}"), &format!("{REPORTING_NAMESPACE}{name}"))
                .await?;
        }
        Ok(())
    }
}

/// Names of entries with no explicit tag in the `Reporting:` namespace.
/// A selected row that lacks the requested filename attribute fails the
/// whole selection; a row the service cannot name cannot be tagged.
pub fn untagged_filenames(
    rows: &[ResultRow],
    attr: FilenameAttr,
) -> RestClientResult<Vec<String>> {
    rows.iter()
        .filter(|row| !row.tags_explicit.iter().any(|tag| tag.contains(REPORTING_NAMESPACE)))
        .map(|row| {
            row.filename(attr)
                .map(str::to_owned)
                .ok_or(RestClientError::MissingAttribute(attr.wire_name()))
        })
        .collect()
}

/// Historical selection rule: keep hidden names, `systemd*`, the literal
/// `mmfs`, and anything in `blacklist`. Despite the parameter name, listed
/// names are tagged, not skipped; that is the behavior every observed
/// deployment relies on.
pub fn filter_filenames(filenames: Vec<String>, blacklist: &[String]) -> Vec<String> {
    filenames
        .into_iter()
        .filter(|name| {
            name.starts_with('.')
                || name.starts_with("systemd")
                || name == "mmfs"
                || blacklist.iter().any(|entry| entry == name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_rest_client::RestClientError;
    use std::sync::Mutex;

    struct ScriptedClient {
        rows: Vec<ResultRow>,
        added: Mutex<Vec<(String, String)>>,
        fail_adds: bool,
    }

    impl ScriptedClient {
        fn new(rows: Vec<ResultRow>) -> Self {
            Self {
                rows,
                added: Mutex::new(Vec::new()),
                fail_adds: false,
            }
        }

        fn with_failing_adds(rows: Vec<ResultRow>) -> Self {
            Self {
                fail_adds: true,
                ..Self::new(rows)
            }
        }

        fn added(&self) -> Vec<(String, String)> {
            self.added.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaggingApi for ScriptedClient {
        async fn subfolder_size_query(
            &self,
            _scope: &QueryScope,
        ) -> RestClientResult<Vec<ResultRow>> {
            Ok(self.rows.clone())
        }

        async fn add_tag(&self, path: &str, tag: &str) -> RestClientResult<()> {
            if self.fail_adds {
                return Err(RestClientError::InvalidArgument("simulated".to_string()));
            }
            self.added.lock().unwrap().push((path.to_string(), tag.to_string()));
            Ok(())
        }
    }

    fn row(name: &str, tags: &[&str]) -> ResultRow {
        ResultRow {
            file_name: Some(name.to_string()),
            tags_explicit: tags.iter().map(|t| t.to_string()).collect(),
            ..ResultRow::default()
        }
    }

    #[tokio::test]
    async fn unselected_and_already_tagged_entries_produce_no_adds() {
        let client = ScriptedClient::new(vec![
            row("a", &[]),
            row("b", &["Reporting:b"]),
        ]);
        ReportingTagger::new(&client)
            .add_reporting_tags("kappa", "", FilenameAttr::FileName, &[])
            .await
            .unwrap();
        assert!(client.added().is_empty());
    }

    #[tokio::test]
    async fn hidden_untagged_entry_gets_one_reporting_tag() {
        let client = ScriptedClient::new(vec![row(".hidden", &[])]);
        ReportingTagger::new(&client)
            .add_reporting_tags("kappa", "", FilenameAttr::FileName, &[])
            .await
            .unwrap();
        assert_eq!(
            client.added(),
            vec![("kappa:.hidden".to_string(), "Reporting:.hidden".to_string())]
        );
    }

    #[tokio::test]
    async fn blacklisted_names_are_tagged_not_skipped() {
        let client = ScriptedClient::new(vec![row("alice", &[]), row("bob", &[])]);
        ReportingTagger::new(&client)
            .add_reporting_tags("homedir", "", FilenameAttr::FileName, &["alice".to_string()])
            .await
            .unwrap();
        assert_eq!(
            client.added(),
            vec![("homedir:alice".to_string(), "Reporting:alice".to_string())]
        );
    }

    #[tokio::test]
    async fn first_add_failure_aborts_the_run() {
        let client = ScriptedClient::with_failing_adds(vec![row(".a", &[]), row(".b", &[])]);
        let err = ReportingTagger::new(&client)
            .add_reporting_tags("kappa", "", FilenameAttr::FileName, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RestClientError::InvalidArgument(_)));
        assert!(client.added().is_empty());
    }

    #[test]
    fn untagged_selection_uses_substring_namespace_match() {
        let rows = vec![
            row("plain", &[]),
            row("tagged", &["Reporting:tagged"]),
            row("other-ns", &["Backup:other-ns"]),
        ];
        let names = untagged_filenames(&rows, FilenameAttr::FileName).unwrap();
        assert_eq!(names, vec!["plain".to_string(), "other-ns".to_string()]);
    }

    #[test]
    fn full_path_attribute_selects_path_style_volumes() {
        let rows = vec![ResultRow {
            full_path: Some("archive/migrate/.x".to_string()),
            ..ResultRow::default()
        }];
        let names = untagged_filenames(&rows, FilenameAttr::FullPath).unwrap();
        assert_eq!(names, vec!["archive/migrate/.x".to_string()]);
    }

    #[test]
    fn selected_row_without_the_attribute_fails_the_selection() {
        let rows = vec![row(".present", &[]), ResultRow::default()];
        let err = untagged_filenames(&rows, FilenameAttr::FileName).unwrap_err();
        assert!(matches!(err, RestClientError::MissingAttribute("fn")));
        // Tagged rows never need naming; only selected rows are required to
        // carry the attribute.
        let tagged = vec![ResultRow {
            tags_explicit: vec!["Reporting:x".to_string()],
            ..ResultRow::default()
        }];
        assert!(untagged_filenames(&tagged, FilenameAttr::FileName).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unnameable_row_aborts_the_run_before_any_add() {
        let client = ScriptedClient::new(vec![row(".a", &[]), ResultRow::default()]);
        let err = ReportingTagger::new(&client)
            .add_reporting_tags("kappa", "", FilenameAttr::FileName, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RestClientError::MissingAttribute("fn")));
        assert!(client.added().is_empty());
    }

    #[test]
    fn selection_rule_keeps_hidden_systemd_mmfs_and_blacklisted() {
        let names = vec![
            ".bashrc".to_string(),
            "systemd-private".to_string(),
            "mmfs".to_string(),
            "mmfs2".to_string(),
            "data".to_string(),
            "listed".to_string(),
        ];
        let kept = filter_filenames(names, &["listed".to_string()]);
        assert_eq!(
            kept,
            vec![
                ".bashrc".to_string(),
                "systemd-private".to_string(),
                "mmfs".to_string(),
                "listed".to_string(),
            ]
        );
    }
}
