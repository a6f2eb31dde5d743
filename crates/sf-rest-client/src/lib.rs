// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! REST API client for the Starfish storage-analytics service
//!
//! This crate issues authenticated HTTP requests against a Starfish host to
//! query filesystem metadata (volumes, directories, tags, scans) and to
//! mutate tag state. Queries run through an asynchronous submission
//! protocol: a `POST` either returns rows immediately or hands back a job
//! id, which [`query::wait_for_result`] polls to completion.
//!
//! ## Design Principles
//!
//! The client holds only an immutable base URL and auth token; every
//! operation is a single request with no retries, caching, or concurrent
//! in-flight calls. Errors propagate to the caller on first failure.

pub mod auth;
pub mod client;
pub mod error;
pub mod query;
pub mod reports;

pub use auth::*;
pub use client::*;
pub use error::*;
pub use query::{wait_for_result, PollOptions, QueryApi};
pub use reports::ReportsClient;
