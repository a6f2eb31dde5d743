// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Starfish REST API contract types
//!
//! This crate defines the request and response schema for the Starfish
//! storage-analytics service: query scopes and predicate terms, the
//! asynchronous query submission body, result rows, bulk tag operations,
//! zones, volumes, and scan records. These types are shared between the
//! REST client and the reporting tag policy.

pub mod error;
pub mod scans;
pub mod types;

pub use error::*;
pub use types::*;
