// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Authorization header construction

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::error::{RestClientError, RestClientResult};

/// Authorization scheme carried on every request. The primary API expects
/// `Bearer` tokens; the reports/query-download API expects `Key` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    Bearer(String),
    Key(String),
}

impl AuthConfig {
    pub fn token(&self) -> &str {
        match self {
            AuthConfig::Bearer(token) | AuthConfig::Key(token) => token,
        }
    }

    fn header_value(&self) -> String {
        match self {
            AuthConfig::Bearer(token) => format!("Bearer {token}"),
            AuthConfig::Key(token) => format!("Key {token}"),
        }
    }

    /// Headers attached to every request: JSON accept plus the
    /// authorization line.
    pub fn headers(&self) -> RestClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let value = HeaderValue::from_str(&self.header_value()).map_err(|_| {
            RestClientError::Auth("token contains characters not valid in a header".to_string())
        })?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_and_key_schemes_render_distinct_headers() {
        let bearer = AuthConfig::Bearer("t0ken".to_string());
        let key = AuthConfig::Key("t0ken".to_string());

        let headers = bearer.headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer t0ken");
        assert_eq!(headers[ACCEPT], "application/json");

        let headers = key.headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Key t0ken");
    }

    #[test]
    fn control_characters_in_token_are_rejected() {
        let auth = AuthConfig::Bearer("bad\ntoken".to_string());
        assert!(matches!(auth.headers(), Err(RestClientError::Auth(_))));
    }
}
