//! Thin HTTP client for the hosted auth/database provider.
//!
//! The provider speaks a GoTrue-style auth API under `/auth/v1` and a
//! PostgREST-style table API under `/rest/v1`. Both the auth provider and the
//! storage implementation share this client.

use anyhow::{anyhow, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct HostedClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl HostedClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Request carrying the public API key, authorized as the anonymous role.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Request carrying the public API key, authorized as the given user.
    pub fn user_request(&self, method: Method, url: &str, access_token: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", access_token))
    }
}

/// Passes successful responses through; otherwise extracts the provider's
/// error message so it can be shown verbatim.
pub async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await?;
    Err(anyhow!(error_message(status.as_u16(), &body)))
}

pub fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| format!("backend error {}: {}", status, body)),
        Err(_) if body.trim().is_empty() => format!("backend error {}", status),
        Err(_) => format!("backend error {}: {}", status, body),
    }
}
