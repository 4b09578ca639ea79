//! Shared HTTP plumbing for the hosted auth service and data API.

use std::time::{Duration, Instant};

use gw_domain::config::BackendConfig;
use gw_domain::error::{Error, Result};
use gw_domain::trace::TraceEvent;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection to one hosted backend project.
///
/// Created once at startup and shared by the auth client and every
/// per-request store handle. The underlying `reqwest::Client` maintains a
/// connection pool.
#[derive(Debug, Clone)]
pub struct HostedClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl HostedClient {
    /// Build a new client from the `[backend]` config table.
    ///
    /// The anon key comes from `anon_key`, then from the `anon_key_env`
    /// environment variable.
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let anon_key = match &cfg.anon_key {
            Some(key) => key.clone(),
            None => std::env::var(&cfg.anon_key_env).map_err(|_| {
                Error::Config(format!(
                    "backend anon key missing: set backend.anon_key or {}",
                    cfg.anon_key_env
                ))
            })?,
        };
        Self::with_key(&cfg.url, anon_key, Duration::from_millis(cfg.timeout_ms))
    }

    pub fn with_key(url: &str, anon_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.into(),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Build the full URL for a path like `/rest/v1/projects`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Attach the project key and the caller's bearer token. Without a
    /// token the anon key doubles as the bearer, which is what the hosted
    /// API expects for unauthenticated calls.
    pub fn decorate(&self, rb: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        rb.header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
            .header("X-Client-Info", "groundwork")
            .header("X-Request-Id", Uuid::new_v4().to_string())
    }

    /// Send a single request and emit a `BackendCall` trace event. No
    /// retry: a failed write is reported to the caller as-is.
    pub async fn send(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = rb.send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = match &result {
            Ok(resp) => resp.status().as_u16(),
            Err(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
        };
        TraceEvent::BackendCall {
            endpoint: endpoint.to_owned(),
            status,
            duration_ms,
        }
        .emit();

        result.map_err(from_reqwest)
    }

    /// [`send`](Self::send), then map non-2xx responses to errors:
    /// 401/403 become `Error::Auth`, everything else `Error::Backend`.
    pub async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let resp = self.send(endpoint, rb).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!(
                "{endpoint} auth failed ({}): {body}",
                status.as_u16()
            )));
        }
        Err(Error::Backend(format!(
            "{endpoint} returned {}: {body}",
            status.as_u16()
        )))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
