//! Hosted auth service client (`/auth/v1`).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gw_domain::error::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::auth::{AuthProvider, AuthSession, AuthUser};
use crate::hosted::{from_reqwest, HostedClient};

pub struct HostedAuth {
    client: Arc<HostedClient>,
}

impl HostedAuth {
    pub fn new(client: Arc<HostedClient>) -> Self {
        Self { client }
    }
}

/// Token endpoint response. `expires_at` arrives as unix seconds.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(t: TokenResponse) -> Self {
        AuthSession {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_in: t.expires_in,
            expires_at: t
                .expires_at
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            user: t.user,
        }
    }
}

#[async_trait]
impl AuthProvider for HostedAuth {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        let url = self.client.url("/auth/v1/user");
        let rb = self
            .client
            .decorate(self.client.http().get(&url), Some(access_token));
        let resp = self.client.execute("GET /auth/v1/user", rb).await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Backend(format!("failed to parse user response: {e}")))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let url = self.client.url("/auth/v1/token?grant_type=password");
        let rb = self.client.decorate(
            self.client
                .http()
                .post(&url)
                .json(&serde_json::json!({ "email": email, "password": password })),
            None,
        );
        let resp = self
            .client
            .send("POST /auth/v1/token?grant_type=password", rb)
            .await?;

        // Wrong credentials come back as 400 invalid_grant.
        let status = resp.status();
        let body = resp.text().await.map_err(from_reqwest)?;
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth(format!("sign-in rejected ({}): {body}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(Error::Backend(format!(
                "POST /auth/v1/token returned {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Backend(format!("failed to parse token response: {e}")))?;
        Ok(token.into())
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.client.url("/auth/v1/logout");
        let rb = self
            .client
            .decorate(self.client.http().post(&url), Some(access_token));
        self.client.execute("POST /auth/v1/logout", rb).await?;
        Ok(())
    }
}
