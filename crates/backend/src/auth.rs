//! The [`AuthProvider`] trait: the auth collaborator's surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gw_domain::error::Result;
use serde::{Deserialize, Serialize};

/// The authenticated actor behind an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by a successful password sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of `access_token` in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

/// Implementations may talk to the hosted auth API or hold accounts in
/// memory. Rejected credentials surface as `Error::Auth`; anything else
/// (transport, 5xx) as another variant.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve an access token to its user.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser>;

    /// Exchange an email and password for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}
