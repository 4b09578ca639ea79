//! Session verification: the `Session` extractor.
//!
//! Handlers opt in by taking `session: Session` as their first argument.
//! Credentials are read from `Authorization: Bearer <token>`, then from the
//! access-token cookie. One auth lookup per request, no retry; any failure
//! rejects with 401 before the handler body runs.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use gw_backend::{AuthUser, DataStore};
use gw_domain::trace::TraceEvent;

use crate::pipeline::error::ApiError;
use crate::state::AppState;

/// The verified caller plus a data store handle acting as them.
pub struct Session {
    pub user: AuthUser,
    pub access_token: String,
    pub store: Arc<dyn DataStore>,
}

impl Session {
    pub fn actor_id(&self) -> &str {
        &self.user.id
    }
}

/// The value of cookie `name`, if the request carries it.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_owned())
}

/// The caller's access token: bearer header first, then the cookie.
pub fn access_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    match bearer {
        Some(token) => Some(token.to_owned()),
        None => cookie_value(headers, cookie_name).filter(|t| !t.is_empty()),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = access_token(&parts.headers, &state.config.backend.access_cookie)
        else {
            tracing::debug!(path = %parts.uri.path(), "no session credentials");
            return Err(ApiError::Unauthorized);
        };

        let user = match state.auth.get_user(&token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), error = %e, "session verification failed");
                return Err(ApiError::Unauthorized);
            }
        };

        TraceEvent::SessionVerified {
            actor_id: user.id.clone(),
        }
        .emit();

        let store = state.store.connect(&token);
        Ok(Session {
            user,
            access_token: token,
            store,
        })
    }
}
