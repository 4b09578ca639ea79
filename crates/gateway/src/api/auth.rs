//! `POST /auth/sign-in` and `POST /auth/signout`.
//!
//! Both answer with a 301 redirect to a page of the web client; failures are
//! reported through the redirect target rather than an error body.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use gw_backend::AuthSession;
use serde::Deserialize;

use crate::pipeline::session::access_token;
use crate::state::AppState;

pub const SIGN_IN_FAILED_LOCATION: &str = "/login?error=Invalid%20credentials";
pub const SIGN_OUT_FAILED_LOCATION: &str = "/error?message=Could%20not%20sign%20out";

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

// ── Cookies ─────────────────────────────────────────────────────────

fn session_cookie(name: &str, value: &str, max_age: Option<u64>) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(secs) = max_age {
        cookie.push_str(&format!("; Max-Age={secs}"));
    }
    cookie
}

fn cleared_cookie(name: &str) -> String {
    session_cookie(name, "", Some(0))
}

fn redirect(location: &str, cookies: Vec<String>) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(location) {
        headers.insert(LOCATION, v);
    }
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(v) => {
                headers.append(SET_COOKIE, v);
            }
            Err(e) => tracing::warn!(error = %e, "dropping unencodable cookie"),
        }
    }
    (StatusCode::MOVED_PERMANENTLY, headers).into_response()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn sign_in(
    State(state): State<AppState>,
    form: Result<Form<SignInForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "sign-in form rejected");
            return redirect(SIGN_IN_FAILED_LOCATION, Vec::new());
        }
    };

    match state.auth.sign_in_with_password(&form.email, &form.password).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "signed in");
            redirect("/", issue_cookies(&state, &session))
        }
        Err(e) => {
            tracing::warn!(error = %e, "sign-in failed");
            redirect(SIGN_IN_FAILED_LOCATION, Vec::new())
        }
    }
}

fn issue_cookies(state: &AppState, session: &AuthSession) -> Vec<String> {
    let backend = &state.config.backend;
    let mut cookies = vec![session_cookie(
        &backend.access_cookie,
        &session.access_token,
        session.expires_in,
    )];
    if !session.refresh_token.is_empty() {
        cookies.push(session_cookie(&backend.refresh_cookie, &session.refresh_token, None));
    }
    cookies
}

pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let backend = &state.config.backend;
    let cleared = vec![
        cleared_cookie(&backend.access_cookie),
        cleared_cookie(&backend.refresh_cookie),
    ];

    let Some(token) = access_token(&headers, &backend.access_cookie) else {
        return redirect("/login", cleared);
    };

    match state.auth.sign_out(&token).await {
        Ok(()) => redirect("/login", cleared),
        // The token was already rejected upstream; the session is gone either way.
        Err(e) if e.is_auth() => {
            tracing::debug!(error = %e, "sign-out of an invalid session");
            redirect("/login", cleared)
        }
        Err(e) => {
            tracing::error!(error = %e, "sign-out failed");
            redirect(SIGN_OUT_FAILED_LOCATION, Vec::new())
        }
    }
}
