use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::i18n::Locale;
use crate::storage::act_as;
use crate::types::AuthUser;

pub const SESSION_COOKIE: &str = "sole-access-token";
pub const LOGIN_PATH: &str = "/login";

/// Path prefixes that need a signed-in agent, with or without a locale prefix.
pub const PROTECTED_PREFIXES: &[&str] = &["/missions", "/dashboard", "/logs", "/settings", "/profile"];

/// Routes that never get a locale prefix.
const UNLOCALIZED_PREFIXES: &[&str] = &["/health", "/session", "/signup", "/logout"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Signed-in agent, placed in request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

pub struct RouteGuard;

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

impl RouteGuard {
    /// Splits `/zh-TW/missions` into the locale and `/missions`.
    pub fn split_locale(path: &str) -> (Option<Locale>, &str) {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let (first, rest) = match trimmed.find('/') {
            Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
            None => (trimmed, "/"),
        };

        match Locale::parse(first) {
            Some(locale) if !first.is_empty() => (Some(locale), rest),
            _ => (None, path),
        }
    }

    pub fn requires_session(path: &str) -> bool {
        let (_, rest) = Self::split_locale(path);
        PROTECTED_PREFIXES.iter().any(|p| matches_prefix(rest, p))
    }

    pub fn evaluate(path: &str, authenticated: bool) -> GuardDecision {
        if authenticated || !Self::requires_session(path) {
            return GuardDecision::Allow;
        }

        match Self::split_locale(path) {
            (Some(locale), _) => GuardDecision::Redirect(format!("/{}{}", locale.tag(), LOGIN_PATH)),
            (None, _) => GuardDecision::Redirect(LOGIN_PATH.to_string()),
        }
    }

    /// Default-locale form of a page path that has no locale prefix yet.
    pub fn localize(path: &str) -> Option<String> {
        if Self::split_locale(path).0.is_some()
            || UNLOCALIZED_PREFIXES.iter().any(|p| matches_prefix(path, p))
        {
            return None;
        }

        let default = Locale::default().tag();
        if path == "/" || path.is_empty() {
            Some(format!("/{}", default))
        } else {
            Some(format!("/{}{}", default, path))
        }
    }
}

/// Bearer header first, then the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

pub fn cleared_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Redirects anonymous visitors away from protected pages. Signed-in
/// requests run with the agent in extensions and storage acting as them.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !RouteGuard::requires_session(&path) {
        return next.run(request).await;
    }

    let token = access_token(request.headers());
    let user = match &token {
        Some(token) => match state.auth.current_user(token).await {
            Ok(user) => user,
            Err(e) => {
                log::warn!("session lookup failed for {}: {}", path, e);
                return ApiError::from(e).into_response();
            }
        },
        None => None,
    };

    match RouteGuard::evaluate(&path, user.is_some()) {
        GuardDecision::Allow => {
            if let Some(user) = user {
                request.extensions_mut().insert(CurrentUser(user));
            }
            act_as(token, next.run(request)).await
        }
        GuardDecision::Redirect(location) => {
            log::debug!("redirecting unauthenticated request for {} to {}", path, location);
            Redirect::to(&location).into_response()
        }
    }
}
