//! Caller identity resolution.
//!
//! Session transport lives upstream: the gateway authenticates the browser
//! and forwards the account id (and, for not-yet-authenticated browsers,
//! the anonymous donor token) as trusted headers. This module turns those
//! headers into the explicit [`AuthContext`] every domain operation takes.

use axum::http::HeaderMap;
use givers_core::{AuthContext, DomainError, User};
use sqlx::SqlitePool;

use crate::db;
use crate::errors::Result;

pub const USER_HEADER: &str = "x-user-id";
pub const TOKEN_HEADER: &str = "x-donor-token";

/// Resolve the authenticated account, or fail with `Forbidden` when the
/// request carries no identity.
pub async fn current_user(pool: &SqlitePool, headers: &HeaderMap) -> Result<User> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(DomainError::Forbidden)?;
    let user = db::get_user(pool, user_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("user", user_id.to_string()))?;
    Ok(user)
}

pub fn auth_context(user: &User) -> AuthContext {
    AuthContext::new(user.id.clone(), user.role)
}

/// Resolve the account when an identity header is present, `None` for
/// anonymous callers. Unlike [`current_user`] this only fails when the
/// header names an unknown account.
pub async fn optional_user(pool: &SqlitePool, headers: &HeaderMap) -> Result<Option<User>> {
    if headers.get(USER_HEADER).is_none() {
        return Ok(None);
    }
    current_user(pool, headers).await.map(Some)
}

/// The browser-local anonymous token, if the gateway forwarded one.
pub fn donor_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
