//! Resolves a request to the caller's user identity.
//!
//! Tokens are minted by the external auth layer with the shared
//! `JWT_SECRET`. HTTP callers send `Authorization: Bearer <jwt>`; the device
//! WebSocket passes `?token=<jwt>` since browsers can't set upgrade headers.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;

use crate::{config::Config, error::AppErr, utils::jwt};

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

#[derive(Deserialize)]
struct TokenQuery { token: Option<String> }

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppErr;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cfg = parts
            .extensions
            .get::<Arc<Config>>()
            .cloned()
            .ok_or(AppErr::Unauthorized)?;

        let token = bearer(parts).or_else(|| {
            Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.token)
        });

        token
            .and_then(|t| jwt::verify(&t, &cfg.jwt_secret))
            .map(AuthUser)
            .ok_or(AppErr::Unauthorized)
    }
}

fn bearer(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}
