// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session authentication middleware.
//!
//! Accepts `Authorization: Token <token>` or `Authorization: Bearer <token>`.
//! On success the authenticated [`User`] is inserted into the request
//! extensions for handlers to extract.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use hookrelay_core::types::User;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Pull the session token out of the `Authorization` header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_session(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = session_token(request.headers()) else {
        return Err(ApiError::Unauthenticated);
    };

    let user: User = state
        .provisioner
        .authenticate_session(token)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    tracing::debug!(user_id = user.id, "session authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn token_and_bearer_schemes_are_accepted() {
        assert_eq!(session_token(&headers("Token abc123")), Some("abc123"));
        assert_eq!(session_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(session_token(&headers("bearer abc123")), Some("abc123"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_rejected() {
        assert_eq!(session_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(session_token(&headers("Token ")), None);
        assert_eq!(session_token(&headers("abc123")), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
