use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated user context resolved from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// Access token from the Authorization header.
///
/// Accepts `Bearer <token>` with any casing of the scheme, or a bare token.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;

    let token = match raw.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => raw[7..].trim(),
        _ => raw.trim(),
    };

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Validate the request's token with the managed auth service.
/// `Ok(None)` covers both a missing and a rejected token.
pub async fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Option<AuthUser>, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    let user = state.managed.get_user(&token).await?;
    Ok(user.map(|u| AuthUser { id: u.id, email: u.email }))
}

/// Middleware that rejects requests without a valid access token and injects [`AuthUser`]
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(request.headers(), &state)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Rejected request to {} without a valid token", request.uri().path());
            ApiError::unauthorized("Unauthorized")
        })?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        authenticate(&parts.headers, state)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}
