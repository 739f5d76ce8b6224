use crate::{ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use numthread_core::{AuthEvent, AuthLogger};

/// Rejects requests without a valid bearer token and attaches the caller's
/// `AuthContext` to the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(req.headers()) else {
        return Err(ApiError::Unauthorized("Access token required".into()));
    };

    let auth_context = state.jwt.validate_token(&token).map_err(|err| {
        AuthLogger::log_event(AuthEvent::TokenRejected {
            reason: err.to_string(),
        });
        ApiError::Forbidden("Invalid or expired token".into())
    })?;

    // A well-formed token may name a user this store has never seen.
    if state.store.find_user_by_id(auth_context.user_id).is_none() {
        return Err(ApiError::Unauthorized("User not found".into()));
    }

    req.extensions_mut().insert(auth_context);
    Ok(next.run(req).await)
}

/// The credential is the second whitespace-separated part of the
/// `Authorization` header (`Bearer <token>`).
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_whitespace().nth(1))
        .map(str::to_string)
}
