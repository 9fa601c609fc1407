use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::AppError;
use crate::models::User;
use crate::security::{admin_key::key_matches, jwt::decode_token};
use crate::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const ADMIN_KEY_IDENTITY: &str = "admin-key";

/// Authenticated, approved member for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Acting admin: the JWT email, or `admin-key` for static-key access.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub identity: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let claims = decode_token(&state.config.jwt.secret, token)?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    let user = state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if !user.is_approved() {
        return Err(AppError::Forbidden("Account not approved".to_string()));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Admin JWT first, then the static key from `X-Admin-Key` or the bearer slot.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();
    let bearer = bearer_token(headers);

    let from_jwt = bearer
        .and_then(|token| decode_token(&state.config.jwt.secret, token).ok())
        .and_then(|claims| claims.admin_email().map(str::to_string));

    let identity = match from_jwt {
        Some(email) => email,
        None => {
            let expected = &state.config.admin.api_key;
            let presented = headers
                .get(ADMIN_KEY_HEADER)
                .and_then(|h| h.to_str().ok())
                .or(bearer);
            match presented {
                Some(key) if key_matches(expected, key) => ADMIN_KEY_IDENTITY.to_string(),
                _ => {
                    debug!(path = %request.uri().path(), "admin authentication failed");
                    return Err(AppError::Unauthorized(
                        "Unauthorized. Use header X-Admin-Key: <your key> or Authorization: Bearer <your key>"
                            .to_string(),
                    ));
                }
            }
        }
    };

    request.extensions_mut().insert(CurrentAdmin { identity });
    Ok(next.run(request).await)
}
