mod admin;
mod auth;
mod home;
mod media;
mod options;
mod posts;
mod profile;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    middleware::from_fn_with_state,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::{require_admin, require_user};
use crate::services::page_offset;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

/// Everything under `/api`. Member routes require an approved user's JWT;
/// admin routes (except login) require an admin JWT or the static key.
pub fn routes(state: AppState) -> Router<AppState> {
    let user_guard = from_fn_with_state(state.clone(), require_user);
    let admin_guard = from_fn_with_state(state, require_admin);

    Router::new()
        .nest("/auth", auth::public_routes().merge(auth::member_routes().layer(user_guard.clone())))
        .nest("/admin", admin::public_routes().merge(admin::routes().layer(admin_guard)))
        .nest("/profile", profile::routes().layer(user_guard.clone()))
        .nest("/posts", posts::routes().layer(user_guard.clone()))
        .nest("/home", home::routes().layer(user_guard.clone()))
        .nest("/media", media::routes().layer(user_guard))
        .nest("/options", options::routes())
}

/// Success envelope: `{ "ok": true, ...data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    ok: bool,
    #[serde(flatten)]
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { ok: true, data })
    }

    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Self::ok(data))
    }
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

/// JSON body whose rejections answer with the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections answer with the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Page from 1, limit within 1..=`max_limit`; out-of-range values are rejected.
    pub fn resolve(&self, max_limit: i64) -> Result<(i64, i64)> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(AppError::validation("page must be at least 1"));
        }
        if !(1..=max_limit).contains(&limit) {
            return Err(AppError::validation(format!("limit must be between 1 and {max_limit}")));
        }
        page_offset(page, limit)?;
        Ok((page, limit))
    }
}

/// Positive integer path id, or 400 with `message`.
pub fn parse_id(raw: &str, message: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim, mapping blank to `None`.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
