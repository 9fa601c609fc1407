use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{trimmed, ApiJson, ApiResponse};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{NewUser, User, UserStatus};
use crate::security::otp::is_six_digits;
use crate::services::AuthService;
use crate::AppState;

const REGISTERED_MESSAGE: &str =
    "Your registration is under admin verification (1–2 days). You will be notified once approved.";

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login-request", post(login_request))
        .route("/verify-otp", post(verify_otp))
}

pub fn member_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// The member fields safe to hand back to the member themselves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for SafeUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            status: user.status,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    #[validate(length(max = 20))]
    pub dob: Option<String>,
    #[validate(email, length(max = 191))]
    pub email: String,
    #[validate(length(min = 10, max = 20))]
    pub mobile: String,
    #[validate(length(max = 80))]
    pub occupation: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub location: String,
    #[validate(length(max = 80))]
    pub community: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub kulam: String,
    #[validate(length(max = 500))]
    pub profile_photo: Option<String>,
    #[validate(length(max = 40))]
    pub govt_id_type: Option<String>,
    #[validate(length(max = 500))]
    pub govt_id_file: Option<String>,
}

impl RegisterRequest {
    fn trim(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            gender: trimmed(self.gender),
            dob: trimmed(self.dob),
            email: self.email.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            occupation: trimmed(self.occupation),
            location: self.location.trim().to_string(),
            community: trimmed(self.community),
            kulam: self.kulam.trim().to_string(),
            profile_photo: trimmed(self.profile_photo),
            govt_id_type: trimmed(self.govt_id_type),
            govt_id_file: trimmed(self.govt_id_file),
        }
    }

    fn into_new_user(self) -> Result<NewUser> {
        let dob = match self.dob.as_deref() {
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| AppError::validation("dob must be a date in YYYY-MM-DD format"))?,
            ),
            None => None,
        };
        Ok(NewUser {
            full_name: self.full_name,
            gender: self.gender,
            dob,
            email: self.email,
            mobile: Some(self.mobile),
            occupation: self.occupation,
            location: Some(self.location),
            community: self.community,
            kulam: Some(self.kulam),
            profile_photo: self.profile_photo,
            govt_id_type: self.govt_id_type,
            govt_id_file: self.govt_id_file,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: SafeUser,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>)> {
    let payload = payload.trim();
    payload.validate()?;

    let user = AuthService::new(&state).register(payload.into_new_user()?).await?;

    Ok(ApiResponse::created(RegisterResponse {
        message: REGISTERED_MESSAGE,
        user: SafeUser::from(&user),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email, length(max = 191))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequestResponse {
    pub message: &'static str,
}

async fn login_request(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginRequestResponse>>> {
    payload.validate()?;

    let dispatch = AuthService::new(&state).request_login(&payload.email).await?;

    Ok(ApiResponse::ok(LoginRequestResponse {
        message: dispatch.message(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email, length(max = 191))]
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub access_token: String,
    pub user: SafeUser,
}

async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<VerifyOtpResponse>>> {
    payload.validate()?;
    if !is_six_digits(&payload.otp) {
        return Err(AppError::validation("OTP must be exactly 6 digits"));
    }

    let (user, access_token) = AuthService::new(&state)
        .verify_login(&payload.email, &payload.otp)
        .await?;

    Ok(ApiResponse::ok(VerifyOtpResponse {
        access_token,
        user: SafeUser::from(&user),
    }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: SafeUser,
}

async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<ApiResponse<MeResponse>> {
    ApiResponse::ok(MeResponse {
        user: SafeUser::from(&user),
    })
}
