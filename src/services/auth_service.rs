use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{NewUser, User, UserStatus};
use crate::repository::UserRepository;
use crate::security::{jwt, password};
use crate::services::email_service::mask_for_log;
use crate::services::otp_service::{OtpDispatch, OtpService};
use crate::AppState;

/// Member registration, OTP login and admin password login.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    otp: OtpService,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.repos.users.clone(),
            otp: OtpService::new(state),
            config: state.config.clone(),
        }
    }

    /// Create a PENDING member. One account per email, and per mobile when given.
    pub async fn register(&self, mut input: NewUser) -> Result<User> {
        input.email = input.email.trim().to_lowercase();

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::validation("An account with this email already exists."));
        }
        if let Some(mobile) = input.mobile.as_deref() {
            if self.users.find_by_mobile(mobile).await?.is_some() {
                return Err(AppError::validation(
                    "An account with this mobile number already exists.",
                ));
            }
        }

        let user = self.users.create(&input).await?;
        info!(user_id = %user.id, email = %mask_for_log(&user.email), "member registered; awaiting approval");
        Ok(user)
    }

    /// Only APPROVED members receive a login code.
    pub async fn request_login(&self, email: &str) -> Result<OtpDispatch> {
        let email = email.trim().to_lowercase();
        let user = self.users.find_by_email(&email).await?.ok_or_else(|| {
            AppError::NotFound("No account found with this email. Please register first.".to_string())
        })?;

        match user.status {
            UserStatus::Approved => {}
            UserStatus::Pending => {
                return Err(AppError::Forbidden(
                    "Your account is under verification. You will be able to login once an admin approves (1–2 days)."
                        .to_string(),
                ))
            }
            UserStatus::Rejected | UserStatus::PendingReview => {
                return Err(AppError::Forbidden(
                    "Your account was not approved. Please contact support.".to_string(),
                ))
            }
        }

        self.otp.create_and_send(&user).await
    }

    /// Consume a login code and issue the member's access token.
    pub async fn verify_login(&self, email: &str, code: &str) -> Result<(User, String)> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        self.otp.verify(user.id, &email, code).await?;

        let token = jwt::issue_user_token(&self.config.jwt.secret, user.id, self.config.jwt.expiry_hours)?;
        info!(user_id = %user.id, "member logged in");
        Ok((user, token))
    }

    /// Whitelisted email plus the shared admin password. Returns (email, token).
    pub async fn admin_login(&self, email: &str, password_input: &str) -> Result<(String, String)> {
        let email = email.trim().to_lowercase();
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        if !self.config.admin.email_whitelist().contains(&email) {
            warn!(email = %mask_for_log(&email), "admin login for non-whitelisted email");
            return Err(invalid());
        }
        let hash = self.config.admin.password_hash.trim();
        if hash.is_empty() {
            warn!("admin login attempted but no admin password hash is configured");
            return Err(invalid());
        }

        password::verify_password(password_input, hash)?;

        let token = jwt::issue_admin_token(&self.config.jwt.secret, &email, self.config.admin.expiry_hours)?;
        info!(email = %mask_for_log(&email), "admin logged in");
        Ok((email, token))
    }
}
