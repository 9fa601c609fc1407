// One-time email codes for member login
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::config::OtpConfig;
use crate::error::{AppError, Result};
use crate::models::{NewOtp, Otp, User};
use crate::repository::OtpRepository;
use crate::security::otp::{generate_code, hash_code, hashes_match};
use crate::services::email_service::{mask_for_log, Mailer, OutgoingMail};
use crate::AppState;

/// Why a presented code was refused. Every kind surfaces as a 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("OTP not found. Please request a new OTP.")]
    NotFound,
    #[error("OTP already used. Please request a new OTP.")]
    AlreadyUsed,
    #[error("OTP expired.")]
    Expired,
    #[error("Invalid OTP.")]
    InvalidCode,
}

/// Result of a login-code request. Both answer the client with success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpDispatch {
    Sent,
    /// A code was issued within the resend cooldown; nothing was stored or sent.
    Throttled,
}

impl OtpDispatch {
    pub fn message(&self) -> &'static str {
        match self {
            OtpDispatch::Sent => "OTP sent to your email.",
            OtpDispatch::Throttled => "OTP recently sent. Please wait before requesting again.",
        }
    }
}

pub struct OtpService {
    otps: Arc<dyn OtpRepository>,
    mailer: Arc<dyn Mailer>,
    config: OtpConfig,
}

impl OtpService {
    pub fn new(state: &AppState) -> Self {
        Self {
            otps: state.repos.otps.clone(),
            mailer: state.mailer.clone(),
            config: state.config.otp.clone(),
        }
    }

    /// Issue and mail a fresh code to an approved user.
    ///
    /// The cooldown check, the invalidation of older codes and the insert are
    /// one repository call. A mail failure is reported to the caller.
    pub async fn create_and_send(&self, user: &User) -> Result<OtpDispatch> {
        let email = user.email.trim().to_lowercase();
        let now = Utc::now();

        let code = generate_code();
        let new_otp = NewOtp {
            user_id: user.id,
            otp_hash: hash_code(&self.config.hash_pepper, &email, &code),
            expires_at: now + Duration::minutes(self.config.expires_minutes),
            created_at: now,
        };
        let cooldown_since = now - Duration::seconds(self.config.resend_cooldown_seconds);

        let Some(otp) = self.otps.issue(&new_otp, cooldown_since).await? else {
            info!(user_id = %user.id, "OTP requested within cooldown; not resending");
            return Ok(OtpDispatch::Throttled);
        };

        if self.config.log_for_dev {
            warn!(user_id = %user.id, code = %code, "OTP issued (development logging enabled)");
        }

        let mail = OutgoingMail::otp(&email, &code, self.config.expires_minutes);
        if let Err(e) = self.mailer.send(mail).await {
            error!(
                user_id = %user.id,
                otp_id = %otp.id,
                recipient = %mask_for_log(&email),
                error = %e,
                "failed to send OTP email"
            );
            return Err(AppError::ServiceUnavailable(
                "Failed to send OTP email. Please try again later.".to_string(),
            ));
        }

        info!(user_id = %user.id, recipient = %mask_for_log(&email), "OTP sent");
        Ok(OtpDispatch::Sent)
    }

    /// Check `code` against the user's most recent row and consume it.
    pub async fn verify(&self, user_id: i64, email: &str, code: &str) -> Result<Otp> {
        let record = self
            .otps
            .latest_for_user(user_id)
            .await?
            .ok_or(OtpError::NotFound)?;

        if record.is_used {
            return Err(OtpError::AlreadyUsed.into());
        }
        if record.expires_at < Utc::now() {
            return Err(OtpError::Expired.into());
        }

        let expected = hash_code(&self.config.hash_pepper, email, code);
        if !hashes_match(&expected, &record.otp_hash) {
            return Err(OtpError::InvalidCode.into());
        }

        // A concurrent verify may have consumed the row since it was read.
        if !self.otps.mark_used(record.id).await? {
            return Err(OtpError::AlreadyUsed.into());
        }

        Ok(Otp {
            is_used: true,
            ..record
        })
    }
}
