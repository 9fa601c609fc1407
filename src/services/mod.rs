pub mod admin_service;
pub mod auth_service;
pub mod email_service;
pub mod home_service;
pub mod media_service;
pub mod options_service;
pub mod otp_service;
pub mod post_service;
pub mod profile_service;
pub mod storage;

pub use admin_service::AdminService;
pub use auth_service::AuthService;
pub use email_service::{EmailService, Mailer, OutgoingMail};
pub use home_service::HomeService;
pub use media_service::MediaService;
pub use options_service::OptionsService;
pub use otp_service::{OtpDispatch, OtpError, OtpService};
pub use post_service::PostService;
pub use profile_service::ProfileService;
pub use storage::{ObjectStorage, R2Storage, UnconfiguredStorage};

use crate::error::{AppError, Result};

/// Row offset for a 1-based `page`; pages past `i64` range are rejected.
pub fn page_offset(page: i64, limit: i64) -> Result<i64> {
    if page < 1 {
        return Err(AppError::validation("page must be at least 1"));
    }
    (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::validation("page is too large"))
}
