//! PostgreSQL implementation of the repository traits.

use sqlx::PgPool;

use crate::error::AppError;
use crate::models::ProfileSection;

mod feed;
mod misc;
mod profiles;
mod users;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Column backing a JSON profile section. `Basic` lives on `users`.
fn section_column(section: ProfileSection) -> Result<&'static str, AppError> {
    match section {
        ProfileSection::Community => Ok("community"),
        ProfileSection::Personal => Ok("personal"),
        ProfileSection::Matrimony => Ok("matrimony"),
        ProfileSection::Business => Ok("business"),
        ProfileSection::Family => Ok("family"),
        ProfileSection::Basic => Err(AppError::BadRequest(
            "Basic section is stored on the user record".to_string(),
        )),
    }
}

/// Translate unique-index violations on `users` into user-facing messages.
fn map_user_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("idx_users_mobile") => "An account with this mobile number already exists.",
                _ => "An account with this email already exists.",
            };
            return AppError::validation(message);
        }
    }
    AppError::Database(err)
}
