use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{map_user_conflict, PgStore};
use crate::error::Result;
use crate::models::{
    AdminVerification, NewAdminVerification, NewOtp, NewUser, Otp, User, UserPatch, UserStatus,
    VerificationDecision,
};
use crate::repository::{OtpRepository, ReviewOutcome, UserRepository, VerificationRepository};

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                full_name, gender, dob, email, mobile, occupation, location,
                community, kulam, profile_photo, govt_id_type, govt_id_file, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.gender)
        .bind(user.dob)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.occupation)
        .bind(&user.location)
        .bind(&user.community)
        .bind(&user.kulam)
        .bind(&user.profile_photo)
        .bind(&user.govt_id_type)
        .bind(&user.govt_id_file)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_conflict)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE mobile = $1")
            .bind(mobile)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> Result<Option<User>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut user) = current else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(user));
        }
        patch.apply_to(&mut user);

        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = $2, dob = $3, mobile = $4, gender = $5, profile_photo = $6,
                city = $7, district = $8, education = $9, job_title = $10, company = $11,
                work_location = $12, skills = $13, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.full_name)
        .bind(user.dob)
        .bind(&user.mobile)
        .bind(&user.gender)
        .bind(&user.profile_photo)
        .bind(&user.city)
        .bind(&user.district)
        .bind(&user.education)
        .bind(&user.job_title)
        .bind(&user.company)
        .bind(&user.work_location)
        .bind(&user.skills)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_user_conflict)?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list(&self, status: Option<UserStatus>, limit: i64, offset: i64) -> Result<(Vec<User>, i64)> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::varchar IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::varchar IS NULL OR status = $1)")
                .bind(status.map(|s| s.as_str()))
                .fetch_one(&self.pool)
                .await?;

        Ok((users, total))
    }

    async fn list_pending(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE status = 'PENDING' ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn count_by_status(&self) -> Result<HashMap<UserStatus, i64>> {
        let rows: Vec<(UserStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM users GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl OtpRepository for PgStore {
    async fn latest_for_user(&self, user_id: i64) -> Result<Option<Otp>> {
        let otp = sqlx::query_as::<_, Otp>(
            "SELECT * FROM otps WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn issue(&self, otp: &NewOtp, cooldown_since: DateTime<Utc>) -> Result<Option<Otp>> {
        let mut tx = self.pool.begin().await?;

        // Serialize issuers for the same user so the cooldown check holds.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(otp.user_id)
            .execute(&mut *tx)
            .await?;

        let recent: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM otps WHERE user_id = $1 AND created_at > $2 LIMIT 1",
        )
        .bind(otp.user_id)
        .bind(cooldown_since)
        .fetch_optional(&mut *tx)
        .await?;
        if recent.is_some() {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("UPDATE otps SET is_used = TRUE WHERE user_id = $1 AND is_used = FALSE")
            .bind(otp.user_id)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, Otp>(
            r#"
            INSERT INTO otps (user_id, otp_hash, expires_at, is_used, created_at)
            VALUES ($1, $2, $3, FALSE, $4)
            RETURNING *
            "#,
        )
        .bind(otp.user_id)
        .bind(&otp.otp_hash)
        .bind(otp.expires_at)
        .bind(otp.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(created))
    }

    async fn mark_used(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE otps SET is_used = TRUE WHERE id = $1 AND is_used = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl VerificationRepository for PgStore {
    async fn decide(&self, decision: &NewAdminVerification) -> Result<ReviewOutcome<User>> {
        let next_status = match decision.decision {
            VerificationDecision::Approved => UserStatus::Approved,
            VerificationDecision::Rejected => UserStatus::Rejected,
        };

        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(decision.user_id)
        .bind(next_status)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(decision.user_id)
                .fetch_one(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Ok(if exists {
                ReviewOutcome::NotPending
            } else {
                ReviewOutcome::NotFound
            });
        };

        sqlx::query(
            r#"
            INSERT INTO admin_verifications (user_id, decision, verified_by, verified_at, remarks)
            VALUES ($1, $2, $3, NOW(), $4)
            "#,
        )
        .bind(decision.user_id)
        .bind(decision.decision)
        .bind(&decision.verified_by)
        .bind(&decision.remarks)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReviewOutcome::Reviewed(user))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<AdminVerification>> {
        let rows = sqlx::query_as::<_, AdminVerification>(
            "SELECT * FROM admin_verifications WHERE user_id = $1 ORDER BY verified_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
