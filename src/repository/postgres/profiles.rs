use async_trait::async_trait;
use serde_json::Value;

use super::{section_column, PgStore};
use crate::error::Result;
use crate::models::{
    PendingProfileUpdate, ProfileSection, RestrictedSection, ReviewStatus, SectionData, UserProfile,
};
use crate::repository::{ProfileRepository, ReviewOutcome};

async fn ensure_profile<'c, E>(executor: E, user_id: i64) -> Result<()>
where
    E: sqlx::PgExecutor<'c>,
{
    sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn get_or_create(&self, user_id: i64) -> Result<UserProfile> {
        ensure_profile(&self.pool, user_id).await?;
        let profile = sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn find_by_user_ids(&self, user_ids: &[i64]) -> Result<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let profiles = sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = ANY($1)")
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    async fn save_section(&self, user_id: i64, section: ProfileSection, data: Value) -> Result<UserProfile> {
        let column = section_column(section)?;
        ensure_profile(&self.pool, user_id).await?;
        let query = format!(
            "UPDATE user_profiles SET {column} = $2, updated_at = NOW() WHERE user_id = $1 RETURNING *"
        );
        let profile = sqlx::query_as::<_, UserProfile>(&query)
            .bind(user_id)
            .bind(data)
            .fetch_one(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn stage_update(
        &self,
        user_id: i64,
        section: RestrictedSection,
        data: &SectionData,
    ) -> Result<PendingProfileUpdate> {
        let allowed: Vec<String> = section.allowed_keys().iter().map(|k| k.to_string()).collect();

        // The partial unique index turns a concurrent second submission into
        // a merge into the same PENDING row.
        let update = sqlx::query_as::<_, PendingProfileUpdate>(
            r#"
            INSERT INTO pending_profile_updates (user_id, section, data, status, submitted_at)
            VALUES ($1, $2, $3, 'PENDING', NOW())
            ON CONFLICT (user_id, section) WHERE status = 'PENDING'
            DO UPDATE SET
                data = COALESCE((
                    SELECT jsonb_object_agg(e.key, e.value)
                    FROM jsonb_each(
                        CASE WHEN jsonb_typeof(pending_profile_updates.data) = 'object'
                             THEN pending_profile_updates.data
                             ELSE '{}'::jsonb
                        END || EXCLUDED.data
                    ) AS e
                    WHERE e.key = ANY($4)
                ), '{}'::jsonb),
                submitted_at = NOW(),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(section)
        .bind(Value::Object(data.clone()))
        .bind(&allowed)
        .fetch_one(&self.pool)
        .await?;
        Ok(update)
    }

    async fn find_update(&self, id: i64) -> Result<Option<PendingProfileUpdate>> {
        let update =
            sqlx::query_as::<_, PendingProfileUpdate>("SELECT * FROM pending_profile_updates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(update)
    }

    async fn list_pending_updates(&self) -> Result<Vec<PendingProfileUpdate>> {
        let updates = sqlx::query_as::<_, PendingProfileUpdate>(
            r#"
            SELECT * FROM pending_profile_updates
            WHERE status = 'PENDING'
            ORDER BY submitted_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(updates)
    }

    async fn updates_for_user(&self, user_id: i64) -> Result<Vec<PendingProfileUpdate>> {
        let updates = sqlx::query_as::<_, PendingProfileUpdate>(
            r#"
            SELECT * FROM pending_profile_updates
            WHERE user_id = $1
            ORDER BY submitted_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(updates)
    }

    async fn count_pending_updates(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pending_profile_updates WHERE status = 'PENDING'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn approve_update(
        &self,
        id: i64,
        reviewed_by: &str,
        remarks: Option<&str>,
    ) -> Result<ReviewOutcome<PendingProfileUpdate>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, PendingProfileUpdate>(
            "SELECT * FROM pending_profile_updates WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current else {
            return Ok(ReviewOutcome::NotFound);
        };
        if current.status != ReviewStatus::Pending {
            return Ok(ReviewOutcome::NotPending);
        }

        ensure_profile(&mut *tx, current.user_id).await?;
        let column = section_column(current.section.section())?;
        let query = format!("UPDATE user_profiles SET {column} = $2, updated_at = NOW() WHERE user_id = $1");
        sqlx::query(&query)
            .bind(current.user_id)
            .bind(&current.data)
            .execute(&mut *tx)
            .await?;

        let reviewed = sqlx::query_as::<_, PendingProfileUpdate>(
            r#"
            UPDATE pending_profile_updates
            SET status = 'APPROVED', reviewed_at = NOW(), reviewed_by = $2,
                admin_remarks = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reviewed_by)
        .bind(remarks)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReviewOutcome::Reviewed(reviewed))
    }

    async fn reject_update(
        &self,
        id: i64,
        reviewed_by: &str,
        remarks: &str,
    ) -> Result<ReviewOutcome<PendingProfileUpdate>> {
        let reviewed = sqlx::query_as::<_, PendingProfileUpdate>(
            r#"
            UPDATE pending_profile_updates
            SET status = 'REJECTED', reviewed_at = NOW(), reviewed_by = $2,
                admin_remarks = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reviewed_by)
        .bind(remarks)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(reviewed) = reviewed {
            return Ok(ReviewOutcome::Reviewed(reviewed));
        }
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pending_profile_updates WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(if exists {
            ReviewOutcome::NotPending
        } else {
            ReviewOutcome::NotFound
        })
    }
}
