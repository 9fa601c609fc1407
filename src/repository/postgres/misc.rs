use async_trait::async_trait;

use super::PgStore;
use crate::error::Result;
use crate::models::{MediaFile, NewMediaFile, Notification, OptionItem, ReviewStatus};
use crate::repository::{
    MediaRepository, NotificationRepository, OptionKind, OptionsRepository, ReviewOutcome,
};

#[async_trait]
impl NotificationRepository for PgStore {
    async fn create(&self, user_id: i64, title: &str, body: Option<&str>) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, body)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, body, read_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn unread_messages(&self, user_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE recipient_id = $1 AND read_at IS NULL")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl MediaRepository for PgStore {
    async fn create(&self, media: &NewMediaFile) -> Result<MediaFile> {
        let created = sqlx::query_as::<_, MediaFile>(
            r#"
            INSERT INTO media_files (user_id, module, file_url, file_type, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(media.user_id)
        .bind(media.module)
        .bind(&media.file_url)
        .bind(media.file_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_pending(&self) -> Result<Vec<MediaFile>> {
        let rows = sqlx::query_as::<_, MediaFile>(
            "SELECT * FROM media_files WHERE status = 'PENDING' ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_pending(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_files WHERE status = 'PENDING'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn review(&self, id: i64, status: ReviewStatus) -> Result<ReviewOutcome<MediaFile>> {
        let reviewed = sqlx::query_as::<_, MediaFile>(
            r#"
            UPDATE media_files SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(reviewed) = reviewed {
            return Ok(ReviewOutcome::Reviewed(reviewed));
        }
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM media_files WHERE id = $1)")
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

fn option_table(kind: OptionKind) -> &'static str {
    match kind {
        OptionKind::Location => "locations",
        OptionKind::Kulam => "kulams",
    }
}

#[async_trait]
impl OptionsRepository for PgStore {
    async fn list(&self, kind: OptionKind) -> Result<Vec<OptionItem>> {
        let query = format!(
            "SELECT id, name FROM {} ORDER BY sort_order ASC NULLS LAST, name ASC",
            option_table(kind)
        );
        let items = sqlx::query_as::<_, OptionItem>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn seed_if_empty(&self, kind: OptionKind, names: &[&str]) -> Result<usize> {
        let table = option_table(kind);
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        let insert = format!("INSERT INTO {table} (name, sort_order) VALUES ($1, $2)");
        for (index, name) in names.iter().enumerate() {
            sqlx::query(&insert)
                .bind(*name)
                .bind(index as i32 + 1)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(names.len())
    }
}
