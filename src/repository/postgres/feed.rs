use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::PgStore;
use crate::error::Result;
use crate::models::{
    ActivityTab, Comment, Highlights, LikeToggle, NewPost, Post, PostPatch, PostReport, QuickActionCounts,
    UserPostStats,
};
use crate::repository::PostRepository;

#[async_trait]
impl PostRepository for PgStore {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (
                user_id, post_type, title, description, media_url,
                pinned, urgent, meetup_at, job_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(post.user_id)
        .bind(post.post_type)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.media_url)
        .bind(post.pinned)
        .bind(post.urgent)
        .bind(post.meetup_at)
        .bind(post.job_status)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find(&self, id: i64) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update(&self, id: i64, patch: &PostPatch) -> Result<Option<Post>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut post) = current else {
            return Ok(None);
        };
        patch.apply_to(&mut post);

        let updated = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET
                title = $2, description = $3, media_url = $4, pinned = $5,
                urgent = $6, meetup_at = $7, job_status = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.media_url)
        .bind(post.pinned)
        .bind(post.urgent)
        .bind(post.meetup_at)
        .bind(post.job_status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn engagement_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, (i64, i64)>> {
        let mut counts: HashMap<i64, (i64, i64)> = post_ids.iter().map(|id| (*id, (0, 0))).collect();
        if post_ids.is_empty() {
            return Ok(counts);
        }

        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id,
                   (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
                   (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
            FROM posts p
            WHERE p.id = ANY($1)
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        for (id, likes, comments) in rows {
            counts.insert(id, (likes, comments));
        }
        Ok(counts)
    }

    async fn is_liked(&self, post_id: i64, user_id: i64) -> Result<bool> {
        let liked: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM post_likes WHERE post_id = $1 AND user_id = $2)",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(liked)
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeToggle> {
        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let liked = if removed > 0 {
            false
        } else {
            sqlx::query(
                r#"
                INSERT INTO post_likes (post_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (post_id, user_id) DO NOTHING
                "#,
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
            true
        };

        let like_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(LikeToggle { liked, like_count })
    }

    async fn add_comment(&self, post_id: i64, user_id: i64, body: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, user_id, body) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64, limit: i64, offset: i64) -> Result<(Vec<Comment>, i64)> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((comments, total))
    }

    async fn create_report(&self, post_id: i64, reporter_id: i64, reason: &str) -> Result<Option<PostReport>> {
        let report = sqlx::query_as::<_, PostReport>(
            r#"
            INSERT INTO post_reports (post_id, reporter_id, reason, status)
            VALUES ($1, $2, $3, 'PENDING')
            ON CONFLICT (post_id, reporter_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(post_id)
        .bind(reporter_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }

    async fn toggle_save(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM saved_posts WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed > 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO saved_posts (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn feed(&self, community: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Post>, i64)> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.* FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE u.status = 'APPROVED' AND u.community IS NOT DISTINCT FROM $1
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(community)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE u.status = 'APPROVED' AND u.community IS NOT DISTINCT FROM $1
            "#,
        )
        .bind(community)
        .fetch_one(&self.pool)
        .await?;

        Ok((posts, total))
    }

    async fn quick_action_counts(&self) -> Result<QuickActionCounts> {
        let counts = sqlx::query_as::<_, QuickActionCounts>(
            r#"
            SELECT
                COUNT(*) AS total_posts,
                COUNT(*) FILTER (WHERE p.post_type = 'JOB' AND p.job_status = 'OPEN') AS open_jobs,
                COUNT(*) FILTER (WHERE p.post_type = 'MARKETPLACE') AS marketplace_items,
                COUNT(*) FILTER (WHERE p.post_type = 'MATRIMONY') AS matrimony_profiles,
                COUNT(*) FILTER (WHERE p.post_type = 'HELP_REQUEST') AS helping_hand_requests,
                COUNT(*) FILTER (WHERE p.post_type = 'ANNOUNCEMENT') AS community_updates
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE u.status = 'APPROVED'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn highlights(&self, now: DateTime<Utc>, limit: i64) -> Result<Highlights> {
        let pinned_announcements = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.* FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE u.status = 'APPROVED' AND p.post_type = 'ANNOUNCEMENT' AND p.pinned
            ORDER BY p.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let upcoming_meetups = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.* FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE u.status = 'APPROVED' AND p.post_type = 'MEETUP' AND p.meetup_at >= $1
            ORDER BY p.meetup_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let urgent_help_requests = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.* FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE u.status = 'APPROVED' AND p.post_type = 'HELP_REQUEST' AND p.urgent
            ORDER BY p.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Highlights {
            pinned_announcements,
            upcoming_meetups,
            urgent_help_requests,
        })
    }

    async fn user_post_stats(&self, user_id: i64) -> Result<UserPostStats> {
        let stats = sqlx::query_as::<_, UserPostStats>(
            r#"
            SELECT
                COUNT(*) AS total_posts,
                COUNT(*) FILTER (WHERE post_type = 'JOB') AS jobs_posted,
                COUNT(*) FILTER (WHERE post_type = 'MARKETPLACE') AS marketplace_listings,
                COUNT(*) FILTER (WHERE post_type = 'HELP_REQUEST') AS helping_hand_requests
            FROM posts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn activity(&self, user_id: i64, tab: ActivityTab, limit: i64, offset: i64) -> Result<(Vec<Post>, i64)> {
        let (select, count) = match tab {
            ActivityTab::My => (
                "SELECT p.* FROM posts p WHERE p.user_id = $1",
                "SELECT COUNT(*) FROM posts p WHERE p.user_id = $1",
            ),
            ActivityTab::Saved => (
                "SELECT p.* FROM posts p JOIN saved_posts s ON s.post_id = p.id WHERE s.user_id = $1",
                "SELECT COUNT(*) FROM posts p JOIN saved_posts s ON s.post_id = p.id WHERE s.user_id = $1",
            ),
            ActivityTab::Liked => (
                "SELECT p.* FROM posts p JOIN post_likes l ON l.post_id = p.id WHERE l.user_id = $1",
                "SELECT COUNT(*) FROM posts p JOIN post_likes l ON l.post_id = p.id WHERE l.user_id = $1",
            ),
        };

        let query = format!("{select} ORDER BY p.created_at DESC, p.id DESC LIMIT $2 OFFSET $3");
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(count)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((posts, total))
    }

    async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_pending_reports(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_reports WHERE status = 'PENDING'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
