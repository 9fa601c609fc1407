// Community posts: visibility, likes, comments, reports and saves
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{
    Comment, JobStatus, LikeToggle, NewPost, Post, PostPatch, PostType, User,
};
use crate::repository::Repositories;
use crate::services::page_offset;
use crate::services::storage::{display_url, ObjectStorage};
use crate::AppState;

const NOTIFICATION_TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct PostAuthor {
    pub id: i64,
    pub name: String,
    pub profile_image: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub user_id: i64,
    pub post_type: PostType,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub pinned: bool,
    pub urgent: bool,
    pub meetup_at: Option<DateTime<Utc>>,
    pub job_status: Option<JobStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: PostAuthor,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author: PostAuthor,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsPage {
    pub items: Vec<CommentView>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Title excerpt used in notification bodies.
pub fn title_excerpt(title: &str) -> String {
    if title.chars().count() > NOTIFICATION_TITLE_CHARS {
        let head: String = title.chars().take(NOTIFICATION_TITLE_CHARS).collect();
        format!("{head}…")
    } else {
        title.to_string()
    }
}

/// Posts are visible only inside the author's community; two members with no
/// community share the "no community" bucket.
pub fn same_community(author: &User, viewer: &User) -> bool {
    author.community == viewer.community
}

pub struct PostService {
    repos: Repositories,
    storage: Arc<dyn ObjectStorage>,
}

impl PostService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            storage: state.storage.clone(),
        }
    }

    async fn author_view(&self, user: &User) -> PostAuthor {
        PostAuthor {
            id: user.id,
            name: user.full_name.clone(),
            profile_image: display_url(self.storage.as_ref(), user.profile_photo.as_deref()).await,
            verified: user.is_approved(),
        }
    }

    fn not_found() -> AppError {
        AppError::NotFound("Post not found".to_string())
    }

    /// Load a post the viewer may see, with its author.
    ///
    /// Out-of-community posts answer NotFound so their existence is not revealed.
    async fn visible_post(&self, viewer: &User, post_id: i64) -> Result<(Post, User)> {
        let post = self.repos.posts.find(post_id).await?.ok_or_else(Self::not_found)?;
        let author = if post.user_id == viewer.id {
            viewer.clone()
        } else {
            self.repos
                .users
                .find_by_id(post.user_id)
                .await?
                .ok_or_else(Self::not_found)?
        };

        if !same_community(&author, viewer) {
            debug!(post_id = %post_id, viewer_id = %viewer.id, "post hidden outside author community");
            return Err(Self::not_found());
        }
        Ok((post, author))
    }

    /// Author-only operations: 404 when missing, 403 for anyone else.
    async fn owned_post(&self, user_id: i64, post_id: i64) -> Result<Post> {
        let post = self.repos.posts.find(post_id).await?.ok_or_else(Self::not_found)?;
        if post.user_id != user_id {
            return Err(AppError::Forbidden("Forbidden".to_string()));
        }
        Ok(post)
    }

    async fn detail(&self, viewer: &User, post: Post, author: &User) -> Result<PostDetail> {
        let counts = self.repos.posts.engagement_counts(&[post.id]).await?;
        let (like_count, comment_count) = counts.get(&post.id).copied().unwrap_or((0, 0));
        let liked_by_me = self.repos.posts.is_liked(post.id, viewer.id).await?;
        let media_url = display_url(self.storage.as_ref(), post.media_url.as_deref()).await;

        Ok(PostDetail {
            id: post.id,
            user_id: post.user_id,
            post_type: post.post_type,
            title: post.title,
            description: post.description,
            media_url,
            pinned: post.pinned,
            urgent: post.urgent,
            meetup_at: post.meetup_at,
            job_status: post.job_status,
            created_at: post.created_at,
            updated_at: post.updated_at,
            author: self.author_view(author).await,
            like_count,
            comment_count,
            liked_by_me,
        })
    }

    pub async fn create(&self, author: &User, new_post: NewPost) -> Result<PostDetail> {
        let post = self.repos.posts.create(&new_post).await?;
        info!(post_id = %post.id, user_id = %author.id, post_type = ?post.post_type, "post created");
        self.detail(author, post, author).await
    }

    pub async fn get(&self, viewer: &User, post_id: i64) -> Result<PostDetail> {
        let (post, author) = self.visible_post(viewer, post_id).await?;
        self.detail(viewer, post, &author).await
    }

    pub async fn update(&self, author: &User, post_id: i64, patch: PostPatch) -> Result<PostDetail> {
        self.owned_post(author.id, post_id).await?;
        let post = self
            .repos
            .posts
            .update(post_id, &patch)
            .await?
            .ok_or_else(Self::not_found)?;
        info!(post_id = %post_id, user_id = %author.id, "post updated");
        self.detail(author, post, author).await
    }

    pub async fn delete(&self, user_id: i64, post_id: i64) -> Result<()> {
        self.owned_post(user_id, post_id).await?;
        if !self.repos.posts.delete(post_id).await? {
            return Err(Self::not_found());
        }
        info!(post_id = %post_id, user_id = %user_id, "post deleted");
        Ok(())
    }

    /// Flip the viewer's like. A new like from someone other than the author
    /// notifies the author.
    pub async fn toggle_like(&self, viewer: &User, post_id: i64) -> Result<LikeToggle> {
        let (post, _) = self.visible_post(viewer, post_id).await?;
        let toggle = self.repos.posts.toggle_like(post_id, viewer.id).await?;

        if toggle.liked && post.user_id != viewer.id {
            let body = format!(
                "{} liked your post \"{}\"",
                viewer.full_name,
                title_excerpt(&post.title)
            );
            self.repos
                .notifications
                .create(post.user_id, "New like", Some(&body))
                .await?;
        }
        Ok(toggle)
    }

    pub async fn add_comment(&self, viewer: &User, post_id: i64, body: &str) -> Result<CommentView> {
        let (post, _) = self.visible_post(viewer, post_id).await?;
        let comment = self.repos.posts.add_comment(post_id, viewer.id, body.trim()).await?;

        if post.user_id != viewer.id {
            let text = format!(
                "{} commented on your post \"{}\"",
                viewer.full_name,
                title_excerpt(&post.title)
            );
            self.repos
                .notifications
                .create(post.user_id, "New comment", Some(&text))
                .await?;
        }

        Ok(self.comment_view(comment, viewer).await)
    }

    async fn comment_view(&self, comment: Comment, author: &User) -> CommentView {
        CommentView {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            body: comment.body,
            created_at: comment.created_at,
            author: self.author_view(author).await,
        }
    }

    /// Oldest first.
    pub async fn comments(&self, viewer: &User, post_id: i64, page: i64, limit: i64) -> Result<CommentsPage> {
        self.visible_post(viewer, post_id).await?;
        let offset = page_offset(page, limit)?;
        let (comments, total) = self.repos.posts.list_comments(post_id, limit, offset).await?;

        let mut author_ids: Vec<i64> = comments.iter().map(|c| c.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<i64, User> = self
            .repos
            .users
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut items = Vec::with_capacity(comments.len());
        for comment in comments {
            // Comments whose author row is gone are skipped.
            if let Some(author) = authors.get(&comment.user_id) {
                items.push(self.comment_view(comment, author).await);
            }
        }

        Ok(CommentsPage {
            items,
            page,
            limit,
            total,
        })
    }

    /// One report per member per post.
    pub async fn report(&self, viewer: &User, post_id: i64, reason: &str) -> Result<i64> {
        self.visible_post(viewer, post_id).await?;
        let report = self
            .repos
            .posts
            .create_report(post_id, viewer.id, reason.trim())
            .await?
            .ok_or_else(|| AppError::Conflict("You have already reported this post".to_string()))?;
        info!(post_id = %post_id, reporter_id = %viewer.id, report_id = %report.id, "post reported");
        Ok(report.id)
    }

    /// Returns whether the post is saved afterwards.
    pub async fn toggle_save(&self, viewer: &User, post_id: i64) -> Result<bool> {
        self.visible_post(viewer, post_id).await?;
        self.repos.posts.toggle_save(viewer.id, post_id).await
    }
}
