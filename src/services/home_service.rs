use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Post, PostType, QuickActionCounts, User};
use crate::repository::Repositories;
use crate::services::page_offset;
use crate::services::storage::{display_url, ObjectStorage};
use crate::AppState;

const HIGHLIGHT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeUser {
    pub name: String,
    pub profile_image: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSummary {
    pub user: HomeUser,
    pub quick_action_counts: QuickActionCounts,
    pub unread_notifications_count: i64,
    pub unread_messages_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngagementCounts {
    pub likes: i64,
    pub comments: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub post_id: i64,
    pub post_type: PostType,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: HomeUser,
    pub counts: EngagementCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightItem {
    pub post_id: i64,
    pub post_type: PostType,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub pinned: bool,
    pub urgent: bool,
    pub meetup_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightsView {
    pub pinned_announcements: Vec<HighlightItem>,
    pub upcoming_meetups: Vec<HighlightItem>,
    pub urgent_help_requests: Vec<HighlightItem>,
}

/// Home screen: summary counters, the community feed and highlights.
pub struct HomeService {
    repos: Repositories,
    storage: Arc<dyn ObjectStorage>,
}

impl HomeService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            storage: state.storage.clone(),
        }
    }

    async fn home_user(&self, user: &User) -> HomeUser {
        HomeUser {
            name: user.full_name.clone(),
            profile_image: display_url(self.storage.as_ref(), user.profile_photo.as_deref()).await,
            verified: user.is_approved(),
        }
    }

    pub async fn summary(&self, user: &User) -> Result<HomeSummary> {
        Ok(HomeSummary {
            user: self.home_user(user).await,
            quick_action_counts: self.repos.posts.quick_action_counts().await?,
            unread_notifications_count: self.repos.notifications.unread_count(user.id).await?,
            unread_messages_count: self.repos.notifications.unread_messages(user.id).await?,
        })
    }

    pub async fn quick_actions(&self) -> Result<QuickActionCounts> {
        self.repos.posts.quick_action_counts().await
    }

    /// Posts by approved members of the viewer's community, newest first.
    pub async fn feed(&self, viewer: &User, page: i64, limit: i64) -> Result<FeedPage> {
        let offset = page_offset(page, limit)?;
        let (posts, total) = self
            .repos
            .posts
            .feed(viewer.community.as_deref(), limit, offset)
            .await?;

        let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let counts = self.repos.posts.engagement_counts(&post_ids).await?;

        let mut author_ids: Vec<i64> = posts.iter().map(|p| p.user_id).collect();
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

        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let author = match authors.get(&post.user_id) {
                Some(a) => self.home_user(a).await,
                None => HomeUser {
                    name: "Unknown".to_string(),
                    profile_image: None,
                    verified: false,
                },
            };
            let (likes, comments) = counts.get(&post.id).copied().unwrap_or((0, 0));
            items.push(FeedItem {
                post_id: post.id,
                post_type: post.post_type,
                media_url: display_url(self.storage.as_ref(), post.media_url.as_deref()).await,
                title: post.title,
                description: post.description,
                created_at: post.created_at,
                author,
                counts: EngagementCounts { likes, comments },
            });
        }

        Ok(FeedPage {
            items,
            page,
            limit,
            total,
        })
    }

    pub async fn highlights(&self) -> Result<HighlightsView> {
        let highlights = self.repos.posts.highlights(Utc::now(), HIGHLIGHT_LIMIT).await?;
        Ok(HighlightsView {
            pinned_announcements: self.highlight_items(highlights.pinned_announcements).await,
            upcoming_meetups: self.highlight_items(highlights.upcoming_meetups).await,
            urgent_help_requests: self.highlight_items(highlights.urgent_help_requests).await,
        })
    }

    async fn highlight_items(&self, posts: Vec<Post>) -> Vec<HighlightItem> {
        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            items.push(HighlightItem {
                post_id: post.id,
                post_type: post.post_type,
                media_url: display_url(self.storage.as_ref(), post.media_url.as_deref()).await,
                title: post.title,
                description: post.description,
                created_at: post.created_at,
                pinned: post.pinned,
                urgent: post.urgent,
                meetup_at: post.meetup_at,
            });
        }
        items
    }
}
