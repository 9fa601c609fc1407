use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostType {
    Announcement,
    Job,
    Marketplace,
    Matrimony,
    Achievement,
    Meetup,
    HelpRequest,
    Entertainment,
}

impl PostType {
    /// Label shown in profile activity lists.
    pub fn label(&self) -> &'static str {
        match self {
            PostType::Announcement => "Announcement",
            PostType::Job => "Job",
            PostType::Marketplace => "Marketplace",
            PostType::Matrimony => "Matrimony",
            PostType::Achievement => "Achievement",
            PostType::Meetup => "Meetup",
            PostType::HelpRequest => "Help Request",
            PostType::Entertainment => "Entertainment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

#[derive(Debug, Clone, FromRow)]
pub struct Post {
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
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub post_type: PostType,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub pinned: bool,
    pub urgent: bool,
    pub meetup_at: Option<DateTime<Utc>>,
    pub job_status: Option<JobStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub media_url: Option<Option<String>>,
    pub pinned: Option<bool>,
    pub urgent: Option<bool>,
    pub meetup_at: Option<Option<DateTime<Utc>>>,
    pub job_status: Option<Option<JobStatus>>,
}

impl PostPatch {
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(v) = &self.title {
            post.title = v.clone();
        }
        if let Some(v) = &self.description {
            post.description = v.clone();
        }
        if let Some(v) = &self.media_url {
            post.media_url = v.clone();
        }
        if let Some(v) = self.pinned {
            post.pinned = v;
        }
        if let Some(v) = self.urgent {
            post.urgent = v;
        }
        if let Some(v) = self.meetup_at {
            post.meetup_at = v;
        }
        if let Some(v) = self.job_status {
            post.job_status = v;
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostReport {
    pub id: i64,
    pub reporter_id: i64,
    pub post_id: i64,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a like toggle, read back after the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

/// Post counts over approved authors, by home-screen module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionCounts {
    pub total_posts: i64,
    pub open_jobs: i64,
    pub marketplace_items: i64,
    pub matrimony_profiles: i64,
    pub helping_hand_requests: i64,
    pub community_updates: i64,
}

/// One author's post counts shown on their profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct UserPostStats {
    pub total_posts: i64,
    pub jobs_posted: i64,
    pub marketplace_listings: i64,
    pub helping_hand_requests: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Highlights {
    pub pinned_announcements: Vec<Post>,
    pub upcoming_meetups: Vec<Post>,
    pub urgent_help_requests: Vec<Post>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityTab {
    My,
    Saved,
    Liked,
}
