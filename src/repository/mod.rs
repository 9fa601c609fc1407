//! Persistence seam.
//!
//! Services talk to storage only through these traits. `PgStore` is the
//! production implementation; the test harness supplies an in-memory one.
//! Operations that must be race-free (OTP issue, like toggle, report,
//! pending-update staging, review decisions) are single trait calls so each
//! implementation can make them atomic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    ActivityTab, AdminVerification, Comment, Highlights, LikeToggle, MediaFile, NewAdminVerification,
    NewMediaFile, NewOtp, NewPost, NewUser, Notification, OptionItem, Otp, PendingProfileUpdate, Post,
    PostPatch, PostReport, ProfileSection, QuickActionCounts, RestrictedSection, ReviewStatus,
    SectionData, User, UserPatch, UserPostStats, UserProfile, UserStatus,
};

mod postgres;

pub use postgres::PgStore;

/// Outcome of an admin review of a queued item.
#[derive(Debug, Clone)]
pub enum ReviewOutcome<T> {
    NotFound,
    NotPending,
    Reviewed(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Location,
    Kulam,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a PENDING user. Duplicate email or mobile fails with a validation error.
    async fn create(&self, user: &NewUser) -> Result<User>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// `email` is expected lower-cased.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>>;

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;

    /// Apply a partial column update. Returns `None` when the user is missing.
    async fn update(&self, id: i64, patch: &UserPatch) -> Result<Option<User>>;

    /// Newest first. Returns (page, total).
    async fn list(&self, status: Option<UserStatus>, limit: i64, offset: i64) -> Result<(Vec<User>, i64)>;

    /// PENDING users, oldest first.
    async fn list_pending(&self) -> Result<Vec<User>>;

    async fn count_by_status(&self) -> Result<HashMap<UserStatus, i64>>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Most recently created row for the user.
    async fn latest_for_user(&self, user_id: i64) -> Result<Option<Otp>>;

    /// Store a new code unless a row was created after `cooldown_since`.
    ///
    /// On insert, earlier unused rows for the user are marked used. Returns
    /// `None` when the cooldown suppressed the insert.
    async fn issue(&self, otp: &NewOtp, cooldown_since: DateTime<Utc>) -> Result<Option<Otp>>;

    /// Flip `is_used` once. Returns false if the row was already used.
    async fn mark_used(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the user's profile row, creating an empty one on first access.
    async fn get_or_create(&self, user_id: i64) -> Result<UserProfile>;

    /// Existing profile rows for `user_ids`; never creates rows.
    async fn find_by_user_ids(&self, user_ids: &[i64]) -> Result<Vec<UserProfile>>;

    /// Replace one live JSON section.
    async fn save_section(&self, user_id: i64, section: ProfileSection, data: Value) -> Result<UserProfile>;

    /// Merge `data` into the user's PENDING row for `section`, creating it if
    /// absent, and bump `submitted_at`. `data` must already be allow-listed.
    async fn stage_update(
        &self,
        user_id: i64,
        section: RestrictedSection,
        data: &SectionData,
    ) -> Result<PendingProfileUpdate>;

    async fn find_update(&self, id: i64) -> Result<Option<PendingProfileUpdate>>;

    /// PENDING rows ordered by submission time, oldest first.
    async fn list_pending_updates(&self) -> Result<Vec<PendingProfileUpdate>>;

    /// All staged rows for a user, newest submission first.
    async fn updates_for_user(&self, user_id: i64) -> Result<Vec<PendingProfileUpdate>>;

    async fn count_pending_updates(&self) -> Result<i64>;

    /// Copy the staged data into the live section and mark the row APPROVED.
    async fn approve_update(
        &self,
        id: i64,
        reviewed_by: &str,
        remarks: Option<&str>,
    ) -> Result<ReviewOutcome<PendingProfileUpdate>>;

    async fn reject_update(
        &self,
        id: i64,
        reviewed_by: &str,
        remarks: &str,
    ) -> Result<ReviewOutcome<PendingProfileUpdate>>;
}

#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Move a PENDING user to the decided status and append the audit row.
    async fn decide(&self, decision: &NewAdminVerification) -> Result<ReviewOutcome<User>>;

    /// Newest first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<AdminVerification>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &NewPost) -> Result<Post>;

    async fn find(&self, id: i64) -> Result<Option<Post>>;

    async fn update(&self, id: i64, patch: &PostPatch) -> Result<Option<Post>>;

    /// Deletes the post with its likes, comments, reports and saves.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// (likes, comments) per post id; missing ids count zero.
    async fn engagement_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, (i64, i64)>>;

    async fn is_liked(&self, post_id: i64, user_id: i64) -> Result<bool>;

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeToggle>;

    async fn add_comment(&self, post_id: i64, user_id: i64, body: &str) -> Result<Comment>;

    /// Oldest first. Returns (page, total).
    async fn list_comments(&self, post_id: i64, limit: i64, offset: i64) -> Result<(Vec<Comment>, i64)>;

    /// `None` when this reporter already reported the post.
    async fn create_report(&self, post_id: i64, reporter_id: i64, reason: &str) -> Result<Option<PostReport>>;

    /// Returns whether the post is saved after the toggle.
    async fn toggle_save(&self, user_id: i64, post_id: i64) -> Result<bool>;

    /// Posts by APPROVED authors whose community equals `community`
    /// (a missing community matches only a missing community), newest first.
    async fn feed(&self, community: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Post>, i64)>;

    async fn quick_action_counts(&self) -> Result<QuickActionCounts>;

    async fn highlights(&self, now: DateTime<Utc>, limit: i64) -> Result<Highlights>;

    async fn user_post_stats(&self, user_id: i64) -> Result<UserPostStats>;

    /// Newest post first. Returns (page, total).
    async fn activity(&self, user_id: i64, tab: ActivityTab, limit: i64, offset: i64) -> Result<(Vec<Post>, i64)>;

    async fn count_all(&self) -> Result<i64>;

    async fn count_pending_reports(&self) -> Result<i64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, user_id: i64, title: &str, body: Option<&str>) -> Result<Notification>;

    async fn unread_count(&self, user_id: i64) -> Result<i64>;

    async fn unread_messages(&self, user_id: i64) -> Result<i64>;
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create(&self, media: &NewMediaFile) -> Result<MediaFile>;

    /// PENDING files, newest first.
    async fn list_pending(&self) -> Result<Vec<MediaFile>>;

    async fn count_pending(&self) -> Result<i64>;

    /// Move a PENDING file to `status`.
    async fn review(&self, id: i64, status: ReviewStatus) -> Result<ReviewOutcome<MediaFile>>;
}

#[async_trait]
pub trait OptionsRepository: Send + Sync {
    /// Ordered by sort order, then name.
    async fn list(&self, kind: OptionKind) -> Result<Vec<OptionItem>>;

    /// Insert `names` with their position as sort order when the table is empty.
    /// Returns the number of rows inserted.
    async fn seed_if_empty(&self, kind: OptionKind, names: &[&str]) -> Result<usize>;
}

/// Every repository the services need, as shared trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub otps: Arc<dyn OtpRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub verifications: Arc<dyn VerificationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub media: Arc<dyn MediaRepository>,
    pub options: Arc<dyn OptionsRepository>,
}

impl Repositories {
    /// Use one store for every repository.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + OtpRepository
            + ProfileRepository
            + VerificationRepository
            + PostRepository
            + NotificationRepository
            + MediaRepository
            + OptionsRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            otps: store.clone(),
            profiles: store.clone(),
            verifications: store.clone(),
            posts: store.clone(),
            notifications: store.clone(),
            media: store.clone(),
            options: store,
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }
}
