//! In-process store implementing every repository trait.
//!
//! All tables sit behind one async mutex, so each trait call is atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use digital_house_api::error::{AppError, Result};
use digital_house_api::models::{
    merge_section, normalize_json_column, ActivityTab, AdminVerification, Comment, Highlights, JobStatus,
    LikeToggle, MediaFile, NewAdminVerification, NewMediaFile, NewOtp, NewPost, NewUser, Notification,
    OptionItem, Otp, PendingProfileUpdate, Post, PostPatch, PostReport, PostType, ProfileSection,
    QuickActionCounts, ReportStatus, RestrictedSection, ReviewStatus, SectionData, User, UserPatch,
    UserPostStats, UserProfile, UserStatus, VerificationDecision,
};
use digital_house_api::repository::{
    MediaRepository, NotificationRepository, OptionKind, OptionsRepository, OtpRepository, PostRepository,
    ProfileRepository, ReviewOutcome, UserRepository, VerificationRepository,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    otps: Vec<Otp>,
    profiles: Vec<UserProfile>,
    pending_updates: Vec<PendingProfileUpdate>,
    verifications: Vec<AdminVerification>,
    posts: Vec<Post>,
    likes: Vec<(i64, i64)>,
    comments: Vec<Comment>,
    reports: Vec<PostReport>,
    saved: Vec<(i64, i64, DateTime<Utc>)>,
    notifications: Vec<Notification>,
    unread_messages: HashMap<i64, i64>,
    media: Vec<MediaFile>,
    locations: Vec<(OptionItem, i32)>,
    kulams: Vec<(OptionItem, i32)>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn author_approved(&self, post: &Post) -> bool {
        self.user(post.user_id).map(User::is_approved).unwrap_or(false)
    }

    fn ensure_profile(&mut self, user_id: i64) -> usize {
        if let Some(index) = self.profiles.iter().position(|p| p.user_id == user_id) {
            return index;
        }
        let now = Utc::now();
        let id = self.id();
        self.profiles.push(UserProfile {
            id,
            user_id,
            community: None,
            personal: None,
            matrimony: None,
            business: None,
            family: None,
            created_at: now,
            updated_at: now,
        });
        self.profiles.len() - 1
    }

    fn check_unique(&self, except: Option<i64>, email: &str, mobile: Option<&str>) -> Result<()> {
        let others = self.users.iter().filter(|u| Some(u.id) != except);
        for other in others {
            if other.email == email {
                return Err(AppError::validation("An account with this email already exists."));
            }
            if mobile.is_some() && other.mobile.as_deref() == mobile {
                return Err(AppError::validation(
                    "An account with this mobile number already exists.",
                ));
            }
        }
        Ok(())
    }
}

fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

fn page<T: Clone>(items: &[T], limit: i64, offset: i64) -> Vec<T> {
    items
        .iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw OTP row, bypassing cooldown and invalidation.
    pub async fn insert_otp(&self, otp: &NewOtp) -> Otp {
        let mut t = self.tables.lock().await;
        let id = t.id();
        let row = Otp {
            id,
            user_id: otp.user_id,
            otp_hash: otp.otp_hash.clone(),
            expires_at: otp.expires_at,
            is_used: false,
            created_at: otp.created_at,
        };
        t.otps.push(row.clone());
        row
    }

    pub async fn otp_rows(&self, user_id: i64) -> Vec<Otp> {
        let t = self.tables.lock().await;
        t.otps.iter().filter(|o| o.user_id == user_id).cloned().collect()
    }

    /// Force a user's status, bypassing the admin workflow.
    pub async fn set_status(&self, user_id: i64, status: UserStatus) {
        let mut t = self.tables.lock().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == user_id) {
            user.status = status;
        }
    }

    /// Write a raw section value, e.g. a legacy string-encoded column.
    pub async fn put_raw_section(&self, user_id: i64, section: ProfileSection, value: Value) {
        let mut t = self.tables.lock().await;
        let index = t.ensure_profile(user_id);
        t.profiles[index].set_raw_section(section, value);
    }

    pub async fn has_profile(&self, user_id: i64) -> bool {
        let t = self.tables.lock().await;
        t.profiles.iter().any(|p| p.user_id == user_id)
    }

    pub async fn add_unread_message(&self, recipient_id: i64) {
        let mut t = self.tables.lock().await;
        *t.unread_messages.entry(recipient_id).or_insert(0) += 1;
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let mut t = self.tables.lock().await;
        t.check_unique(None, &user.email, user.mobile.as_deref())?;
        let now = Utc::now();
        let id = t.id();
        let row = User {
            id,
            full_name: user.full_name.clone(),
            gender: user.gender.clone(),
            dob: user.dob,
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            occupation: user.occupation.clone(),
            location: user.location.clone(),
            community: user.community.clone(),
            kulam: user.kulam.clone(),
            profile_photo: user.profile_photo.clone(),
            govt_id_type: user.govt_id_type.clone(),
            govt_id_file: user.govt_id_file.clone(),
            status: UserStatus::Pending,
            blood_group: None,
            education: None,
            job_title: None,
            company: None,
            work_location: None,
            skills: None,
            city: None,
            district: None,
            created_at: now,
            updated_at: now,
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.lock().await.user(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_mobile(&self, mobile: &str) -> Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.mobile.as_deref() == Some(mobile)).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn update(&self, id: i64, patch: &UserPatch) -> Result<Option<User>> {
        let mut t = self.tables.lock().await;
        let Some(mut user) = t.user(id).cloned() else {
            return Ok(None);
        };
        patch.apply_to(&mut user);
        t.check_unique(Some(id), &user.email, user.mobile.as_deref())?;
        user.updated_at = Utc::now();
        if let Some(slot) = t.users.iter_mut().find(|u| u.id == id) {
            *slot = user.clone();
        }
        Ok(Some(user))
    }

    async fn list(&self, status: Option<UserStatus>, limit: i64, offset: i64) -> Result<(Vec<User>, i64)> {
        let t = self.tables.lock().await;
        let mut users: Vec<User> = t
            .users
            .iter()
            .filter(|u| status.map_or(true, |s| u.status == s))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = users.len() as i64;
        Ok((page(&users, limit, offset), total))
    }

    async fn list_pending(&self) -> Result<Vec<User>> {
        let t = self.tables.lock().await;
        let mut users: Vec<User> = t
            .users
            .iter()
            .filter(|u| u.status == UserStatus::Pending)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn count_by_status(&self) -> Result<HashMap<UserStatus, i64>> {
        let t = self.tables.lock().await;
        let mut counts = HashMap::new();
        for user in &t.users {
            *counts.entry(user.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl OtpRepository for MemoryStore {
    async fn latest_for_user(&self, user_id: i64) -> Result<Option<Otp>> {
        let t = self.tables.lock().await;
        Ok(t.otps
            .iter()
            .filter(|o| o.user_id == user_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn issue(&self, otp: &NewOtp, cooldown_since: DateTime<Utc>) -> Result<Option<Otp>> {
        let mut t = self.tables.lock().await;
        let recent = t
            .otps
            .iter()
            .any(|o| o.user_id == otp.user_id && o.created_at > cooldown_since);
        if recent {
            return Ok(None);
        }
        for earlier in t.otps.iter_mut().filter(|o| o.user_id == otp.user_id) {
            earlier.is_used = true;
        }
        let id = t.id();
        let row = Otp {
            id,
            user_id: otp.user_id,
            otp_hash: otp.otp_hash.clone(),
            expires_at: otp.expires_at,
            is_used: false,
            created_at: otp.created_at,
        };
        t.otps.push(row.clone());
        Ok(Some(row))
    }

    async fn mark_used(&self, id: i64) -> Result<bool> {
        let mut t = self.tables.lock().await;
        match t.otps.iter_mut().find(|o| o.id == id) {
            Some(otp) if !otp.is_used => {
                otp.is_used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_or_create(&self, user_id: i64) -> Result<UserProfile> {
        let mut t = self.tables.lock().await;
        let index = t.ensure_profile(user_id);
        Ok(t.profiles[index].clone())
    }

    async fn find_by_user_ids(&self, user_ids: &[i64]) -> Result<Vec<UserProfile>> {
        let t = self.tables.lock().await;
        Ok(t.profiles
            .iter()
            .filter(|p| user_ids.contains(&p.user_id))
            .cloned()
            .collect())
    }

    async fn save_section(&self, user_id: i64, section: ProfileSection, data: Value) -> Result<UserProfile> {
        if section == ProfileSection::Basic {
            return Err(AppError::BadRequest(
                "Basic section is stored on the user record".to_string(),
            ));
        }
        let mut t = self.tables.lock().await;
        let index = t.ensure_profile(user_id);
        let profile = &mut t.profiles[index];
        profile.set_raw_section(section, data);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn stage_update(
        &self,
        user_id: i64,
        section: RestrictedSection,
        data: &SectionData,
    ) -> Result<PendingProfileUpdate> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let allowed = section.allowed_keys();

        let existing = t.pending_updates.iter_mut().find(|u| {
            u.user_id == user_id && u.section == section && u.status == ReviewStatus::Pending
        });
        if let Some(update) = existing {
            let base = normalize_json_column(Some(&update.data), Some(allowed)).unwrap_or_default();
            update.data = Value::Object(merge_section(base, data, allowed));
            update.submitted_at = now;
            update.updated_at = now;
            return Ok(update.clone());
        }

        let id = t.id();
        let row = PendingProfileUpdate {
            id,
            user_id,
            section,
            data: Value::Object(merge_section(SectionData::new(), data, allowed)),
            status: ReviewStatus::Pending,
            submitted_at: now,
            reviewed_at: None,
            reviewed_by: None,
            admin_remarks: None,
            created_at: now,
            updated_at: now,
        };
        t.pending_updates.push(row.clone());
        Ok(row)
    }

    async fn find_update(&self, id: i64) -> Result<Option<PendingProfileUpdate>> {
        let t = self.tables.lock().await;
        Ok(t.pending_updates.iter().find(|u| u.id == id).cloned())
    }

    async fn list_pending_updates(&self) -> Result<Vec<PendingProfileUpdate>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<PendingProfileUpdate> = t
            .pending_updates
            .iter()
            .filter(|u| u.status == ReviewStatus::Pending)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn updates_for_user(&self, user_id: i64) -> Result<Vec<PendingProfileUpdate>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<PendingProfileUpdate> = t
            .pending_updates
            .iter()
            .filter(|u| u.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn count_pending_updates(&self) -> Result<i64> {
        let t = self.tables.lock().await;
        Ok(t.pending_updates
            .iter()
            .filter(|u| u.status == ReviewStatus::Pending)
            .count() as i64)
    }

    async fn approve_update(
        &self,
        id: i64,
        reviewed_by: &str,
        remarks: Option<&str>,
    ) -> Result<ReviewOutcome<PendingProfileUpdate>> {
        let mut t = self.tables.lock().await;
        let Some(index) = t.pending_updates.iter().position(|u| u.id == id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        if t.pending_updates[index].status != ReviewStatus::Pending {
            return Ok(ReviewOutcome::NotPending);
        }

        let now = Utc::now();
        let (user_id, section, data) = {
            let update = &t.pending_updates[index];
            (update.user_id, update.section.section(), update.data.clone())
        };
        let profile_index = t.ensure_profile(user_id);
        let profile = &mut t.profiles[profile_index];
        profile.set_raw_section(section, data);
        profile.updated_at = now;

        let update = &mut t.pending_updates[index];
        update.status = ReviewStatus::Approved;
        update.reviewed_at = Some(now);
        update.reviewed_by = Some(reviewed_by.to_string());
        update.admin_remarks = remarks.map(str::to_string);
        update.updated_at = now;
        Ok(ReviewOutcome::Reviewed(update.clone()))
    }

    async fn reject_update(
        &self,
        id: i64,
        reviewed_by: &str,
        remarks: &str,
    ) -> Result<ReviewOutcome<PendingProfileUpdate>> {
        let mut t = self.tables.lock().await;
        let Some(update) = t.pending_updates.iter_mut().find(|u| u.id == id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        if update.status != ReviewStatus::Pending {
            return Ok(ReviewOutcome::NotPending);
        }
        let now = Utc::now();
        update.status = ReviewStatus::Rejected;
        update.reviewed_at = Some(now);
        update.reviewed_by = Some(reviewed_by.to_string());
        update.admin_remarks = Some(remarks.to_string());
        update.updated_at = now;
        Ok(ReviewOutcome::Reviewed(update.clone()))
    }
}

#[async_trait]
impl VerificationRepository for MemoryStore {
    async fn decide(&self, decision: &NewAdminVerification) -> Result<ReviewOutcome<User>> {
        let mut t = self.tables.lock().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == decision.user_id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        if user.status != UserStatus::Pending {
            return Ok(ReviewOutcome::NotPending);
        }
        let now = Utc::now();
        user.status = match decision.decision {
            VerificationDecision::Approved => UserStatus::Approved,
            VerificationDecision::Rejected => UserStatus::Rejected,
        };
        user.updated_at = now;
        let decided = user.clone();

        let id = t.id();
        t.verifications.push(AdminVerification {
            id,
            user_id: decision.user_id,
            decision: decision.decision,
            verified_by: decision.verified_by.clone(),
            verified_at: now,
            remarks: decision.remarks.clone(),
            created_at: now,
        });
        Ok(ReviewOutcome::Reviewed(decided))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<AdminVerification>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<AdminVerification> = t
            .verifications
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.verified_at.cmp(&a.verified_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let id = t.id();
        let row = Post {
            id,
            user_id: post.user_id,
            post_type: post.post_type,
            title: post.title.clone(),
            description: post.description.clone(),
            media_url: post.media_url.clone(),
            pinned: post.pinned,
            urgent: post.urgent,
            meetup_at: post.meetup_at,
            job_status: post.job_status,
            created_at: now,
            updated_at: now,
        };
        t.posts.push(row.clone());
        Ok(row)
    }

    async fn find(&self, id: i64) -> Result<Option<Post>> {
        let t = self.tables.lock().await;
        Ok(t.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, id: i64, patch: &PostPatch) -> Result<Option<Post>> {
        let mut t = self.tables.lock().await;
        let Some(post) = t.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        patch.apply_to(post);
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut t = self.tables.lock().await;
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        if t.posts.len() == before {
            return Ok(false);
        }
        t.likes.retain(|(post_id, _)| *post_id != id);
        t.comments.retain(|c| c.post_id != id);
        t.reports.retain(|r| r.post_id != id);
        t.saved.retain(|(_, post_id, _)| *post_id != id);
        Ok(true)
    }

    async fn engagement_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, (i64, i64)>> {
        let t = self.tables.lock().await;
        Ok(post_ids
            .iter()
            .map(|id| {
                let likes = t.likes.iter().filter(|(p, _)| p == id).count() as i64;
                let comments = t.comments.iter().filter(|c| c.post_id == *id).count() as i64;
                (*id, (likes, comments))
            })
            .collect())
    }

    async fn is_liked(&self, post_id: i64, user_id: i64) -> Result<bool> {
        let t = self.tables.lock().await;
        Ok(t.likes.contains(&(post_id, user_id)))
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeToggle> {
        let mut t = self.tables.lock().await;
        let liked = if t.likes.contains(&(post_id, user_id)) {
            t.likes.retain(|l| *l != (post_id, user_id));
            false
        } else {
            t.likes.push((post_id, user_id));
            true
        };
        let like_count = t.likes.iter().filter(|(p, _)| *p == post_id).count() as i64;
        Ok(LikeToggle { liked, like_count })
    }

    async fn add_comment(&self, post_id: i64, user_id: i64, body: &str) -> Result<Comment> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let id = t.id();
        let row = Comment {
            id,
            post_id,
            user_id,
            body: body.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.comments.push(row.clone());
        Ok(row)
    }

    async fn list_comments(&self, post_id: i64, limit: i64, offset: i64) -> Result<(Vec<Comment>, i64)> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Comment> = t.comments.iter().filter(|c| c.post_id == post_id).cloned().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let total = rows.len() as i64;
        Ok((page(&rows, limit, offset), total))
    }

    async fn create_report(&self, post_id: i64, reporter_id: i64, reason: &str) -> Result<Option<PostReport>> {
        let mut t = self.tables.lock().await;
        if t.reports
            .iter()
            .any(|r| r.post_id == post_id && r.reporter_id == reporter_id)
        {
            return Ok(None);
        }
        let now = Utc::now();
        let id = t.id();
        let row = PostReport {
            id,
            reporter_id,
            post_id,
            reason: reason.to_string(),
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.reports.push(row.clone());
        Ok(Some(row))
    }

    async fn toggle_save(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let mut t = self.tables.lock().await;
        let before = t.saved.len();
        t.saved.retain(|(u, p, _)| !(*u == user_id && *p == post_id));
        if t.saved.len() != before {
            return Ok(false);
        }
        t.saved.push((user_id, post_id, Utc::now()));
        Ok(true)
    }

    async fn feed(&self, community: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Post>, i64)> {
        let t = self.tables.lock().await;
        let mut posts: Vec<Post> = t
            .posts
            .iter()
            .filter(|p| {
                t.user(p.user_id)
                    .map(|u| u.is_approved() && u.community.as_deref() == community)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        newest_first(&mut posts);
        let total = posts.len() as i64;
        Ok((page(&posts, limit, offset), total))
    }

    async fn quick_action_counts(&self) -> Result<QuickActionCounts> {
        let t = self.tables.lock().await;
        let mut counts = QuickActionCounts::default();
        for post in t.posts.iter().filter(|p| t.author_approved(p)) {
            counts.total_posts += 1;
            match post.post_type {
                PostType::Job if post.job_status == Some(JobStatus::Open) => counts.open_jobs += 1,
                PostType::Marketplace => counts.marketplace_items += 1,
                PostType::Matrimony => counts.matrimony_profiles += 1,
                PostType::HelpRequest => counts.helping_hand_requests += 1,
                PostType::Announcement => counts.community_updates += 1,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn highlights(&self, now: DateTime<Utc>, limit: i64) -> Result<Highlights> {
        let t = self.tables.lock().await;
        let approved: Vec<Post> = t.posts.iter().filter(|p| t.author_approved(p)).cloned().collect();

        let mut pinned: Vec<Post> = approved
            .iter()
            .filter(|p| p.post_type == PostType::Announcement && p.pinned)
            .cloned()
            .collect();
        newest_first(&mut pinned);

        let mut meetups: Vec<Post> = approved
            .iter()
            .filter(|p| p.post_type == PostType::Meetup && p.meetup_at.map_or(false, |at| at >= now))
            .cloned()
            .collect();
        meetups.sort_by_key(|p| p.meetup_at);

        let mut urgent: Vec<Post> = approved
            .iter()
            .filter(|p| p.post_type == PostType::HelpRequest && p.urgent)
            .cloned()
            .collect();
        newest_first(&mut urgent);

        Ok(Highlights {
            pinned_announcements: page(&pinned, limit, 0),
            upcoming_meetups: page(&meetups, limit, 0),
            urgent_help_requests: page(&urgent, limit, 0),
        })
    }

    async fn user_post_stats(&self, user_id: i64) -> Result<UserPostStats> {
        let t = self.tables.lock().await;
        let mut stats = UserPostStats::default();
        for post in t.posts.iter().filter(|p| p.user_id == user_id) {
            stats.total_posts += 1;
            match post.post_type {
                PostType::Job => stats.jobs_posted += 1,
                PostType::Marketplace => stats.marketplace_listings += 1,
                PostType::HelpRequest => stats.helping_hand_requests += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn activity(&self, user_id: i64, tab: ActivityTab, limit: i64, offset: i64) -> Result<(Vec<Post>, i64)> {
        let t = self.tables.lock().await;
        let mut posts: Vec<Post> = t
            .posts
            .iter()
            .filter(|p| match tab {
                ActivityTab::My => p.user_id == user_id,
                ActivityTab::Saved => t.saved.iter().any(|(u, post, _)| *u == user_id && *post == p.id),
                ActivityTab::Liked => t.likes.contains(&(p.id, user_id)),
            })
            .cloned()
            .collect();
        newest_first(&mut posts);
        let total = posts.len() as i64;
        Ok((page(&posts, limit, offset), total))
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(self.tables.lock().await.posts.len() as i64)
    }

    async fn count_pending_reports(&self) -> Result<i64> {
        let t = self.tables.lock().await;
        Ok(t.reports
            .iter()
            .filter(|r| r.status == ReportStatus::Pending)
            .count() as i64)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create(&self, user_id: i64, title: &str, body: Option<&str>) -> Result<Notification> {
        let mut t = self.tables.lock().await;
        let id = t.id();
        let row = Notification {
            id,
            user_id,
            title: title.to_string(),
            body: body.map(str::to_string),
            read_at: None,
            created_at: Utc::now(),
        };
        t.notifications.push(row.clone());
        Ok(row)
    }

    async fn unread_count(&self, user_id: i64) -> Result<i64> {
        let t = self.tables.lock().await;
        Ok(t.notifications
            .iter()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
            .count() as i64)
    }

    async fn unread_messages(&self, user_id: i64) -> Result<i64> {
        let t = self.tables.lock().await;
        Ok(t.unread_messages.get(&user_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl MediaRepository for MemoryStore {
    async fn create(&self, media: &NewMediaFile) -> Result<MediaFile> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let id = t.id();
        let row = MediaFile {
            id,
            user_id: media.user_id,
            module: media.module,
            file_url: media.file_url.clone(),
            file_type: media.file_type,
            status: ReviewStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.media.push(row.clone());
        Ok(row)
    }

    async fn list_pending(&self) -> Result<Vec<MediaFile>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<MediaFile> = t
            .media
            .iter()
            .filter(|m| m.status == ReviewStatus::Pending)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn count_pending(&self) -> Result<i64> {
        let t = self.tables.lock().await;
        Ok(t.media.iter().filter(|m| m.status == ReviewStatus::Pending).count() as i64)
    }

    async fn review(&self, id: i64, status: ReviewStatus) -> Result<ReviewOutcome<MediaFile>> {
        let mut t = self.tables.lock().await;
        let Some(media) = t.media.iter_mut().find(|m| m.id == id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        if media.status != ReviewStatus::Pending {
            return Ok(ReviewOutcome::NotPending);
        }
        media.status = status;
        media.updated_at = Utc::now();
        Ok(ReviewOutcome::Reviewed(media.clone()))
    }
}

#[async_trait]
impl OptionsRepository for MemoryStore {
    async fn list(&self, kind: OptionKind) -> Result<Vec<OptionItem>> {
        let t = self.tables.lock().await;
        let table = match kind {
            OptionKind::Location => &t.locations,
            OptionKind::Kulam => &t.kulams,
        };
        let mut rows = table.clone();
        rows.sort_by(|(a, sa), (b, sb)| sa.cmp(sb).then_with(|| a.name.cmp(&b.name)));
        Ok(rows.into_iter().map(|(item, _)| item).collect())
    }

    async fn seed_if_empty(&self, kind: OptionKind, names: &[&str]) -> Result<usize> {
        let mut t = self.tables.lock().await;
        let empty = match kind {
            OptionKind::Location => t.locations.is_empty(),
            OptionKind::Kulam => t.kulams.is_empty(),
        };
        if !empty {
            return Ok(0);
        }
        for (index, name) in names.iter().enumerate() {
            let id = t.id();
            let row = (
                OptionItem {
                    id,
                    name: name.to_string(),
                },
                index as i32 + 1,
            );
            match kind {
                OptionKind::Location => t.locations.push(row),
                OptionKind::Kulam => t.kulams.push(row),
            }
        }
        Ok(names.len())
    }
}
