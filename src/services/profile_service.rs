//! Member profile: the masked overview, self-service edits and staging of
//! restricted sections.
//!
//! Basic fields live on the user row. Community, personal and family sections
//! apply immediately. Matrimony and business edits are merged into the single
//! PENDING update for that section and only go live when an admin approves.

use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{
    merge_section, ActivityTab, JobStatus, PendingProfileUpdate, PostType, ProfileSection,
    RestrictedSection, ReviewStatus, SectionData, User, UserPatch, UserProfile,
};
use crate::repository::Repositories;
use crate::services::page_offset;
use crate::services::storage::{display_url, ObjectStorage};
use crate::AppState;

const HOROSCOPE_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];
const HOROSCOPE_MAX_BYTES: i64 = 10 * 1024 * 1024;

const BASIC_FIELDS: usize = 7;
const COMMUNITY_FIELDS: usize = 4;
const PERSONAL_FIELDS: usize = 7;
const FAMILY_FIELDS: usize = 5;
const MATRIMONY_FIELDS: usize = 14;
const BUSINESS_FIELDS: usize = 7;

/// `XXXXXX7890`
pub fn mask_mobile(mobile: Option<&str>) -> String {
    let mobile = mobile.map(str::trim).unwrap_or_default();
    if mobile.is_empty() {
        return "—".to_string();
    }
    let chars: Vec<char> = mobile.chars().collect();
    if chars.len() <= 4 {
        return "XXXX".to_string();
    }
    let last4: String = chars[chars.len() - 4..].iter().collect();
    format!("XXXXXX{last4}")
}

/// `go****@gmail.com`
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return "—".to_string();
    };
    if local.chars().count() <= 2 {
        return format!("****@{domain}");
    }
    let visible: String = local.chars().take(2).collect();
    format!("{visible}****@{domain}")
}

#[derive(Debug, Clone, Serialize)]
pub struct BasicSection {
    pub full_name: String,
    pub date_of_birth: Option<String>,
    pub email: String,
    pub mobile: Option<String>,
    pub gender: Option<String>,
    pub native_district: Option<String>,
    pub role: Option<String>,
}

impl BasicSection {
    fn from_user(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            date_of_birth: user.dob.map(|d| d.to_string()),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            gender: user.gender.clone(),
            native_district: None,
            role: None,
        }
    }

    fn filled(&self) -> usize {
        let text = |v: Option<&str>| v.is_some_and(|s| !s.is_empty());
        [
            text(Some(self.full_name.as_str())),
            self.date_of_birth.is_some(),
            text(Some(self.email.as_str())),
            text(self.mobile.as_deref()),
            text(self.gender.as_deref()),
            text(self.native_district.as_deref()),
            text(self.role.as_deref()),
        ]
        .into_iter()
        .filter(|f| *f)
        .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSections {
    pub basic: BasicSection,
    pub community: Option<SectionData>,
    pub personal: Option<SectionData>,
    pub matrimony: Option<SectionData>,
    pub business: Option<SectionData>,
    pub family: Option<SectionData>,
}

/// Sections with the completion figures derived from them.
#[derive(Debug, Clone)]
pub struct SectionSummary {
    pub sections: ProfileSections,
    pub completion_percentage: u8,
    pub show_matrimony: bool,
    pub show_business: bool,
}

/// Non-empty values: null and "" do not count, zero and false do.
fn count_filled(section: Option<&SectionData>) -> usize {
    section.map_or(0, |data| {
        data.values()
            .filter(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            })
            .count()
    })
}

fn flag_enabled(section: Option<&SectionData>, key: &str) -> bool {
    section.and_then(|d| d.get(key)) == Some(&Value::Bool(true))
}

pub fn summarize_sections(user: &User, profile: &UserProfile) -> SectionSummary {
    let sections = ProfileSections {
        basic: BasicSection::from_user(user),
        community: profile.section(ProfileSection::Community),
        personal: profile.section(ProfileSection::Personal),
        matrimony: profile.section(ProfileSection::Matrimony),
        business: profile.section(ProfileSection::Business),
        family: profile.section(ProfileSection::Family),
    };

    let show_matrimony = flag_enabled(sections.matrimony.as_ref(), "matrimonyProfileActive");
    let show_business = flag_enabled(sections.business.as_ref(), "businessProfileActive");

    let mut total = BASIC_FIELDS + COMMUNITY_FIELDS + PERSONAL_FIELDS + FAMILY_FIELDS;
    let mut filled = sections.basic.filled()
        + count_filled(sections.community.as_ref())
        + count_filled(sections.personal.as_ref())
        + count_filled(sections.family.as_ref());
    if show_matrimony {
        total += MATRIMONY_FIELDS;
        filled += count_filled(sections.matrimony.as_ref());
    }
    if show_business {
        total += BUSINESS_FIELDS;
        filled += count_filled(sections.business.as_ref());
    }

    let percentage = (100.0 * filled as f64 / total as f64).round().min(100.0);

    SectionSummary {
        sections,
        completion_percentage: percentage as u8,
        show_matrimony,
        show_business,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalInfo {
    pub masked_mobile: String,
    pub masked_email: String,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub blood_group: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfessionalInfo {
    pub education: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub work_location: Option<String>,
    pub skills: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePostCounts {
    pub total_posts: i64,
    pub jobs_posted: i64,
    pub marketplace_items: i64,
    pub help_requests: i64,
}

/// Review chip for a restricted section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingChip {
    pub status: ReviewStatus,
    pub admin_remarks: Option<String>,
}

/// PENDING wins; otherwise the latest decision on that section.
pub fn pending_chip(updates: &[PendingProfileUpdate], section: RestrictedSection) -> Option<PendingChip> {
    let for_section = updates.iter().filter(|u| u.section == section);
    if for_section.clone().any(|u| u.status == ReviewStatus::Pending) {
        return Some(PendingChip {
            status: ReviewStatus::Pending,
            admin_remarks: None,
        });
    }
    let latest = for_section.max_by_key(|u| (u.submitted_at, u.id))?;
    match latest.status {
        ReviewStatus::Rejected => Some(PendingChip {
            status: ReviewStatus::Rejected,
            admin_remarks: latest.admin_remarks.clone(),
        }),
        ReviewStatus::Approved => Some(PendingChip {
            status: ReviewStatus::Approved,
            admin_remarks: None,
        }),
        ReviewStatus::Pending => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileOverview {
    pub id: i64,
    pub name: String,
    pub profile_image: Option<String>,
    pub verified: bool,
    pub member_since: String,
    pub personal_info: PersonalInfo,
    pub professional_info: ProfessionalInfo,
    pub stats: ProfilePostCounts,
    pub completion_percentage: u8,
    pub show_matrimony: bool,
    pub show_business: bool,
    pub sections: ProfileSections,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_matrimony: Option<PendingChip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_business: Option<PendingChip>,
}

/// Editable, non-restricted columns. `Some(None)` clears a field.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub profile_image: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub district: Option<Option<String>>,
    pub education: Option<Option<String>>,
    pub job_title: Option<Option<String>>,
    pub company_name: Option<Option<String>>,
    pub work_location: Option<Option<String>>,
    pub skills: Option<Option<String>>,
}

/// Trimmed; blank becomes null.
fn clean_text(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

impl ProfileEdit {
    fn into_patch(self) -> UserPatch {
        UserPatch {
            profile_photo: clean_text(self.profile_image),
            city: clean_text(self.city),
            district: clean_text(self.district),
            education: clean_text(self.education),
            job_title: clean_text(self.job_title),
            company: clean_text(self.company_name),
            work_location: clean_text(self.work_location),
            skills: clean_text(self.skills),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_posts: i64,
    pub jobs_posted: i64,
    pub marketplace_listings: i64,
    pub helping_hand_requests: i64,
    pub joined_communities: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub post_id: i64,
    pub title: String,
    pub post_type: String,
    pub created_at: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub items: Vec<ActivityItem>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub upload_url: String,
    pub public_url: String,
}

pub struct ProfileService {
    repos: Repositories,
    storage: Arc<dyn ObjectStorage>,
}

impl ProfileService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            storage: state.storage.clone(),
        }
    }

    async fn load_user(&self, user_id: i64) -> Result<User> {
        self.repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn overview(&self, user_id: i64) -> Result<ProfileOverview> {
        let user = self.load_user(user_id).await?;
        let profile = self.repos.profiles.get_or_create(user_id).await?;
        let counts = self.repos.posts.user_post_stats(user_id).await?;
        let updates = self.repos.profiles.updates_for_user(user_id).await?;

        let summary = summarize_sections(&user, &profile);
        let profile_image = display_url(self.storage.as_ref(), user.profile_photo.as_deref()).await;

        Ok(ProfileOverview {
            id: user.id,
            name: user.full_name.clone(),
            profile_image,
            verified: user.is_approved(),
            member_since: user.created_at.year().to_string(),
            personal_info: PersonalInfo {
                masked_mobile: mask_mobile(user.mobile.as_deref()),
                masked_email: mask_email(&user.email),
                gender: user.gender.clone(),
                dob: user.dob.map(|d| d.to_string()),
                blood_group: user.blood_group.clone(),
                city: user.city.clone(),
                district: user.district.clone(),
            },
            professional_info: ProfessionalInfo {
                education: user.education.clone(),
                job_title: user.job_title.clone().or_else(|| user.occupation.clone()),
                company_name: user.company.clone(),
                work_location: user.work_location.clone().or_else(|| user.location.clone()),
                skills: user.skills.clone(),
            },
            stats: ProfilePostCounts {
                total_posts: counts.total_posts,
                jobs_posted: counts.jobs_posted,
                marketplace_items: counts.marketplace_listings,
                help_requests: counts.helping_hand_requests,
            },
            completion_percentage: summary.completion_percentage,
            show_matrimony: summary.show_matrimony,
            show_business: summary.show_business,
            sections: summary.sections,
            pending_matrimony: pending_chip(&updates, RestrictedSection::Matrimony),
            pending_business: pending_chip(&updates, RestrictedSection::Business),
        })
    }

    /// Applies immediately and leaves the member's status alone.
    pub async fn update_profile(&self, user_id: i64, edit: ProfileEdit) -> Result<ProfileOverview> {
        self.load_user(user_id).await?;
        let patch = edit.into_patch();
        if !patch.is_empty() {
            self.repos.users.update(user_id, &patch).await?;
            info!(user_id = %user_id, "profile fields updated");
        }
        self.overview(user_id).await
    }

    pub async fn update_section(
        &self,
        user_id: i64,
        section: ProfileSection,
        payload: SectionData,
    ) -> Result<ProfileOverview> {
        let user = self.load_user(user_id).await?;

        if let Some(restricted) = section.restricted() {
            let staged = merge_section(SectionData::new(), &payload, restricted.allowed_keys());
            let update = self.repos.profiles.stage_update(user_id, restricted, &staged).await?;
            info!(
                user_id = %user_id,
                update_id = %update.id,
                section = %section.as_str(),
                "restricted section edit staged for review"
            );
            return self.overview(user_id).await;
        }

        match section.allowed_keys() {
            None => {
                let patch = self.basic_patch(&user, &payload).await?;
                if !patch.is_empty() {
                    self.repos.users.update(user_id, &patch).await?;
                }
            }
            Some(allowed) => {
                let profile = self.repos.profiles.get_or_create(user_id).await?;
                let current = profile.section(section).unwrap_or_default();
                let merged = merge_section(current, &payload, allowed);
                self.repos
                    .profiles
                    .save_section(user_id, section, Value::Object(merged))
                    .await?;
            }
        }

        info!(user_id = %user_id, section = %section.as_str(), "profile section updated");
        self.overview(user_id).await
    }

    async fn basic_patch(&self, user: &User, payload: &SectionData) -> Result<UserPatch> {
        let mut patch = UserPatch::default();

        if let Some(value) = payload.get("full_name") {
            let name = scalar_text(value).unwrap_or_default();
            if name.is_empty() {
                return Err(AppError::validation("full_name cannot be empty"));
            }
            patch.full_name = Some(name);
        }

        if let Some(value) = payload.get("date_of_birth") {
            patch.dob = Some(match scalar_text(value).filter(|s| !s.is_empty()) {
                Some(raw) => Some(parse_date(&raw)?),
                None => None,
            });
        }

        if let Some(value) = payload.get("mobile") {
            let mobile = scalar_text(value).filter(|s| !s.is_empty());
            if let Some(m) = mobile.as_deref() {
                if let Some(owner) = self.repos.users.find_by_mobile(m).await? {
                    if owner.id != user.id {
                        return Err(AppError::validation(
                            "An account with this mobile number already exists.",
                        ));
                    }
                }
            }
            patch.mobile = Some(mobile);
        }

        if let Some(value) = payload.get("gender") {
            patch.gender = Some(scalar_text(value).filter(|s| !s.is_empty()));
        }

        Ok(patch)
    }

    pub async fn stats(&self, user_id: i64) -> Result<ProfileStats> {
        let counts = self.repos.posts.user_post_stats(user_id).await?;
        Ok(ProfileStats {
            total_posts: counts.total_posts,
            jobs_posted: counts.jobs_posted,
            marketplace_listings: counts.marketplace_listings,
            helping_hand_requests: counts.helping_hand_requests,
            joined_communities: 0,
        })
    }

    pub async fn activity(&self, user_id: i64, tab: ActivityTab, page: i64, limit: i64) -> Result<ActivityPage> {
        let offset = page_offset(page, limit)?;
        let (posts, total) = self.repos.posts.activity(user_id, tab, limit, offset).await?;

        let items = posts
            .into_iter()
            .map(|p| ActivityItem {
                post_id: p.id,
                status: activity_status(p.post_type, p.job_status).to_string(),
                title: p.title,
                post_type: p.post_type.label().to_string(),
                created_at: p.created_at.to_rfc3339(),
            })
            .collect();

        Ok(ActivityPage {
            items,
            page,
            limit,
            total,
        })
    }

    /// Pre-signed PUT for a horoscope document. The client then stores the
    /// returned public URL in the matrimony section.
    pub async fn horoscope_upload_url(
        &self,
        user_id: i64,
        file_name: &str,
        file_type: &str,
        file_size: i64,
    ) -> Result<UploadTarget> {
        let mime = file_type.trim().to_lowercase();
        if !HOROSCOPE_TYPES.contains(&mime.as_str()) {
            return Err(AppError::BadRequest(
                "Horoscope must be PDF or image (jpeg, png)".to_string(),
            ));
        }
        if file_size > HOROSCOPE_MAX_BYTES {
            return Err(AppError::BadRequest("Horoscope file must be ≤ 10 MB".to_string()));
        }

        let ext = match Path::new(file_name).extension().and_then(|e| e.to_str()) {
            Some(e) if !e.is_empty() => format!(".{}", e.to_lowercase()),
            _ if mime.contains("pdf") => ".pdf".to_string(),
            _ => ".jpg".to_string(),
        };
        let key = format!(
            "{}/profile/{}/horoscope/{}{}",
            self.storage.key_prefix(),
            user_id,
            Utc::now().timestamp_millis(),
            ext
        );

        let upload_url = self.storage.presign_put(&key, &mime).await?;
        let public_url = self.storage.public_url(&key)?;
        info!(user_id = %user_id, key = %key, "horoscope upload URL issued");
        Ok(UploadTarget { upload_url, public_url })
    }
}

fn activity_status(post_type: PostType, job_status: Option<JobStatus>) -> &'static str {
    if post_type == PostType::Job && job_status == Some(JobStatus::Closed) {
        "Closed"
    } else {
        "Active"
    }
}

/// Strings are trimmed; numbers and booleans are rendered; anything else is absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `YYYY-MM-DD`, also accepting a full RFC 3339 timestamp.
fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| AppError::validation("date_of_birth must be a valid date (YYYY-MM-DD)"))
}
