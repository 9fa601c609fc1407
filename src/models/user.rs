use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Membership lifecycle. Only `Approved` users may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Pending,
    Approved,
    Rejected,
    PendingReview,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "PENDING",
            UserStatus::Approved => "APPROVED",
            UserStatus::Rejected => "REJECTED",
            UserStatus::PendingReview => "PENDING_REVIEW",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(UserStatus::Pending),
            "APPROVED" => Some(UserStatus::Approved),
            "REJECTED" => Some(UserStatus::Rejected),
            "PENDING_REVIEW" => Some(UserStatus::PendingReview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub email: String,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
    pub community: Option<String>,
    pub kulam: Option<String>,
    pub profile_photo: Option<String>,
    pub govt_id_type: Option<String>,
    pub govt_id_file: Option<String>,
    pub status: UserStatus,
    pub blood_group: Option<String>,
    pub education: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub work_location: Option<String>,
    pub skills: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_approved(&self) -> bool {
        self.status == UserStatus::Approved
    }
}

/// Registration payload after trimming and normalization.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub full_name: String,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub email: String,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
    pub community: Option<String>,
    pub kulam: Option<String>,
    pub profile_photo: Option<String>,
    pub govt_id_type: Option<String>,
    pub govt_id_file: Option<String>,
}

/// Partial update of user columns. `None` leaves a column untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub dob: Option<Option<NaiveDate>>,
    pub mobile: Option<Option<String>>,
    pub gender: Option<Option<String>>,
    pub profile_photo: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub district: Option<Option<String>>,
    pub education: Option<Option<String>>,
    pub job_title: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub work_location: Option<Option<String>>,
    pub skills: Option<Option<String>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.dob.is_none()
            && self.mobile.is_none()
            && self.gender.is_none()
            && self.profile_photo.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.education.is_none()
            && self.job_title.is_none()
            && self.company.is_none()
            && self.work_location.is_none()
            && self.skills.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.full_name {
            user.full_name = v.clone();
        }
        if let Some(v) = &self.dob {
            user.dob = *v;
        }
        let text_fields: [(&Option<Option<String>>, &mut Option<String>); 10] = [
            (&self.mobile, &mut user.mobile),
            (&self.gender, &mut user.gender),
            (&self.profile_photo, &mut user.profile_photo),
            (&self.city, &mut user.city),
            (&self.district, &mut user.district),
            (&self.education, &mut user.education),
            (&self.job_title, &mut user.job_title),
            (&self.company, &mut user.company),
            (&self.work_location, &mut user.work_location),
            (&self.skills, &mut user.skills),
        ];
        for (patch, target) in text_fields {
            if let Some(v) = patch {
                *target = v.clone();
            }
        }
    }
}

/// One-time login code row. Only the hash is stored.
#[derive(Debug, Clone, FromRow)]
pub struct Otp {
    pub id: i64,
    pub user_id: i64,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOtp {
    pub user_id: i64,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationDecision {
    Approved,
    Rejected,
}

/// Append-only audit of admin approval decisions.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminVerification {
    pub id: i64,
    pub user_id: i64,
    pub decision: VerificationDecision,
    pub verified_by: String,
    pub verified_at: DateTime<Utc>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAdminVerification {
    pub user_id: i64,
    pub decision: VerificationDecision,
    pub verified_by: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub body: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lookup entry for registration dropdowns (locations, kulams).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OptionItem {
    pub id: i64,
    pub name: String,
}
