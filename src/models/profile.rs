use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// Allow-listed key/value content of one profile section.
pub type SectionData = Map<String, Value>;

pub const COMMUNITY_KEYS: &[&str] = &["kulam", "kulaDeivam", "nativeVillage", "nativeTaluk"];

pub const PERSONAL_KEYS: &[&str] = &[
    "currentLocation",
    "occupation",
    "instagram",
    "facebook",
    "linkedin",
    "hobbies",
    "fatherName",
    "maritalStatus",
];

pub const MATRIMONY_KEYS: &[&str] = &[
    "matrimonyProfileActive",
    "lookingFor",
    "education",
    "maritalStatus",
    "rashi",
    "nakshatram",
    "dosham",
    "familyType",
    "familyStatus",
    "motherName",
    "fatherOccupation",
    "numberOfSiblings",
    "partnerPreferences",
    "horoscopeDocumentUrl",
];

pub const BUSINESS_KEYS: &[&str] = &[
    "businessProfileActive",
    "businessName",
    "businessType",
    "businessDescription",
    "businessAddress",
    "businessPhone",
    "businessWebsite",
];

pub const FAMILY_KEYS: &[&str] = &[
    "familyMemberId1",
    "familyMemberId2",
    "familyMemberId3",
    "familyMemberId4",
    "familyMemberId5",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSection {
    Basic,
    Community,
    Personal,
    Matrimony,
    Business,
    Family,
}

impl ProfileSection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(ProfileSection::Basic),
            "community" => Some(ProfileSection::Community),
            "personal" => Some(ProfileSection::Personal),
            "matrimony" => Some(ProfileSection::Matrimony),
            "business" => Some(ProfileSection::Business),
            "family" => Some(ProfileSection::Family),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileSection::Basic => "basic",
            ProfileSection::Community => "community",
            ProfileSection::Personal => "personal",
            ProfileSection::Matrimony => "matrimony",
            ProfileSection::Business => "business",
            ProfileSection::Family => "family",
        }
    }

    /// Keys that may be persisted for a JSON-backed section. `Basic` lives on the user row.
    pub fn allowed_keys(&self) -> Option<&'static [&'static str]> {
        match self {
            ProfileSection::Basic => None,
            ProfileSection::Community => Some(COMMUNITY_KEYS),
            ProfileSection::Personal => Some(PERSONAL_KEYS),
            ProfileSection::Matrimony => Some(MATRIMONY_KEYS),
            ProfileSection::Business => Some(BUSINESS_KEYS),
            ProfileSection::Family => Some(FAMILY_KEYS),
        }
    }

    /// Restricted sections are staged for admin approval instead of applied.
    pub fn restricted(&self) -> Option<RestrictedSection> {
        match self {
            ProfileSection::Matrimony => Some(RestrictedSection::Matrimony),
            ProfileSection::Business => Some(RestrictedSection::Business),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictedSection {
    Matrimony,
    Business,
}

impl RestrictedSection {
    pub fn section(&self) -> ProfileSection {
        match self {
            RestrictedSection::Matrimony => ProfileSection::Matrimony,
            RestrictedSection::Business => ProfileSection::Business,
        }
    }

    pub fn allowed_keys(&self) -> &'static [&'static str] {
        match self {
            RestrictedSection::Matrimony => MATRIMONY_KEYS,
            RestrictedSection::Business => BUSINESS_KEYS,
        }
    }
}

/// Shared by pending profile updates and media moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// A JSON section column as found in storage.
///
/// Rows written by older clients may hold the section as a JSON string
/// (double-encoded) or, worse, as that string spread into an object keyed by
/// character index. Decoding at the storage boundary keeps that recovery path
/// apart from the normal object path.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSection {
    Object(SectionData),
    LegacyString(String),
    Unusable,
}

impl StoredSection {
    pub fn decode(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => StoredSection::Object(map.clone()),
            Some(Value::String(s)) => StoredSection::LegacyString(s.clone()),
            _ => StoredSection::Unusable,
        }
    }

    fn into_object(self) -> Option<SectionData> {
        match self {
            StoredSection::Object(map) => Some(map),
            StoredSection::LegacyString(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
            StoredSection::Unusable => None,
        }
    }
}

/// Reduce a stored or submitted section value to its allow-listed keys.
///
/// Without an allow-list, purely numeric keys are dropped (they are the
/// residue of a string spread into an object). Returns `None` when nothing
/// survives.
pub fn normalize_json_column(
    value: Option<&Value>,
    allowed_keys: Option<&[&str]>,
) -> Option<SectionData> {
    let object = StoredSection::decode(value).into_object()?;
    let out: SectionData = match allowed_keys {
        Some(keys) => keys
            .iter()
            .filter_map(|k| object.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect(),
        None => object
            .into_iter()
            .filter(|(k, _)| !is_numeric_key(k))
            .collect(),
    };
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn is_numeric_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Merge `payload` over `base` (payload wins) keeping only allow-listed keys.
pub fn merge_section(base: SectionData, payload: &SectionData, allowed_keys: &[&str]) -> SectionData {
    let mut merged = base;
    for (k, v) in payload {
        merged.insert(k.clone(), v.clone());
    }
    merged
        .into_iter()
        .filter(|(k, _)| allowed_keys.contains(&k.as_str()))
        .collect()
}

#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub community: Option<Value>,
    pub personal: Option<Value>,
    pub matrimony: Option<Value>,
    pub business: Option<Value>,
    pub family: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn raw_section(&self, section: ProfileSection) -> Option<&Value> {
        match section {
            ProfileSection::Basic => None,
            ProfileSection::Community => self.community.as_ref(),
            ProfileSection::Personal => self.personal.as_ref(),
            ProfileSection::Matrimony => self.matrimony.as_ref(),
            ProfileSection::Business => self.business.as_ref(),
            ProfileSection::Family => self.family.as_ref(),
        }
    }

    pub fn section(&self, section: ProfileSection) -> Option<SectionData> {
        normalize_json_column(self.raw_section(section), section.allowed_keys())
    }

    pub fn set_raw_section(&mut self, section: ProfileSection, value: Value) {
        match section {
            ProfileSection::Basic => {}
            ProfileSection::Community => self.community = Some(value),
            ProfileSection::Personal => self.personal = Some(value),
            ProfileSection::Matrimony => self.matrimony = Some(value),
            ProfileSection::Business => self.business = Some(value),
            ProfileSection::Family => self.family = Some(value),
        }
    }
}

/// Staged edit of a restricted section awaiting admin review.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProfileUpdate {
    pub id: i64,
    pub user_id: i64,
    pub section: RestrictedSection,
    pub data: Value,
    pub status: ReviewStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub admin_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
