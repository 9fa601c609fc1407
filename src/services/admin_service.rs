// Admin moderation: member approval, staged profile edits, media review
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{
    AdminVerification, MediaFile, NewAdminVerification, PendingProfileUpdate, ReviewStatus,
    SectionData, User, UserProfile, UserStatus, VerificationDecision,
};
use crate::repository::{Repositories, ReviewOutcome};
use crate::services::email_service::{mask_for_log, Mailer, OutgoingMail};
use crate::services::page_offset;
use crate::AppState;

const DEFAULT_REJECT_REMARKS: &str = "Rejected by admin";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub pending_review: i64,
}

impl UserCounts {
    fn from_map(counts: &HashMap<UserStatus, i64>) -> Self {
        let get = |status| counts.get(&status).copied().unwrap_or(0);
        let pending = get(UserStatus::Pending);
        let approved = get(UserStatus::Approved);
        let rejected = get(UserStatus::Rejected);
        let pending_review = get(UserStatus::PendingReview);
        Self {
            total: pending + approved + rejected + pending_review,
            pending,
            approved,
            rejected,
            pending_review,
        }
    }
}

/// Dashboard summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub users: UserCounts,
    pub total_posts: i64,
    pub pending_profile_updates: i64,
    pub pending_media: i64,
    pub pending_reports: i64,
}

/// A staged edit together with what is live today, for diffing.
#[derive(Debug, Clone)]
pub struct QueuedUpdate {
    pub update: PendingProfileUpdate,
    pub user: Option<User>,
    pub current_data: Option<SectionData>,
}

pub struct AdminService {
    repos: Repositories,
    mailer: Arc<dyn Mailer>,
}

impl AdminService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            mailer: state.mailer.clone(),
        }
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let by_status = self.repos.users.count_by_status().await?;
        Ok(DashboardStats {
            users: UserCounts::from_map(&by_status),
            total_posts: self.repos.posts.count_all().await?,
            pending_profile_updates: self.repos.profiles.count_pending_updates().await?,
            pending_media: self.repos.media.count_pending().await?,
            pending_reports: self.repos.posts.count_pending_reports().await?,
        })
    }

    /// Newest first. `page` starts at 1.
    pub async fn list_users(
        &self,
        status: Option<UserStatus>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64)> {
        let offset = page_offset(page, limit)?;
        self.repos.users.list(status, limit, offset).await
    }

    pub async fn list_pending_users(&self) -> Result<Vec<User>> {
        self.repos.users.list_pending().await
    }

    pub async fn user_detail(&self, user_id: i64) -> Result<(User, Vec<AdminVerification>)> {
        let user = self
            .repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let history = self.repos.verifications.list_for_user(user_id).await?;
        Ok((user, history))
    }

    pub async fn approve_user(&self, user_id: i64, admin: &str, remarks: Option<&str>) -> Result<User> {
        let remarks = remarks.map(str::trim).filter(|r| !r.is_empty());
        let user = self
            .decide(user_id, admin, VerificationDecision::Approved, remarks.map(str::to_string))
            .await?;

        let mail = OutgoingMail::approval(&user.email, &user.full_name, remarks);
        self.notify(&user, mail).await;
        Ok(user)
    }

    pub async fn reject_user(&self, user_id: i64, admin: &str, remarks: &str) -> Result<User> {
        let remarks = remarks.trim();
        let stored = if remarks.is_empty() { DEFAULT_REJECT_REMARKS } else { remarks };
        let user = self
            .decide(user_id, admin, VerificationDecision::Rejected, Some(stored.to_string()))
            .await?;

        let reason = (!remarks.is_empty()).then_some(remarks);
        let mail = OutgoingMail::rejection(&user.email, &user.full_name, reason);
        self.notify(&user, mail).await;
        Ok(user)
    }

    async fn decide(
        &self,
        user_id: i64,
        admin: &str,
        decision: VerificationDecision,
        remarks: Option<String>,
    ) -> Result<User> {
        let outcome = self
            .repos
            .verifications
            .decide(&NewAdminVerification {
                user_id,
                decision,
                verified_by: admin.to_string(),
                remarks,
            })
            .await?;

        match outcome {
            ReviewOutcome::Reviewed(user) => {
                info!(user_id = %user_id, admin = %admin, decision = ?decision, "member reviewed");
                Ok(user)
            }
            ReviewOutcome::NotFound => Err(AppError::NotFound("User not found.".to_string())),
            ReviewOutcome::NotPending => Err(AppError::Conflict("User is not pending approval.".to_string())),
        }
    }

    /// Decision mails never fail the admin action.
    async fn notify(&self, user: &User, mail: OutgoingMail) {
        if let Err(e) = self.mailer.send(mail).await {
            warn!(
                user_id = %user.id,
                recipient = %mask_for_log(&user.email),
                error = %e,
                "failed to send account decision email"
            );
        }
    }

    /// FIFO review queue with each user's current approved section.
    pub async fn pending_profile_updates(&self) -> Result<Vec<QueuedUpdate>> {
        let updates = self.repos.profiles.list_pending_updates().await?;

        let mut user_ids: Vec<i64> = updates.iter().map(|u| u.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users: HashMap<i64, User> = self
            .repos
            .users
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let profiles: HashMap<i64, UserProfile> = self
            .repos
            .profiles
            .find_by_user_ids(&user_ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        Ok(updates
            .into_iter()
            .map(|update| QueuedUpdate {
                current_data: profiles
                    .get(&update.user_id)
                    .and_then(|p| p.section(update.section.section())),
                user: users.get(&update.user_id).cloned(),
                update,
            })
            .collect())
    }

    pub async fn approve_profile_update(
        &self,
        update_id: i64,
        admin: &str,
        remarks: Option<&str>,
    ) -> Result<PendingProfileUpdate> {
        let remarks = remarks.map(str::trim).filter(|r| !r.is_empty());
        let outcome = self.repos.profiles.approve_update(update_id, admin, remarks).await?;
        let update = review_result(outcome)?;
        info!(update_id = %update_id, user_id = %update.user_id, admin = %admin, "profile update approved");
        Ok(update)
    }

    pub async fn reject_profile_update(
        &self,
        update_id: i64,
        admin: &str,
        remarks: &str,
    ) -> Result<PendingProfileUpdate> {
        let remarks = match remarks.trim() {
            "" => DEFAULT_REJECT_REMARKS,
            r => r,
        };
        let outcome = self.repos.profiles.reject_update(update_id, admin, remarks).await?;
        let update = review_result(outcome)?;
        info!(update_id = %update_id, user_id = %update.user_id, admin = %admin, "profile update rejected");
        Ok(update)
    }

    /// Newest first.
    pub async fn pending_media(&self) -> Result<Vec<MediaFile>> {
        self.repos.media.list_pending().await
    }

    pub async fn review_media(&self, media_id: i64, approve: bool) -> Result<MediaFile> {
        let status = if approve {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Rejected
        };
        match self.repos.media.review(media_id, status).await? {
            ReviewOutcome::Reviewed(media) => {
                info!(media_id = %media_id, status = ?status, "media reviewed");
                Ok(media)
            }
            ReviewOutcome::NotFound => Err(AppError::NotFound("Media not found".to_string())),
            ReviewOutcome::NotPending => Err(AppError::BadRequest("Media is not pending".to_string())),
        }
    }
}

fn review_result(outcome: ReviewOutcome<PendingProfileUpdate>) -> Result<PendingProfileUpdate> {
    match outcome {
        ReviewOutcome::Reviewed(update) => Ok(update),
        ReviewOutcome::NotFound => Err(AppError::NotFound("Pending update not found".to_string())),
        ReviewOutcome::NotPending => Err(AppError::BadRequest("Update is not pending".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_counts_fill_missing_statuses() {
        let mut map = HashMap::new();
        map.insert(UserStatus::Pending, 3);
        map.insert(UserStatus::Approved, 5);
        let counts = UserCounts::from_map(&map);
        assert_eq!(counts.total, 8);
        assert_eq!(counts.rejected, 0);
        assert_eq!(counts.pending_review, 0);
    }
}
