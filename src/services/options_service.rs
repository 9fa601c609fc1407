use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::models::OptionItem;
use crate::repository::{OptionKind, OptionsRepository};
use crate::AppState;

pub const DEFAULT_LOCATIONS: &[&str] = &[
    "Chennai",
    "Coimbatore",
    "Madurai",
    "Trichy",
    "Salem",
    "Tirunelveli",
    "Erode",
    "Other",
];

pub const DEFAULT_KULAMS: &[&str] = &["Semba Vattuar", "Karaiya Vettuvar", "Paandi Vettuvar", "Other"];

/// Registration dropdown lookups.
pub struct OptionsService {
    options: Arc<dyn OptionsRepository>,
}

impl OptionsService {
    pub fn new(state: &AppState) -> Self {
        Self::from_repository(state.repos.options.clone())
    }

    pub fn from_repository(options: Arc<dyn OptionsRepository>) -> Self {
        Self { options }
    }

    pub async fn list(&self, kind: OptionKind) -> Result<Vec<OptionItem>> {
        self.options.list(kind).await
    }

    /// Fill empty lookup tables with the built-in lists.
    pub async fn seed_defaults(&self) -> Result<()> {
        for (kind, names) in [
            (OptionKind::Location, DEFAULT_LOCATIONS),
            (OptionKind::Kulam, DEFAULT_KULAMS),
        ] {
            let inserted = self.options.seed_if_empty(kind, names).await?;
            if inserted > 0 {
                info!(kind = ?kind, inserted = %inserted, "seeded lookup options");
            }
        }
        Ok(())
    }
}
