use axum::{extract::State, routing::get, Extension, Json, Router};

use super::{ApiQuery, ApiResponse, PageQuery};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::QuickActionCounts;
use crate::services::home_service::{FeedPage, HighlightsView, HomeSummary};
use crate::services::HomeService;
use crate::AppState;

const MAX_FEED_PAGE: i64 = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/quick-actions", get(quick_actions))
        .route("/feed", get(feed))
        .route("/highlights", get(highlights))
}

async fn summary(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<HomeSummary>>> {
    let summary = HomeService::new(&state).summary(&user).await?;
    Ok(ApiResponse::ok(summary))
}

async fn quick_actions(State(state): State<AppState>) -> Result<Json<ApiResponse<QuickActionCounts>>> {
    let counts = HomeService::new(&state).quick_actions().await?;
    Ok(ApiResponse::ok(counts))
}

async fn feed(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<FeedPage>>> {
    let (page, limit) = query.resolve(MAX_FEED_PAGE)?;
    let feed = HomeService::new(&state).feed(&user, page, limit).await?;
    Ok(ApiResponse::ok(feed))
}

async fn highlights(State(state): State<AppState>) -> Result<Json<ApiResponse<HighlightsView>>> {
    let highlights = HomeService::new(&state).highlights().await?;
    Ok(ApiResponse::ok(highlights))
}
