use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::ApiResponse;
use crate::error::Result;
use crate::models::OptionItem;
use crate::repository::OptionKind;
use crate::services::OptionsService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(locations))
        .route("/kulams", get(kulams))
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub locations: Vec<OptionItem>,
}

#[derive(Debug, Serialize)]
pub struct KulamsResponse {
    pub kulams: Vec<OptionItem>,
}

async fn locations(State(state): State<AppState>) -> Result<Json<ApiResponse<LocationsResponse>>> {
    let locations = OptionsService::new(&state).list(OptionKind::Location).await?;
    Ok(ApiResponse::ok(LocationsResponse { locations }))
}

async fn kulams(State(state): State<AppState>) -> Result<Json<ApiResponse<KulamsResponse>>> {
    let kulams = OptionsService::new(&state).list(OptionKind::Kulam).await?;
    Ok(ApiResponse::ok(KulamsResponse { kulams }))
}
