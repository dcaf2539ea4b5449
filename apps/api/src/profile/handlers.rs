use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::entry::{ParsedEntry, SectionType};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    #[serde(alias = "user_id")]
    pub user_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResponse {
    pub section: SectionType,
    pub count: usize,
    pub entries: Vec<ParsedEntry>,
}

/// GET /api/v1/profile/:section
pub async fn handle_get_section(
    State(state): State<AppState>,
    Path(section): Path<SectionType>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SectionResponse>, AppError> {
    let entries = state.profiles.load(params.user_id, section).await?;
    Ok(Json(SectionResponse {
        section,
        count: entries.len(),
        entries,
    }))
}
