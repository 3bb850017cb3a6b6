use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use gravity_shared::errors::AppResult;
use gravity_shared::types::auth::AuthUser;
use gravity_shared::types::pagination::Paginated;
use gravity_shared::types::ApiResponse;

use crate::geo::GeoPoint;
use crate::services::detail::{self, ProfileDetail};
use crate::services::discovery::{self, Candidate, DiscoveryOverrides, DiscoveryParams};
use crate::services::profile_id_for_session;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PositionParams {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// GET /profiles - discovery list for the caller
pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(params): Query<DiscoveryParams>,
) -> AppResult<Json<ApiResponse<Paginated<Candidate>>>> {
    let overrides = DiscoveryOverrides::parse(&params)?;
    let now = Utc::now();

    let page = super::run_blocking(&state, "discover", move |repo| {
        let viewer_id = profile_id_for_session(repo, &auth.session_id)?;
        discovery::discover(repo, viewer_id, &overrides, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(page)))
}

/// GET /profiles/:id - single profile with distance from the caller
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(profile_id): Path<i64>,
    Query(params): Query<PositionParams>,
) -> AppResult<Json<ApiResponse<ProfileDetail>>> {
    let position = GeoPoint::parse_pair(params.latitude.as_deref(), params.longitude.as_deref())?;
    let now = Utc::now();

    let profile = super::run_blocking(&state, "profile_detail", move |repo| {
        let viewer_id = profile_id_for_session(repo, &auth.session_id)?;
        detail::profile_detail(repo, viewer_id, profile_id, position, now)
    })
    .await?;

    Ok(Json(ApiResponse::ok(profile)))
}
