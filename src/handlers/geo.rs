//! Accessible-set listings: the geographic entities the caller may browse,
//! computed as unions over their delegation scopes.

use axum::extract::{Extension, Query};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config;
use crate::error::ApiError;
use crate::hierarchy::accessible::{accessible_countries, accessible_events, accessible_regions};
use crate::middleware::AuthManager;

use super::request_context;

#[derive(Debug, Default, Deserialize)]
pub struct GeoParams {
    /// Area-level breadth: area managers browsing the map see the full
    /// country and region lists instead of their own slice.
    #[serde(default)]
    pub area: bool,
    pub country: Option<String>,
}

fn area_breadth(params: &GeoParams) -> bool {
    params.area || config::config().access.force_area_breadth
}

/// GET /api/countries
pub async fn countries(
    Extension(auth): Extension<AuthManager>,
    Query(params): Query<GeoParams>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;

    let mut countries = accessible_countries(&ctx.store, &ctx.actor, area_breadth(&params)).await?;
    countries.truncate(config::config().access.max_list_size as usize);

    Ok(Json(json!({
        "success": true,
        "data": countries
    })))
}

/// GET /api/regions, optionally filtered by ?country=CODE
pub async fn regions(
    Extension(auth): Extension<AuthManager>,
    Query(params): Query<GeoParams>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;

    let mut regions = accessible_regions(
        &ctx.store,
        &ctx.actor,
        params.country.as_deref(),
        area_breadth(&params),
    )
    .await?;
    regions.truncate(config::config().access.max_list_size as usize);

    Ok(Json(json!({
        "success": true,
        "data": regions
    })))
}

/// GET /api/events - every event the caller may administer, as labeled
/// references.
pub async fn events(Extension(auth): Extension<AuthManager>) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;

    let mut events = accessible_events(&ctx.store, &ctx.actor).await?;
    events.truncate(config::config().access.max_list_size as usize);

    Ok(Json(json!({
        "success": true,
        "data": events
    })))
}
