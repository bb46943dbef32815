//! Event CRUD under venues. Authorization runs against the delegation chain
//! of the node being touched, always before the mutation.

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::hierarchy::{is_ancestor_or_self, DelegationNode};
use crate::middleware::AuthManager;
use crate::services::event_service::{EventInput, EventService};

use super::{request_context, RequestContext};

/// GET /api/events/:id
pub async fn get(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize(&ctx, DelegationNode::Event(id)).await?;

    let service = EventService::new(ctx.pool.clone());
    let event = service.find(id).await?;

    Ok(Json(json!({
        "success": true,
        "data": event
    })))
}

/// GET /api/venues/:venue_id/events
pub async fn list_for_venue(
    Extension(auth): Extension<AuthManager>,
    Path(venue_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize(&ctx, DelegationNode::Venue(venue_id)).await?;

    let service = EventService::new(ctx.pool.clone());
    let events = service.list_for_venue(venue_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": events
    })))
}

/// POST /api/venues/:venue_id/events - authority over the venue covers
/// creating events under it.
pub async fn create(
    Extension(auth): Extension<AuthManager>,
    Path(venue_id): Path<Uuid>,
    Json(input): Json<EventInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ctx = request_context(&auth).await?;
    authorize(&ctx, DelegationNode::Venue(venue_id)).await?;

    let service = EventService::new(ctx.pool.clone());
    let event = service.create(venue_id, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": event
        })),
    ))
}

/// PUT /api/events/:id
pub async fn update(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
    Json(input): Json<EventInput>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize(&ctx, DelegationNode::Event(id)).await?;

    let service = EventService::new(ctx.pool.clone());
    let event = service.update(id, input).await?;

    Ok(Json(json!({
        "success": true,
        "data": event
    })))
}

/// DELETE /api/events/:id
pub async fn delete(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize(&ctx, DelegationNode::Event(id)).await?;

    let service = EventService::new(ctx.pool.clone());
    service.delete(id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "deleted": id }
    })))
}

async fn authorize(ctx: &RequestContext, node: DelegationNode) -> Result<(), ApiError> {
    if is_ancestor_or_self(&ctx.store, &ctx.actor, node).await? {
        Ok(())
    } else {
        Err(ApiError::forbidden("You do not manage this event or venue"))
    }
}
