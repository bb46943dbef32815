//! Manager CRUD and delegation grants. Every operation authorizes through
//! the delegation walk before touching the target row.

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config;
use crate::database::models::{ManagedRecord, ManagedTarget};
use crate::error::ApiError;
use crate::hierarchy::{
    is_ancestor_or_self, is_ancestor_or_self_of, is_strict_ancestor, DelegationNode,
    DelegationStore,
};
use crate::middleware::AuthManager;
use crate::services::manager_service::{ManagerInput, ManagerService};
use crate::sync;

use super::request_context;

/// GET /api/managers - managers the caller manages, most recently touched
/// first. Administrators see everyone.
pub async fn list(Extension(auth): Extension<AuthManager>) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    let service = ManagerService::new(ctx.pool.clone(), sync::client());

    let all = service.list(config::config().access.max_list_size).await?;

    let managers = if auth.administrator {
        all
    } else {
        // One bulk scope load for the whole page, then the walk only has to
        // cover the entity chains.
        let ids: Vec<Uuid> = all.iter().map(|m| m.id).collect();
        let scopes_by_id = ctx.store.manager_scopes_bulk(&ids).await?;

        let mut visible = Vec::new();
        for manager in all {
            let Some(target) = scopes_by_id.get(&manager.id) else {
                continue;
            };
            if is_ancestor_or_self_of(&ctx.store, &ctx.actor, target).await? {
                visible.push(manager);
            }
        }
        visible
    };

    Ok(Json(json!({
        "success": true,
        "data": managers
    })))
}

/// GET /api/managers/:id
pub async fn get(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize_over_manager(&ctx, id, false).await?;

    let service = ManagerService::new(ctx.pool.clone(), sync::client());
    let manager = service.find(id).await?;

    Ok(Json(json!({
        "success": true,
        "data": manager
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateParams {
    /// Push to the contact list even when the email is unchanged.
    #[serde(default)]
    pub force_sync: bool,
}

/// PUT /api/managers/:id
pub async fn update(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
    Query(params): Query<UpdateParams>,
    Json(input): Json<ManagerInput>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize_over_manager(&ctx, id, false).await?;

    let service = ManagerService::new(ctx.pool.clone(), sync::client());
    let manager = service.update(id, input, params.force_sync).await?;

    Ok(Json(json!({
        "success": true,
        "data": manager
    })))
}

/// DELETE /api/managers/:id - requires strict superiority, so nobody can
/// delete their own account through this endpoint.
pub async fn delete(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize_over_manager(&ctx, id, true).await?;

    let service = ManagerService::new(ctx.pool.clone(), sync::client());
    service.delete(id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "deleted": id }
    })))
}

/// GET /api/managers/:id/scopes - the target's delegations plus their derived
/// tier.
pub async fn scopes_get(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    authorize_over_manager(&ctx, id, false).await?;

    let scopes = ctx.store.manager_scopes(id).await?;

    let service = ManagerService::new(ctx.pool.clone(), sync::client());
    let grants: Vec<_> = service
        .managed_records(id)
        .await?
        .iter()
        .filter_map(ManagedRecord::target)
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "manager_id": scopes.manager_id,
            "administrator": scopes.administrator,
            "tier": scopes.tier(),
            "grants": grants,
            "countries": scopes.countries,
            "regions": scopes.regions,
            "areas": scopes.areas,
            "events": scopes.events,
            "clients": scopes.clients
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct ScopeChange {
    pub kind: String,
    pub id: Uuid,
}

/// POST /api/managers/:id/scopes - grant a delegation. The caller must manage
/// both the target manager and the granted entity.
pub async fn scopes_post(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
    Json(change): Json<ScopeChange>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ctx = request_context(&auth).await?;
    let target = parse_target(&change)?;

    authorize_over_manager(&ctx, id, false).await?;
    if !is_ancestor_or_self(&ctx.store, &ctx.actor, target.node()).await? {
        return Err(ApiError::forbidden(
            "You do not manage the entity you are trying to grant",
        ));
    }

    let service = ManagerService::new(ctx.pool.clone(), sync::client());
    service.grant_scope(id, &target).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": { "manager_id": id, "kind": change.kind, "id": change.id }
        })),
    ))
}

/// DELETE /api/managers/:id/scopes - revoke a delegation under the same
/// authorization rule as granting one.
pub async fn scopes_delete(
    Extension(auth): Extension<AuthManager>,
    Path(id): Path<Uuid>,
    Json(change): Json<ScopeChange>,
) -> Result<Json<Value>, ApiError> {
    let ctx = request_context(&auth).await?;
    let target = parse_target(&change)?;

    authorize_over_manager(&ctx, id, false).await?;
    if !is_ancestor_or_self(&ctx.store, &ctx.actor, target.node()).await? {
        return Err(ApiError::forbidden(
            "You do not manage the entity you are trying to revoke",
        ));
    }

    let service = ManagerService::new(ctx.pool.clone(), sync::client());
    service.revoke_scope(id, &target).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "manager_id": id, "revoked": true }
    })))
}

fn parse_target(change: &ScopeChange) -> Result<ManagedTarget, ApiError> {
    ManagedTarget::from_parts(&change.kind, change.id).ok_or_else(|| {
        ApiError::bad_request(format!("Unknown delegation target kind: {}", change.kind))
    })
}

async fn authorize_over_manager(
    ctx: &super::RequestContext,
    target_id: Uuid,
    strict: bool,
) -> Result<(), ApiError> {
    let node = DelegationNode::Manager(target_id);
    let allowed = if strict {
        is_strict_ancestor(&ctx.store, &ctx.actor, node).await?
    } else {
        is_ancestor_or_self(&ctx.store, &ctx.actor, node).await?
    };

    if allowed {
        Ok(())
    } else {
        Err(ApiError::forbidden("You do not manage this manager"))
    }
}
