//! Public token-acquisition endpoints. Identity verification (email or
//! messenger round-trips) happens out of band; login exchanges a known
//! address for a JWT and stamps the last-login time.

use axum::{http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::services::manager_service::{ManagerInput, ManagerService};
use crate::sync;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

/// POST /auth/signup - register a manager and subscribe them to the contact
/// list. The new account holds no delegations until someone grants them.
pub async fn signup(
    Json(input): Json<ManagerInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let pool = DatabaseManager::pool().await?;
    let service = ManagerService::new(pool, sync::client());

    let manager = service.create(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": manager
        })),
    ))
}

/// POST /auth/login - exchange a registered email for a JWT.
pub async fn login(Json(request): Json<LoginRequest>) -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let service = ManagerService::new(pool, sync::client());

    let manager = service
        .find_by_email(&request.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown email address"))?;

    service.record_login(manager.id).await?;

    let claims = Claims::new(manager.id, manager.email.clone(), manager.administrator);
    let token = generate_jwt(claims).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Could not issue a token")
    })?;

    let expires_in = config::config().security.jwt_expiry_hours * 3600;

    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "manager": manager,
            "expires_in": expires_in
        }
    })))
}
