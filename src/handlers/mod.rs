// Route handlers, grouped by resource. Everything under /api runs behind the
// JWT middleware and receives the `AuthManager` extension; the auth module
// holds the public token-acquisition endpoints.

pub mod auth;
pub mod events;
pub mod geo;
pub mod managers;

use sqlx::PgPool;

use crate::database::{DatabaseManager, PgDelegationStore};
use crate::error::ApiError;
use crate::hierarchy::{DelegationStore, ManagerScopes};
use crate::middleware::AuthManager;

/// Shared per-request plumbing: the pool, a delegation store over it, and the
/// caller's loaded scopes.
pub(crate) struct RequestContext {
    pub pool: PgPool,
    pub store: PgDelegationStore,
    pub actor: ManagerScopes,
}

pub(crate) async fn request_context(auth: &AuthManager) -> Result<RequestContext, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let store = PgDelegationStore::new(pool.clone());
    let actor = store.manager_scopes(auth.manager_id).await?;
    Ok(RequestContext { pool, store, actor })
}
