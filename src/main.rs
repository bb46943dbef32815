use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod hierarchy;
mod localization;
mod middleware;
mod services;
mod sync;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = crate::config::config();
    tracing_subscriber::fmt::init();
    tracing::info!("Starting Atlas admin API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("ATLAS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("Atlas admin API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        // Protected API behind the JWT middleware
        .merge(api_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_auth_routes() -> Router {
    use handlers::auth;

    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
}

fn api_routes() -> Router {
    use handlers::{events, geo, managers};

    Router::new()
        // Manager administration
        .route("/api/managers", get(managers::list))
        .route(
            "/api/managers/:id",
            get(managers::get)
                .put(managers::update)
                .delete(managers::delete),
        )
        .route(
            "/api/managers/:id/scopes",
            get(managers::scopes_get)
                .post(managers::scopes_post)
                .delete(managers::scopes_delete),
        )
        // Accessible-set listings
        .route("/api/countries", get(geo::countries))
        .route("/api/regions", get(geo::regions))
        .route("/api/events", get(geo::events))
        // Event CRUD under venues
        .route(
            "/api/events/:id",
            get(events::get).put(events::update).delete(events::delete),
        )
        .route(
            "/api/venues/:venue_id/events",
            get(events::list_for_venue).post(events::create),
        )
        .route_layer(from_fn(middleware::jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Atlas Admin API",
            "version": version,
            "description": "Administration backend for geographically-scoped events and their managers",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/auth/signup, /auth/login (public - token acquisition)",
                "managers": "/api/managers[/:id[/scopes]] (protected)",
                "geography": "/api/countries, /api/regions, /api/events (protected)",
                "events": "/api/events/:id, /api/venues/:venue_id/events (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
