pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use rewards_core::{Clock, ProgressTracker, SystemClock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub tracker: Arc<ProgressTracker>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config, clock: Arc<dyn Clock>) -> Self {
        let tracker = ProgressTracker::new(config.efficiency_window);
        Self {
            db,
            config: Arc::new(config),
            clock,
            tracker: Arc::new(tracker),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url, config.max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let addr = config.bind_addr();
    let state = AppState::new(Arc::new(db), config, Arc::new(SystemClock));
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router: public, user (bearer token) and admin routes.
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        // User routes
        .route("/api/users/me", get(routes::users::me))
        // Study routes
        .route(
            "/api/study/sessions",
            post(routes::study::submit_session).get(routes::study::list_sessions),
        )
        .route("/api/study/stats", get(routes::study::stats))
        // Reward routes
        .route("/api/progress", get(routes::rewards::progress))
        .route("/api/achievements", get(routes::rewards::achievements))
        .route("/api/points", get(routes::rewards::points))
        // Catalog routes
        .route("/api/catalog/categories", get(routes::catalog::categories))
        .route("/api/catalog/products", get(routes::catalog::products))
        .route(
            "/api/exchanges",
            post(routes::catalog::redeem).get(routes::catalog::list_exchanges),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    let admin_routes = Router::new()
        .route(
            "/api/admin/rules",
            get(routes::admin::list_rules).post(routes::admin::create_rule),
        )
        .route(
            "/api/admin/rules/:id",
            put(routes::admin::update_rule).delete(routes::admin::deactivate_rule),
        )
        .route(
            "/api/admin/achievements",
            get(routes::admin::list_achievements).post(routes::admin::create_achievement),
        )
        .route(
            "/api/admin/achievements/:id",
            put(routes::admin::update_achievement).delete(routes::admin::deactivate_achievement),
        )
        .route(
            "/api/admin/categories",
            get(routes::admin::list_categories).post(routes::admin::create_category),
        )
        .route(
            "/api/admin/categories/:id",
            put(routes::admin::update_category),
        )
        .route(
            "/api/admin/products",
            get(routes::admin::list_products).post(routes::admin::create_product),
        )
        .route("/api/admin/products/:id", put(routes::admin::update_product))
        .route("/api/admin/exchanges", get(routes::admin::list_exchanges))
        .route(
            "/api/admin/exchanges/:id/approve",
            post(routes::admin::approve_exchange),
        )
        .route(
            "/api/admin/exchanges/:id/reject",
            post(routes::admin::reject_exchange),
        )
        .route(
            "/api/admin/exchanges/:id/complete",
            post(routes::admin::complete_exchange),
        )
        .route(
            "/api/admin/users/:id/points",
            post(routes::admin::adjust_points),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::admin_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/users/register", post(routes::users::register))
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
