use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, Uri};
use axum::routing::{get, post};
use doctero_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let backup_routes = Router::new()
        .route(
            "/api/backup/create",
            post(handlers::backup::create_backup_handler),
        )
        .route("/api/backup/list", get(handlers::backup::list_backups_handler))
        .route(
            "/api/backup/dashboard",
            get(handlers::backup::backup_dashboard_handler),
        );

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(backup_routes)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(frontend_url)?)
        .with_state(app_state))
}

fn build_cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]))
}

async fn route_not_found(uri: Uri) -> ApiResult<()> {
    Err(ApiError::App(AppError::NotFound(format!(
        "route {}",
        uri.path()
    ))))
}
