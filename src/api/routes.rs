//! API route definitions

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    self, ActionResponse, AddCafeForm, CafeListResponse, CafeResponse, ErrorDetail, ErrorResponse,
    HealthResponse, SuccessMessage,
};
use crate::store::CafeStore;
use crate::types::Cafe;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cafes API",
        version = "0.1.0",
        description = "Cafes with wifi, power sockets and coffee prices"
    ),
    tags(
        (name = "cafes", description = "Cafe catalog"),
        (name = "health", description = "Health checks")
    ),
    paths(
        handlers::health,
        handlers::random_cafe,
        handlers::all_cafes,
        handlers::search,
        handlers::add_cafe,
        handlers::update_price,
        handlers::report_closed,
    ),
    components(schemas(
        Cafe,
        CafeResponse,
        CafeListResponse,
        ActionResponse,
        SuccessMessage,
        AddCafeForm,
        HealthResponse,
        ErrorDetail,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CafeStore>,
    /// Secret required by `report-closed`; read-only after startup
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<CafeStore>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            api_key: api_key.into(),
        }
    }
}

/// Create the API router.
///
/// Paths with no route are served from `static_dir` when one is given,
/// which is where the landing page lives.
pub fn create_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let openapi = ApiDoc::openapi();

    let router = Router::new()
        // Catalog
        .route("/random", get(handlers::random_cafe))
        .route("/all", get(handlers::all_cafes))
        .route("/search", get(handlers::search))
        .route("/add", post(handlers::add_cafe))
        .route("/update-price/{cafe_id}", patch(handlers::update_price))
        .route("/report-closed/{cafe_id}", delete(handlers::report_closed))

        // Health
        .route("/health", get(handlers::health))

        // OpenAPI spec and Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi));

    // Landing page and other static assets
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
