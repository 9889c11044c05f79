use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig};
use crate::handlers;
use crate::managed::{ManagedClient, ManagedError};
use crate::middleware::require_auth;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub managed: ManagedClient,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ManagedError> {
        let managed = ManagedClient::new(&config.managed)?;
        Ok(Self {
            managed,
            config: Arc::new(config),
        })
    }
}

pub fn app(state: AppState) -> Router {
    let api = &state.config.api;
    let static_images = ServeDir::new(&api.static_images_dir);
    let body_limit = DefaultBodyLimit::max(api.max_request_size_bytes);
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        .route("/api/home", get(handlers::public::home))
        .nest_service("/static_images", static_images)
        // Token optional or not checked
        .merge(open_routes())
        // Token required
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn open_routes() -> Router<AppState> {
    use handlers::{auth, financials, patients};

    Router::new()
        .route("/api/auth/upsert-user", post(auth::upsert_user))
        .route("/api/financials/monthly-stats", get(financials::monthly_stats))
        .route("/api/patients/upload-image", post(patients::upload_image))
        .route("/api/patients/image/:filename", get(patients::get_image))
        .route("/api/patients/update/:patient_id", put(patients::update_patient))
        .route("/api/patients/delete/:patient_id", delete(patients::delete_patient))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::{activity_logs, auth, dashboard};

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/create_user", post(auth::create_user))
        .route("/api/dashboard", get(dashboard::dashboard))
        .route("/api/activity-logs", get(activity_logs::list))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-email"),
            HeaderName::from_static("x-user-name"),
            HeaderName::from_static("x-user-role"),
        ])
        .allow_credentials(true)
}
