// handlers/public/mod.rs - endpoints that never look at a token

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Medicare Clinic API",
        "version": version,
        "endpoints": {
            "health": "/health (public)",
            "home": "/api/home (public)",
            "auth": "/api/auth/me, /api/auth/create_user (token required), /api/auth/upsert-user",
            "dashboard": "/api/dashboard (token required)",
            "financials": "/api/financials/monthly-stats",
            "activity_logs": "/api/activity-logs (token required)",
            "patients": "/api/patients/upload-image, /api/patients/image/:filename",
            "static_images": "/static_images/*path",
        }
    }))
}

/// GET /health - liveness, plus whether the managed service is configured
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let managed = if state.managed.is_configured() { "configured" } else { "not_configured" };

    Json(json!({
        "status": "ok",
        "message": "Medicare Clinic API is running",
        "managed_service": managed,
    }))
}

/// GET /api/home - static landing data
pub async fn home() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Medicare Clinic App",
        "version": "1.0.0",
    }))
}
