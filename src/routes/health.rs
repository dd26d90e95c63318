use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
///
/// Reports whether the metadata catalog is reachable. Used by load
/// balancers and monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let catalog = state.catalog.clone();
    let catalog_status = tokio::task::spawn_blocking(move || {
        if catalog.ping() {
            "reachable"
        } else {
            tracing::error!("Catalog health check failed");
            "unreachable"
        }
    })
    .await
    .unwrap_or("error");

    Json(json!({
        "status": if catalog_status == "reachable" { "healthy" } else { "unhealthy" },
        "catalog": catalog_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
