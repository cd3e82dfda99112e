/// Health and metrics endpoints
///
/// - `/health`: basic liveness with version
/// - `/health/ready`: entity store reachable
/// - `/health/detailed`: per-component status
/// - `/metrics`: Prometheus text exposition

use crate::{context::AppContext, error::ModerationResult, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,
    pub version: String,
    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
        .route("/metrics", get(metrics_endpoint))
}

pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Returns 503 when the entity store cannot be reached
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_store(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: entity store check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let checks = vec![check_store_detailed(&ctx).await, check_jobs_detailed(&ctx)];
    let overall_status = determine_overall_status(&checks);

    let status_code = match overall_status.as_str() {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis(),
        "health_check_completed"
    );

    (
        status_code,
        Json(HealthStatus {
            status: overall_status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }),
    )
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

async fn check_store(ctx: &AppContext) -> ModerationResult<()> {
    if let Some(db) = &ctx.db {
        sqlx::query("SELECT 1").fetch_one(db).await?;
    }
    Ok(())
}

async fn check_store_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let store_type = if ctx.db.is_some() { "sqlite" } else { "memory" };

    match check_store(ctx).await {
        Ok(_) => ComponentHealth {
            name: "entity_store".to_string(),
            status: "healthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
            details: Some(serde_json::json!({ "type": store_type })),
        },
        Err(e) => ComponentHealth {
            name: "entity_store".to_string(),
            status: "unhealthy".to_string(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
            error: Some(e.to_string()),
            details: None,
        },
    }
}

fn check_jobs_detailed(ctx: &AppContext) -> ComponentHealth {
    let jobs = &ctx.config.jobs;
    ComponentHealth {
        name: "background_jobs".to_string(),
        // Sweeps switched off leave due listings unexpired
        status: (if jobs.enabled { "healthy" } else { "degraded" }).to_string(),
        response_time_ms: None,
        error: None,
        details: Some(serde_json::json!({
            "enabled": jobs.enabled,
            "expiration_sweep_secs": jobs.expiration_sweep_interval.as_secs(),
            "suspension_sweep_secs": jobs.suspension_sweep_interval.as_secs(),
        })),
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    if checks.iter().any(|c| c.status == "unhealthy") {
        "unhealthy".to_string()
    } else if checks.iter().any(|c| c.status == "degraded") {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, status: &str) -> ComponentHealth {
        ComponentHealth {
            name: name.to_string(),
            status: status.to_string(),
            response_time_ms: Some(5),
            error: None,
            details: None,
        }
    }

    #[test]
    fn test_determine_overall_status() {
        assert_eq!(
            determine_overall_status(&[component("store", "healthy"), component("jobs", "healthy")]),
            "healthy"
        );
        assert_eq!(
            determine_overall_status(&[component("store", "healthy"), component("jobs", "degraded")]),
            "degraded"
        );
        assert_eq!(
            determine_overall_status(&[component("store", "unhealthy"), component("jobs", "degraded")]),
            "unhealthy"
        );
    }

    #[tokio::test]
    async fn test_in_memory_store_is_healthy() {
        let ctx = AppContext::in_memory(crate::config::ModerationConfig::default());
        let check = check_store_detailed(&ctx).await;
        assert_eq!(check.status, "healthy");
        assert_eq!(check.details.unwrap()["type"], "memory");
    }
}
