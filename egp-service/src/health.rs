//! Liveness and readiness probes

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{User, UserId};
use crate::repository::Repository;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    /// Version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Readiness check response with dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,

    /// Service name
    pub service: String,

    /// Dependency statuses
    pub dependencies: HashMap<String, DependencyStatus>,
}

/// Individual dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Dependency is healthy
    pub healthy: bool,

    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness probe; 200 whenever the process is serving
pub async fn health<R>(State(state): State<AppState<R>>) -> impl IntoResponse
where
    R: Repository<UserId, User> + 'static,
{
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe
///
/// Runs a cheap query against the user store; 503 when it fails.
pub async fn readiness<R>(State(state): State<AppState<R>>) -> impl IntoResponse
where
    R: Repository<UserId, User> + 'static,
{
    let mut dependencies = HashMap::new();

    let storage = match state.users().repository().count().await {
        Ok(count) => DependencyStatus {
            healthy: true,
            message: Some(format!("{} user(s) stored", count)),
        },
        Err(e) => {
            tracing::error!("Storage readiness check failed: {}", e);
            DependencyStatus {
                healthy: false,
                message: Some(format!("Storage unavailable: {}", e.kind)),
            }
        }
    };
    let ready = storage.healthy;
    dependencies.insert("storage".to_string(), storage);

    let response = ReadinessResponse {
        ready,
        service: state.config().service.name.clone(),
        dependencies,
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
