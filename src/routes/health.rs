use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::job::JobStatus;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub ffmpeg: ComponentHealth,
    pub jobs: JobCounts,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
}

#[derive(Serialize)]
pub struct JobCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// GET /api/health: service status with media toolchain and job counts.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let registry = state.video.scheduler().registry();
    let jobs = JobCounts {
        queued: registry.count(JobStatus::Queued),
        processing: registry.count(JobStatus::Processing),
        completed: registry.count(JobStatus::Completed),
        failed: registry.count(JobStatus::Failed),
    };

    let (status_code, status) = if state.media_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            ffmpeg: ComponentHealth {
                status: if state.media_ready { "ok" } else { "error" }.to_string(),
            },
            jobs,
        },
    };

    (status_code, Json(response))
}
