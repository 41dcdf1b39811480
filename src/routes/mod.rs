pub mod error;
pub mod health;
pub mod metrics;
pub mod music;
pub mod video;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::predicate::{DefaultPredicate, NotForContentType, Predicate};
use tower_http::compression::CompressionLayer;

use crate::app_state::AppState;

/// API routes. The metrics endpoint is mounted only when a handle is given.
pub fn router(state: AppState, prometheus: Option<Arc<PrometheusHandle>>) -> Router {
    let api = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/music/library", get(music::music_library))
        .route("/api/upload/images", post(video::upload_images))
        .route("/api/video/generate", post(video::generate_video))
        .route("/api/video/status/{job_id}", get(video::get_job_status))
        .route("/api/video/download/{job_id}", get(video::download_video))
        .with_state(state);

    match prometheus {
        Some(handle) => api.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        ),
        None => api,
    }
}

/// Response compression, skipping MP4 downloads which are already compressed.
pub fn compression_layer() -> CompressionLayer<impl Predicate> {
    CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new("video/mp4")))
}
