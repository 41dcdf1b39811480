use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use slideshow_video::app_state::AppState;
use slideshow_video::config::AppConfig;
use slideshow_video::render::{FfmpegBackend, RenderPipeline};
use slideshow_video::routes;
use slideshow_video::services::{
    generation::VideoService, registry::JobRegistry, retention, scheduler::JobScheduler,
    uploads::UploadStore,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing slideshow video server");

    config
        .ensure_dirs()
        .expect("Failed to create upload, output or music directories");
    retention::sweep(&config);

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_histogram!(
        "video_render_seconds",
        "Wall time of a video render from start to finish"
    );
    metrics::describe_counter!("video_jobs_submitted", "Total video jobs submitted");
    metrics::describe_counter!("video_jobs_completed", "Total video jobs completed");
    metrics::describe_counter!("video_jobs_failed", "Total video jobs that failed");
    metrics::describe_gauge!("video_renders_active", "Renders currently running");

    let backend = Arc::new(FfmpegBackend::new(&config.ffmpeg_path));
    let media_ready = backend.is_available();
    if !media_ready {
        tracing::warn!(ffmpeg = %config.ffmpeg_path.display(), "ffmpeg not available, renders will fail");
    }

    tracing::info!("Loading fonts and building render pipeline");
    let pipeline = Arc::new(RenderPipeline::new(&config, backend));

    let registry = Arc::new(JobRegistry::new());
    let scheduler = Arc::new(JobScheduler::start(
        registry,
        pipeline,
        config.max_concurrent_videos,
    ));
    let uploads = Arc::new(UploadStore::new(&config));
    let video = VideoService::new(Arc::clone(&scheduler), Arc::clone(&uploads));
    let state = AppState::new(video, uploads, media_ready);

    // Multipart bodies are capped by the upload limits, plus room for form overhead.
    let body_limit = (config.max_total_bytes() + 1024 * 1024) as usize;

    let app = routes::router(state, Some(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(routes::compression_layer())
        .layer(cors_layer(&config.cors_origins))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Waiting for queued renders to finish");
    scheduler.shutdown().await;
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
        .collect();
    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
