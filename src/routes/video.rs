use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::video::{
    GenerateVideoRequest, GenerateVideoResponse, JobStatusResponse, UploadResponse,
};
use crate::routes::error::ApiError;

/// POST /api/upload/images: store a batch of images under a new upload id.
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let uploads = state.uploads.clone();
    let mut batch = uploads.begin()?;
    let mut received = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("images") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if filename.is_empty() {
            continue;
        }

        received += 1;
        if received > uploads.max_files() {
            return Err(ApiError::bad_request(format!(
                "Maximum {} images allowed",
                uploads.max_files()
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?;
        batch.add(&filename, &data)?;
    }

    if received == 0 {
        return Err(ApiError::bad_request("No images provided"));
    }

    let (upload_id, total_size, files) = batch.commit();
    Ok(Json(UploadResponse {
        success: true,
        upload_id,
        files_uploaded: files.len(),
        total_size,
        files,
    }))
}

/// POST /api/video/generate: validate and queue a render job.
pub async fn generate_video(
    State(state): State<AppState>,
    Json(body): Json<GenerateVideoRequest>,
) -> Result<(StatusCode, Json<GenerateVideoResponse>), ApiError> {
    let job_id = state.video.submit_generation(body)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateVideoResponse {
            success: true,
            job_id,
            message: "Video generation started".to_string(),
            status_url: format!("/api/video/status/{job_id}"),
        }),
    ))
}

/// GET /api/video/status/{job_id}: current job snapshot.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = state.video.get_status(job_id)?;
    Ok(Json(job.into()))
}

/// GET /api/video/download/{job_id}: stream the finished MP4.
pub async fn download_video(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let path = state.video.get_artifact(job_id)?;
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to open video: {e}")))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("video.mp4")
        .to_string();

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}
