use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{JobStatus, VideoJob};
use crate::models::request::TextOverlaySpec;

/// Body of `POST /api/video/generate`.
///
/// `upload_id` and `text_overlays` are required but kept optional here so a
/// missing field is reported by name instead of as a generic parse error.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateVideoRequest {
    pub upload_id: Option<String>,
    pub text_overlays: Option<Vec<TextOverlaySpec>>,
    #[serde(default)]
    pub music_file: Option<String>,
    #[serde(default = "default_duration_per_image")]
    pub duration_per_image: f64,
    #[serde(default = "default_transition_duration")]
    pub transition_duration: f64,
    #[serde(default)]
    pub output_quality: Option<String>,
}

fn default_duration_per_image() -> f64 {
    3.0
}

fn default_transition_duration() -> f64 {
    0.5
}

/// Response after submitting a generation job.
#[derive(Debug, Serialize)]
pub struct GenerateVideoResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub message: String,
    pub status_url: String,
}

/// Response for querying job status.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub video_url: Option<String>,
    pub error: Option<String>,
}

impl From<VideoJob> for JobStatusResponse {
    fn from(job: VideoJob) -> Self {
        let video_url = (job.status == JobStatus::Completed)
            .then(|| format!("/api/video/download/{}", job.id));
        Self {
            success: true,
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            created_at: job.created_at,
            completed_at: job.completed_at,
            video_url,
            error: job.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: u64,
}

/// Response after uploading a batch of images.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub upload_id: String,
    pub files_uploaded: usize,
    pub total_size: u64,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct MusicFile {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct MusicLibraryResponse {
    pub success: bool,
    pub music_files: Vec<MusicFile>,
    pub count: usize,
}

/// Error body used by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
