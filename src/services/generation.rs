use std::path::PathBuf;
use std::sync::Arc;

use garde::Validate;
use uuid::Uuid;

use crate::config::QualityPreset;
use crate::models::job::{JobStatus, VideoJob};
use crate::models::request::GenerationRequest;
use crate::models::video::GenerateVideoRequest;
use crate::services::scheduler::{JobScheduler, SchedulerError};
use crate::services::uploads::{is_single_component, UploadStore};

/// Entry point for video generation: validates submissions, reports job
/// status and hands out finished artifacts.
pub struct VideoService {
    scheduler: Arc<JobScheduler>,
    uploads: Arc<UploadStore>,
}

impl VideoService {
    pub fn new(scheduler: Arc<JobScheduler>, uploads: Arc<UploadStore>) -> Self {
        Self { scheduler, uploads }
    }

    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }

    /// Validate a generation request and queue it. The job id is returned
    /// as soon as the job is recorded; rendering happens in the background.
    pub fn submit_generation(&self, body: GenerateVideoRequest) -> Result<Uuid, SubmitError> {
        let upload_id = body
            .upload_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(SubmitError::MissingField("upload_id"))?;
        let text_overlays = body
            .text_overlays
            .ok_or(SubmitError::MissingField("text_overlays"))?;

        if !is_single_component(&upload_id) {
            return Err(SubmitError::Validation(
                "upload_id must be a plain identifier".to_string(),
            ));
        }
        let source_dir = self.uploads.upload_dir(&upload_id);
        if !source_dir.is_dir() {
            return Err(SubmitError::InvalidUploadReference(upload_id));
        }

        let music_file = body.music_file.filter(|m| !m.is_empty());
        if let Some(name) = &music_file {
            if !is_single_component(name) {
                return Err(SubmitError::Validation(
                    "music_file must be a plain file name".to_string(),
                ));
            }
            if !self.uploads.music_path(name).is_file() {
                return Err(SubmitError::InvalidMusicReference(name.clone()));
            }
        }

        let request = GenerationRequest {
            upload_id,
            source_dir,
            text_overlays,
            music_file,
            duration_per_image: body.duration_per_image,
            transition_duration: body.transition_duration,
            quality: QualityPreset::from_name(body.output_quality.as_deref()),
        };
        request
            .validate()
            .map_err(|report| SubmitError::Validation(report.to_string()))?;

        let job_id = self.scheduler.submit(request)?;
        Ok(job_id)
    }

    pub fn get_status(&self, job_id: Uuid) -> Result<VideoJob, ArtifactError> {
        self.scheduler
            .registry()
            .get(job_id)
            .ok_or(ArtifactError::NotFound(job_id))
    }

    /// Location of the finished video. Repeatable; the file is never
    /// consumed by a download.
    pub fn get_artifact(&self, job_id: Uuid) -> Result<PathBuf, ArtifactError> {
        let job = self.get_status(job_id)?;
        if job.status != JobStatus::Completed {
            return Err(ArtifactError::NotReady(job.status));
        }
        match job.output_path {
            Some(path) if path.is_file() => Ok(path),
            _ => Err(ArtifactError::Missing(job_id)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid upload_id or upload expired: {0}")]
    InvalidUploadReference(String),

    #[error("Invalid music file: {0}")]
    InvalidMusicReference(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArtifactError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Video not ready. Current status: {0}")]
    NotReady(JobStatus),

    #[error("Video file not found for job {0}")]
    Missing(Uuid),
}
