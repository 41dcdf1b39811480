use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::models::job::{JobStatus, VideoJob};

/// Process-wide table of video jobs.
///
/// Every operation takes the single registry lock for O(1) work and hands out
/// clones, so readers always see a whole record.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, VideoJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, VideoJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new `queued` job at progress 0.
    pub fn create(&self, upload_id: &str) -> VideoJob {
        let job = VideoJob::new(upload_id);
        self.lock().insert(job.id, job.clone());
        job
    }

    pub fn get(&self, job_id: Uuid) -> Option<VideoJob> {
        self.lock().get(&job_id).cloned()
    }

    /// Drop a job that never reached a worker.
    pub fn discard(&self, job_id: Uuid) -> Option<VideoJob> {
        self.lock().remove(&job_id)
    }

    /// `queued -> processing`.
    pub fn start(&self, job_id: Uuid) -> Result<VideoJob, RegistryError> {
        self.transition(job_id, |job| {
            if job.status != JobStatus::Queued {
                return Err(invalid(job, JobStatus::Processing));
            }
            job.status = JobStatus::Processing;
            job.started_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Raise progress of a processing job; values below the current one and
    /// the completion value 100 are ignored.
    pub fn update_progress(&self, job_id: Uuid, percent: u8) -> Result<VideoJob, RegistryError> {
        self.transition(job_id, |job| {
            if job.status != JobStatus::Processing {
                return Err(invalid(job, JobStatus::Processing));
            }
            job.progress = job.progress.max(percent.min(99));
            Ok(())
        })
    }

    /// `processing -> completed`, recording the output and forcing progress to 100.
    pub fn complete(&self, job_id: Uuid, output_path: PathBuf) -> Result<VideoJob, RegistryError> {
        self.transition(job_id, |job| {
            if job.status != JobStatus::Processing {
                return Err(invalid(job, JobStatus::Completed));
            }
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.output_path = Some(output_path);
            job.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    /// `queued | processing -> failed`, keeping the last reported progress.
    pub fn fail(&self, job_id: Uuid, error: impl Into<String>) -> Result<VideoJob, RegistryError> {
        let error = error.into();
        self.transition(job_id, |job| {
            if job.status.is_terminal() {
                return Err(invalid(job, JobStatus::Failed));
            }
            job.status = JobStatus::Failed;
            job.error = Some(error);
            job.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    fn transition(
        &self,
        job_id: Uuid,
        apply: impl FnOnce(&mut VideoJob) -> Result<(), RegistryError>,
    ) -> Result<VideoJob, RegistryError> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(&job_id).ok_or(RegistryError::NotFound(job_id))?;
        // Mutate a copy so a rejected transition leaves the record untouched.
        let mut updated = job.clone();
        apply(&mut updated)?;
        *job = updated.clone();
        Ok(updated)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of jobs currently in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        self.lock().values().filter(|j| j.status == status).count()
    }
}

fn invalid(job: &VideoJob, to: JobStatus) -> RegistryError {
    RegistryError::InvalidTransition {
        job_id: job.id,
        from: job.status,
        to,
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_create_is_queued_at_zero() {
        let registry = JobRegistry::new();
        let job = registry.create("upload-1");
        let snapshot = registry.get(job.id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Queued);
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.output_path.is_none());
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_happy_path() {
        let registry = JobRegistry::new();
        let id = registry.create("u").id;

        registry.start(id).unwrap();
        registry.update_progress(id, 40).unwrap();
        registry.update_progress(id, 20).unwrap();
        assert_eq!(registry.get(id).unwrap().progress, 40);

        registry.update_progress(id, 100).unwrap();
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 99);

        let job = registry.complete(id, PathBuf::from("out/video_u.mp4")).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.output_path, Some(PathBuf::from("out/video_u.mp4")));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_failure_keeps_progress() {
        let registry = JobRegistry::new();
        let id = registry.create("u").id;
        registry.start(id).unwrap();
        registry.update_progress(id, 33).unwrap();

        let job = registry.fail(id, "boom").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 33);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.output_path.is_none());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let registry = JobRegistry::new();
        let id = registry.create("u").id;
        registry.start(id).unwrap();
        registry.complete(id, PathBuf::from("a.mp4")).unwrap();

        assert!(matches!(
            registry.fail(id, "late"),
            Err(RegistryError::InvalidTransition { .. })
        ));
        assert!(registry.start(id).is_err());
        assert!(registry.update_progress(id, 50).is_err());
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_complete_requires_processing() {
        let registry = JobRegistry::new();
        let id = registry.create("u").id;
        assert!(registry.complete(id, PathBuf::from("a.mp4")).is_err());
        assert_eq!(registry.get(id).unwrap().status, JobStatus::Queued);
    }

    #[test]
    fn test_discard_removes_record() {
        let registry = JobRegistry::new();
        let kept = registry.create("a").id;
        let dropped = registry.create("b").id;

        assert_eq!(registry.discard(dropped).map(|j| j.upload_id), Some("b".to_string()));
        assert!(registry.get(dropped).is_none());
        assert!(registry.discard(dropped).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(kept).is_some());
    }

    #[test]
    fn test_unknown_job() {
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();
        assert!(registry.get(id).is_none());
        assert!(matches!(registry.start(id), Err(RegistryError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let registry = Arc::new(JobRegistry::new());
        let ids: Vec<Uuid> = (0..8).map(|i| registry.create(&format!("u{i}")).id).collect();

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.start(id).unwrap();
                    for p in 0..=99u8 {
                        registry.update_progress(id, p).unwrap();
                    }
                    registry.complete(id, PathBuf::from(format!("{id}.mp4"))).unwrap();
                })
            })
            .collect();

        let reader = {
            let registry = Arc::clone(&registry);
            let ids = ids.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    for id in &ids {
                        let job = registry.get(*id).unwrap();
                        assert_eq!(job.status == JobStatus::Completed, job.output_path.is_some());
                        assert_eq!(job.status == JobStatus::Completed, job.progress == 100);
                    }
                }
            })
        };

        for h in handles {
            h.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(registry.count(JobStatus::Completed), 8);
    }
}
