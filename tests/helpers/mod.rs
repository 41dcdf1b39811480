//! Test helper utilities shared by the integration and e2e suites
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use slideshow_video::config::AppConfig;
use slideshow_video::models::job::VideoJob;
use slideshow_video::models::request::GenerationRequest;
use slideshow_video::render::media::{AudioPcm, EncodeParams, MediaBackend, MediaError, MIX_SAMPLE_RATE};
use slideshow_video::render::{ProgressSink, RenderError, Renderer, Timeline};
use slideshow_video::services::registry::JobRegistry;
use uuid::Uuid;

use crate::fixtures::ImageFixture;

/// Scratch directory tree laid out like a real deployment, removed on drop.
pub struct TestEnv {
    pub base: PathBuf,
    pub config: AppConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let base = std::env::temp_dir().join(format!("slideshow-test-{}", Uuid::new_v4()));
        let config = AppConfig::with_base_dir(&base);
        config.ensure_dirs().expect("Failed to create test directories");
        Self { base, config }
    }

    /// Create an upload directory holding `images` and return its id.
    pub fn upload(&self, images: &[ImageFixture]) -> String {
        let upload_id = Uuid::new_v4().to_string();
        let dir = self.upload_dir(&upload_id);
        std::fs::create_dir_all(&dir).expect("Failed to create upload dir");
        for image in images {
            image.write_to(&dir);
        }
        upload_id
    }

    pub fn upload_dir(&self, upload_id: &str) -> PathBuf {
        self.config.upload_folder.join(upload_id)
    }

    pub fn work_root(&self) -> PathBuf {
        self.config.output_folder.join(".work")
    }

    /// Entries left under the scratch root.
    pub fn work_leftovers(&self) -> usize {
        std::fs::read_dir(self.work_root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.base);
    }
}

/// What a [`FakeBackend`] saw for one encode call.
#[derive(Debug, Clone)]
pub struct EncodeRecord {
    pub frames: u64,
    pub frame_bytes: usize,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_secs: f64,
    pub audio_frames: Option<usize>,
    pub output: PathBuf,
}

/// In-process media backend: decodes to a synthetic tone and "encodes" by
/// walking every frame and writing a placeholder file.
#[derive(Default)]
pub struct FakeBackend {
    pub track_secs: f64,
    pub fail_encode: bool,
    pub encodes: Mutex<Vec<EncodeRecord>>,
}

impl FakeBackend {
    pub fn with_track(track_secs: f64) -> Self {
        Self {
            track_secs,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_encode: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<EncodeRecord> {
        self.encodes.lock().unwrap().clone()
    }
}

impl MediaBackend for FakeBackend {
    fn decode_audio(&self, path: &Path) -> Result<AudioPcm, MediaError> {
        if !path.is_file() {
            return Err(MediaError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)));
        }
        let frames = (self.track_secs * MIX_SAMPLE_RATE as f64) as usize;
        Ok(AudioPcm {
            sample_rate: MIX_SAMPLE_RATE,
            channels: 2,
            interleaved: vec![0.25; frames * 2],
        })
    }

    fn encode(
        &self,
        timeline: &Timeline,
        params: &EncodeParams,
        output: &Path,
        scratch: &Path,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<(), MediaError> {
        std::fs::write(scratch.join("frames.txt"), b"in progress")?;

        let total = timeline.total_frames().max(1);
        let mut frames = 0u64;
        let mut frame_bytes = 0usize;
        timeline.for_each_frame(|index, frame| {
            frames += 1;
            frame_bytes = frame.len();
            on_progress((index + 1) as f64 / total as f64);
            Ok::<(), MediaError>(())
        })?;

        if self.fail_encode {
            return Err(MediaError::Ffmpeg {
                status: "exit status: 1".to_string(),
                stderr: "simulated encoder failure".to_string(),
            });
        }

        std::fs::write(output, b"fake mp4")?;
        self.encodes.lock().unwrap().push(EncodeRecord {
            frames,
            frame_bytes,
            width: params.width,
            height: params.height,
            fps: params.fps,
            duration_secs: timeline.duration_secs(),
            audio_frames: timeline.audio().map(AudioPcm::frames),
            output: output.to_path_buf(),
        });
        Ok(())
    }
}

/// Renderer that sleeps instead of rendering and records how many renders
/// overlap.
pub struct SlowRenderer {
    pub delay: Duration,
    pub output_root: PathBuf,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub fail_uploads: Vec<String>,
}

impl SlowRenderer {
    pub fn new(output_root: &Path, delay: Duration) -> Self {
        Self {
            delay,
            output_root: output_root.to_path_buf(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_uploads: Vec::new(),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Renderer for SlowRenderer {
    fn render(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, RenderError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        for step in [10, 40, 70] {
            progress.report(step);
            std::thread::sleep(self.delay / 3);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_uploads.contains(&request.upload_id) {
            return Err(RenderError::NoImagesFound {
                dir: request.source_dir.clone(),
            });
        }

        let output = self.output_root.join(format!("video_{}.mp4", request.upload_id));
        std::fs::write(&output, b"fake mp4")?;
        progress.report(100);
        Ok(output)
    }
}

/// Records every progress value a render reports.
#[derive(Default, Clone)]
pub struct ProgressLog(pub Arc<Mutex<Vec<u8>>>);

impl ProgressLog {
    pub fn values(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressSink for ProgressLog {
    fn report(&self, percent: u8) {
        self.0.lock().unwrap().push(percent);
    }
}

/// Poll the registry until the job reaches a terminal state, collecting
/// every snapshot seen along the way.
pub async fn wait_for_terminal(
    registry: &JobRegistry,
    job_id: Uuid,
    timeout: Duration,
) -> Vec<VideoJob> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        let job = registry.get(job_id).expect("job should exist");
        let done = job.status.is_terminal();
        seen.push(job);
        if done {
            return seen;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("job {job_id} did not finish within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
