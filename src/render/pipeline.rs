use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::config::{AppConfig, QualityPresets};
use crate::models::request::GenerationRequest;
use crate::render::media::{EncodeParams, MediaBackend, OUTPUT_FPS};
use crate::render::slide::SlideBuilder;
use crate::render::text::TextRasterizer;
use crate::render::timeline::Timeline;
use crate::render::{ProgressSink, RenderError};

/// Something that turns a generation request into a video file.
///
/// Implementations run synchronously on the calling thread.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, RenderError>;
}

/// End-to-end slideshow render: discover, build slides, assemble, mix, encode.
pub struct RenderPipeline {
    output_root: PathBuf,
    music_root: PathBuf,
    image_extensions: Vec<String>,
    presets: QualityPresets,
    text: TextRasterizer,
    backend: Arc<dyn MediaBackend>,
}

impl RenderPipeline {
    pub fn new(config: &AppConfig, backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            output_root: config.output_folder.clone(),
            music_root: config.music_library_path.clone(),
            image_extensions: config
                .allowed_image_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            presets: config.quality_presets.clone(),
            text: TextRasterizer::new(),
            backend,
        }
    }

    /// Deterministic output location for `upload_id`.
    pub fn output_path(&self, upload_id: &str) -> PathBuf {
        self.output_root.join(format!("video_{upload_id}.mp4"))
    }

    /// Directory for intermediate files of renders in progress.
    pub fn work_root(&self) -> PathBuf {
        self.output_root.join(".work")
    }

    /// Image files directly inside `dir`, sorted by file name.
    pub fn discover_images(&self, dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::NoImagesFound {
                    dir: dir.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && self.is_image(&path) {
                images.push(path);
            }
        }
        images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if images.is_empty() {
            return Err(RenderError::NoImagesFound {
                dir: dir.to_path_buf(),
            });
        }
        Ok(images)
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.image_extensions.iter().any(|allowed| *allowed == e)
            })
            .unwrap_or(false)
    }

    fn resolve_music(&self, name: &str) -> Option<PathBuf> {
        let path = self.music_root.join(name);
        path.is_file().then_some(path)
    }
}

impl Renderer for RenderPipeline {
    #[tracing::instrument(skip_all, fields(upload_id = %request.upload_id))]
    fn render(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, RenderError> {
        let progress = Checkpoints::new(progress);
        let started = std::time::Instant::now();

        progress.set(10);
        let images = self.discover_images(&request.source_dir)?;
        tracing::info!(images = images.len(), "Discovered images");
        progress.set(20);

        let profile = self.presets.profile(request.quality);
        let builder = SlideBuilder::new(
            &self.text,
            (profile.width, profile.height),
            request.duration_per_image,
            request.transition_duration,
        );
        let slides = builder.build_all(&images, request, |done, total| {
            progress.set(20 + (done * 40 / total) as u8);
        })?;

        tracing::info!(slides = slides.len(), "Concatenating slides");
        let mut timeline = Timeline::assemble(slides, OUTPUT_FPS);
        progress.set(70);

        if let Some(name) = request.music_file.as_deref().filter(|n| !n.is_empty()) {
            match self.resolve_music(name) {
                Some(path) => {
                    tracing::info!(music = %name, "Adding background music");
                    let track = self
                        .backend
                        .decode_audio(&path)
                        .map_err(|source| RenderError::Audio { path, source })?;
                    timeline.mix_audio(track);
                }
                None => tracing::warn!(music = %name, "Music file not found, rendering without audio"),
            }
        }
        progress.set(80);

        let output = self.output_path(&request.upload_id);
        let params = EncodeParams::from_profile(profile);
        let scratch = ScratchDir::create(&self.work_root())?;

        tracing::info!(
            output = %output.display(),
            quality = %request.quality,
            duration_secs = timeline.duration_secs(),
            "Encoding video"
        );
        self.backend
            .encode(&timeline, &params, &output, scratch.path(), &mut |fraction| {
                progress.set(80 + (fraction.clamp(0.0, 1.0) * 15.0) as u8);
            })
            .map_err(RenderError::Encode)?;
        progress.set(95);

        drop(timeline);
        drop(scratch);
        progress.set(100);

        tracing::info!(
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Video generation completed"
        );
        Ok(output)
    }
}

/// Forwards only increasing progress values to the sink.
struct Checkpoints<'a> {
    sink: &'a dyn ProgressSink,
    last: Cell<u8>,
}

impl<'a> Checkpoints<'a> {
    fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: Cell::new(0),
        }
    }

    fn set(&self, percent: u8) {
        let percent = percent.min(100);
        if percent > self.last.get() {
            self.last.set(percent);
            self.sink.report(percent);
        }
    }
}

/// Per-render scratch directory, removed with everything in it on drop.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create(root: &Path) -> std::io::Result<Self> {
        let path = root.join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::warn!(dir = %self.path.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}
