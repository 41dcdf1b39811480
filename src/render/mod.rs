//! Slideshow rendering: image normalization, per-slide composition, timeline
//! assembly and encoding.

use std::path::PathBuf;

pub mod ffmpeg;
pub mod letterbox;
pub mod media;
pub mod pipeline;
pub mod slide;
pub mod text;
pub mod timeline;

pub use ffmpeg::FfmpegBackend;
pub use media::{AudioPcm, EncodeParams, MediaBackend, MediaError};
pub use pipeline::{RenderPipeline, Renderer};
pub use slide::{Slide, SlideBuilder};
pub use text::TextRasterizer;
pub use timeline::Timeline;

/// Receives render progress as a percentage.
///
/// Values passed are non-decreasing and 100 is only reported once the output
/// file has been fully written.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("No images found in upload directory {}", dir.display())]
    NoImagesFound { dir: PathBuf },

    #[error("Failed to process image {index} ({}): {reason}", path.display())]
    ImageProcessing {
        index: usize,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to load background music {}: {source}", path.display())]
    Audio { path: PathBuf, source: MediaError },

    #[error("Video encoding failed: {0}")]
    Encode(#[source] MediaError),

    #[error("Render I/O error: {0}")]
    Io(#[from] std::io::Error),
}
