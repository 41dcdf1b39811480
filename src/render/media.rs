use std::path::{Path, PathBuf};

use crate::config::QualityProfile;
use crate::render::timeline::Timeline;

/// Sample rate used for decoded and mixed audio.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Output frame rate of every rendered video.
pub const OUTPUT_FPS: u32 = 30;

/// Decoded audio as interleaved f32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved: Vec<f32>,
}

impl AudioPcm {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved.len() / usize::from(self.channels)
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Encoder settings for one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub bitrate: String,
    pub audio_bitrate: String,
    pub preset: String,
}

impl EncodeParams {
    /// MP4 / H.264 / AAC at 30fps with the bitrate triple of `profile`.
    pub fn from_profile(profile: &QualityProfile) -> Self {
        Self {
            width: profile.width,
            height: profile.height,
            fps: OUTPUT_FPS,
            video_codec: "libx264",
            audio_codec: "aac",
            bitrate: profile.bitrate.clone(),
            audio_bitrate: profile.audio_bitrate.clone(),
            preset: profile.preset.clone(),
        }
    }
}

/// Boundary to the codec/encoder implementation.
pub trait MediaBackend: Send + Sync {
    /// Decode an audio file to stereo PCM at [`MIX_SAMPLE_RATE`].
    fn decode_audio(&self, path: &Path) -> Result<AudioPcm, MediaError>;

    /// Encode every frame of `timeline` (and its audio, if any) to `output`.
    ///
    /// `scratch` is a directory owned by the caller for intermediate files.
    /// `on_progress` receives the encoded fraction in `0.0..=1.0`.
    fn encode(
        &self,
        timeline: &Timeline,
        params: &EncodeParams,
        output: &Path,
        scratch: &Path,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<(), MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("ffmpeg exited with status {status}: {stderr}")]
    Ffmpeg { status: String, stderr: String },

    #[error("invalid encode parameters: {0}")]
    InvalidParams(String),

    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
}
