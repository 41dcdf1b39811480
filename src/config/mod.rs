use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:5000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Root directory holding one subdirectory per upload id.
    #[serde(default = "default_upload_folder")]
    pub upload_folder: PathBuf,

    /// Root directory for rendered videos.
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,

    /// Directory of selectable background music tracks.
    #[serde(default = "default_music_library_path")]
    pub music_library_path: PathBuf,

    /// Per-file upload cap in MiB.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Total upload cap in MiB.
    #[serde(default = "default_max_total_size_mb")]
    pub max_total_size_mb: u64,

    #[serde(default = "default_max_images_per_upload")]
    pub max_images_per_upload: usize,

    /// Comma separated, lowercase, without the leading dot.
    #[serde(default = "default_allowed_image_extensions")]
    pub allowed_image_extensions: Vec<String>,

    #[serde(default = "default_allowed_audio_extensions")]
    pub allowed_audio_extensions: Vec<String>,

    /// Number of renders allowed to run at the same time.
    #[serde(default = "default_max_concurrent_videos")]
    pub max_concurrent_videos: usize,

    /// Upload directories older than this are removed by the retention sweep.
    #[serde(default = "default_upload_retention_hours")]
    pub upload_retention_hours: u64,

    /// Rendered videos older than this are removed by the retention sweep.
    #[serde(default = "default_output_retention_hours")]
    pub output_retention_hours: u64,

    /// Comma separated list of allowed CORS origins, or "*".
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// ffmpeg executable used for audio decode and MP4 encode.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    #[serde(skip, default)]
    pub quality_presets: QualityPresets,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_upload_folder() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_music_library_path() -> PathBuf {
    PathBuf::from("music_library")
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_max_total_size_mb() -> u64 {
    100
}

fn default_max_images_per_upload() -> usize {
    50
}

fn default_allowed_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "bmp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_audio_extensions() -> Vec<String> {
    ["mp3", "wav", "m4a"].iter().map(|s| s.to_string()).collect()
}

fn default_max_concurrent_videos() -> usize {
    3
}

fn default_upload_retention_hours() -> u64 {
    24
}

fn default_output_retention_hours() -> u64 {
    48
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Configuration rooted at `base`, with every other option at its default.
    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            bind_addr: default_bind_addr(),
            upload_folder: base.join(default_upload_folder()),
            output_folder: base.join(default_output_folder()),
            music_library_path: base.join(default_music_library_path()),
            max_file_size_mb: default_max_file_size_mb(),
            max_total_size_mb: default_max_total_size_mb(),
            max_images_per_upload: default_max_images_per_upload(),
            allowed_image_extensions: default_allowed_image_extensions(),
            allowed_audio_extensions: default_allowed_audio_extensions(),
            max_concurrent_videos: default_max_concurrent_videos(),
            upload_retention_hours: default_upload_retention_hours(),
            output_retention_hours: default_output_retention_hours(),
            cors_origins: default_cors_origins(),
            ffmpeg_path: default_ffmpeg_path(),
            quality_presets: QualityPresets::default(),
        }
    }

    /// Create the upload, output and music roots if they are missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_folder)?;
        std::fs::create_dir_all(&self.output_folder)?;
        std::fs::create_dir_all(&self.music_library_path)?;
        Ok(())
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn max_total_bytes(&self) -> u64 {
        self.max_total_size_mb * 1024 * 1024
    }
}

/// Named output quality tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityPreset {
    /// Resolve a preset name; unknown or missing names select `High`.
    pub fn from_name(name: Option<&str>) -> Self {
        name.and_then(|n| n.trim().parse().ok()).unwrap_or_default()
    }
}

/// Encoder parameters for one quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityProfile {
    pub width: u32,
    pub height: u32,
    /// Video bitrate in ffmpeg notation, e.g. "3000k".
    pub bitrate: String,
    pub audio_bitrate: String,
    pub fps: u32,
    /// x264 speed preset.
    pub preset: String,
}

impl QualityProfile {
    fn new(width: u32, height: u32, bitrate: &str, audio_bitrate: &str, preset: &str) -> Self {
        Self {
            width,
            height,
            bitrate: bitrate.to_string(),
            audio_bitrate: audio_bitrate.to_string(),
            fps: 30,
            preset: preset.to_string(),
        }
    }
}

/// Read-only preset table shared by every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityPresets {
    low: QualityProfile,
    medium: QualityProfile,
    high: QualityProfile,
}

impl Default for QualityPresets {
    fn default() -> Self {
        Self {
            low: QualityProfile::new(1280, 720, "500k", "96k", "ultrafast"),
            medium: QualityProfile::new(1280, 720, "1500k", "128k", "medium"),
            high: QualityProfile::new(1920, 1080, "3000k", "192k", "slow"),
        }
    }
}

impl QualityPresets {
    pub fn profile(&self, preset: QualityPreset) -> &QualityProfile {
        match preset {
            QualityPreset::Low => &self.low,
            QualityPreset::Medium => &self.medium,
            QualityPreset::High => &self.high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_preset_falls_back_to_high() {
        assert_eq!(QualityPreset::from_name(Some("ultra")), QualityPreset::High);
        assert_eq!(QualityPreset::from_name(None), QualityPreset::High);
        assert_eq!(QualityPreset::from_name(Some("LOW")), QualityPreset::Low);
        assert_eq!(QualityPreset::from_name(Some("medium")), QualityPreset::Medium);
    }

    #[test]
    fn test_preset_table() {
        let presets = QualityPresets::default();

        let low = presets.profile(QualityPreset::Low);
        assert_eq!((low.width, low.height), (1280, 720));
        assert_eq!(low.bitrate, "500k");
        assert_eq!(low.audio_bitrate, "96k");
        assert_eq!(low.preset, "ultrafast");

        let high = presets.profile(QualityPreset::High);
        assert_eq!((high.width, high.height), (1920, 1080));
        assert_eq!(high.bitrate, "3000k");
        assert_eq!(high.fps, 30);
        assert_eq!(high.preset, "slow");
    }

    #[test]
    fn test_base_dir_layout() {
        let config = AppConfig::with_base_dir("/srv/video");
        assert_eq!(config.upload_folder, PathBuf::from("/srv/video/uploads"));
        assert_eq!(config.output_folder, PathBuf::from("/srv/video/outputs"));
        assert_eq!(config.max_file_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.max_concurrent_videos, 3);
    }
}
