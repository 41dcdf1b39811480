use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::video::{MusicFile, UploadedFile};

/// Local filesystem store for uploaded images and the music library.
pub struct UploadStore {
    upload_root: PathBuf,
    music_root: PathBuf,
    max_file_bytes: u64,
    max_total_bytes: u64,
    max_files: usize,
    image_extensions: Vec<String>,
    audio_extensions: Vec<String>,
}

/// An upload directory being filled by one request.
///
/// Committing keeps the directory; dropping it uncommitted removes it.
pub struct UploadBatch<'a> {
    store: &'a UploadStore,
    upload_id: String,
    dir: PathBuf,
    files: Vec<UploadedFile>,
    total_size: u64,
    committed: bool,
}

impl UploadStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            upload_root: config.upload_folder.clone(),
            music_root: config.music_library_path.clone(),
            max_file_bytes: config.max_file_bytes(),
            max_total_bytes: config.max_total_bytes(),
            max_files: config.max_images_per_upload,
            image_extensions: normalize_extensions(&config.allowed_image_extensions),
            audio_extensions: normalize_extensions(&config.allowed_audio_extensions),
        }
    }

    pub fn upload_dir(&self, upload_id: &str) -> PathBuf {
        self.upload_root.join(upload_id)
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Create a fresh upload directory under a new random id.
    pub fn begin(&self) -> Result<UploadBatch<'_>, UploadError> {
        let upload_id = Uuid::new_v4().to_string();
        let dir = self.upload_dir(&upload_id);
        std::fs::create_dir_all(&dir)?;
        Ok(UploadBatch {
            store: self,
            upload_id,
            dir,
            files: Vec::new(),
            total_size: 0,
            committed: false,
        })
    }

    pub fn is_allowed_image(&self, filename: &str) -> bool {
        has_extension(filename, &self.image_extensions)
    }

    /// Music files available for background audio.
    pub fn music_library(&self) -> Result<Vec<MusicFile>, UploadError> {
        let mut files = Vec::new();
        let entries = match std::fs::read_dir(&self.music_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.is_file() && has_extension(name, &self.audio_extensions) {
                files.push(MusicFile {
                    filename: name.to_string(),
                    size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                });
            }
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    pub fn music_path(&self, filename: &str) -> PathBuf {
        self.music_root.join(filename)
    }
}

impl UploadBatch<'_> {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store one image. Files with a disallowed extension are skipped and
    /// reported as `Ok(false)`.
    pub fn add(&mut self, filename: &str, data: &[u8]) -> Result<bool, UploadError> {
        if !self.store.is_allowed_image(filename) {
            tracing::debug!(filename, "Skipping upload with disallowed extension");
            return Ok(false);
        }
        let filename = sanitize_filename(filename).ok_or(UploadError::InvalidFilename)?;

        let size = data.len() as u64;
        if size > self.store.max_file_bytes {
            return Err(UploadError::FileTooLarge {
                filename,
                limit_mb: self.store.max_file_bytes / (1024 * 1024),
            });
        }
        if self.total_size + size > self.store.max_total_bytes {
            return Err(UploadError::TotalTooLarge {
                limit_mb: self.store.max_total_bytes / (1024 * 1024),
            });
        }

        std::fs::write(self.dir.join(&filename), data)?;
        self.total_size += size;
        self.files.push(UploadedFile { filename, size });
        Ok(true)
    }

    /// Keep the upload directory and return what was stored.
    pub fn commit(mut self) -> (String, u64, Vec<UploadedFile>) {
        self.committed = true;
        tracing::info!(
            upload_id = %self.upload_id,
            files = self.files.len(),
            total_size = self.total_size,
            "Upload complete"
        );
        (
            std::mem::take(&mut self.upload_id),
            self.total_size,
            std::mem::take(&mut self.files),
        )
    }
}

impl Drop for UploadBatch<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn has_extension(filename: &str, allowed: &[String]) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Reduce a client-supplied name to a safe single path component.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() || !cleaned.contains('.') {
        None
    } else {
        Some(cleaned)
    }
}

/// True when `name` is a plain file or directory name with no path parts.
pub fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File {filename} exceeds {limit_mb}MB limit")]
    FileTooLarge { filename: String, limit_mb: u64 },

    #[error("Total upload size exceeds {limit_mb}MB limit")]
    TotalTooLarge { limit_mb: u64 },

    #[error("Invalid file name")]
    InvalidFilename,

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}
