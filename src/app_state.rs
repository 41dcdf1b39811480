use std::sync::Arc;

use crate::services::{generation::VideoService, uploads::UploadStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub video: Arc<VideoService>,
    pub uploads: Arc<UploadStore>,
    /// Whether the media toolchain answered at startup.
    pub media_ready: bool,
}

impl AppState {
    pub fn new(video: VideoService, uploads: Arc<UploadStore>, media_ready: bool) -> Self {
        Self {
            video: Arc::new(video),
            uploads,
            media_ready,
        }
    }
}
