use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::models::video::MusicLibraryResponse;
use crate::routes::error::ApiError;

/// GET /api/music/library: selectable background tracks.
pub async fn music_library(
    State(state): State<AppState>,
) -> Result<Json<MusicLibraryResponse>, ApiError> {
    let music_files = state.uploads.music_library().map_err(|e| {
        tracing::error!(error = %e, "Error reading music library");
        ApiError::internal("Failed to retrieve music library")
    })?;
    Ok(Json(MusicLibraryResponse {
        success: true,
        count: music_files.len(),
        music_files,
    }))
}
