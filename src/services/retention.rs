use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::config::AppConfig;

/// What a retention sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub uploads_removed: usize,
    pub outputs_removed: usize,
}

/// Remove upload directories and rendered videos older than their retention
/// windows. Errors on individual entries are logged and skipped.
pub fn sweep(config: &AppConfig) -> SweepReport {
    let now = SystemTime::now();
    let report = SweepReport {
        uploads_removed: sweep_dir(
            &config.upload_folder,
            hours(config.upload_retention_hours),
            now,
        ),
        outputs_removed: sweep_dir(
            &config.output_folder,
            hours(config.output_retention_hours),
            now,
        ),
    };
    tracing::info!(
        uploads_removed = report.uploads_removed,
        outputs_removed = report.outputs_removed,
        "Retention sweep finished"
    );
    report
}

fn hours(h: u64) -> Duration {
    Duration::from_secs(h * 3600)
}

fn sweep_dir(root: &Path, max_age: Duration, now: SystemTime) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else { continue };
        let Ok(modified) = meta.modified() else { continue };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        let result = if meta.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired entry"),
        }
    }
    removed
}
