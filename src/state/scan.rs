use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::codec;
use super::data::Record;
use crate::config::AppConfig;
use crate::error::ScanError;
use crate::media::thumbnail::find_cover;

/// Result of walking one directory tree
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub root: PathBuf,
    /// Records in walk order (sorted by file name within each directory)
    pub records: Vec<Record>,
    /// Entries that could not be read and were skipped
    pub skipped: usize,
    pub finished_at: DateTime<Utc>,
}

/// Walk `root` recursively and decode every video file found.
///
/// Only a root that cannot be read aborts the scan; unreadable entries
/// below it are logged and skipped.
pub fn scan_directory(root: &Path, config: &AppConfig) -> Result<ScanReport, ScanError> {
    fs::read_dir(root).map_err(|e| ScanError::UnreadableRoot {
        path: root.to_path_buf(),
        source: Arc::new(e),
    })?;

    info!("scanning {}", root.display());

    let mut records = Vec::new();
    let mut skipped = 0;

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                skipped += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| config.is_video_extension(ext));
        if !is_video {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let meta = codec::decode_file_name(&file_name);
        let dir = path.parent().unwrap_or(root);
        let thumbnail = find_cover(dir, &config.cover_dir, &meta.name);

        records.push(Record::new(path.to_path_buf(), meta, thumbnail));
        if records.len() % 500 == 0 {
            debug!("scanned {} videos so far", records.len());
        }
    }

    info!(
        "scan of {} finished: {} videos, {} skipped",
        root.display(),
        records.len(),
        skipped
    );

    Ok(ScanReport {
        root: root.to_path_buf(),
        records,
        skipped,
        finished_at: Utc::now(),
    })
}

/// Run `scan_directory` on the blocking pool so the UI thread stays free
pub async fn scan_directory_async(root: PathBuf, config: AppConfig) -> Result<ScanReport, ScanError> {
    let fallback = root.clone();
    task::spawn_blocking(move || scan_directory(&root, &config))
        .await
        .map_err(|e| ScanError::Walk {
            path: fallback,
            message: format!("scan task failed: {}", e),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_scan_finds_videos_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Trip[Beach]{Amy}@4.mp4"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub").join("Night{Bo}~2020-01-01@2.MKV"));
        touch(&root.join("sub").join("cover").join("Night.jpg"));

        let report = scan_directory(root, &AppConfig::default()).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.skipped, 0);

        let names: Vec<_> = report.records.iter().map(|r| r.meta.name.as_str()).collect();
        assert!(names.contains(&"Trip"));
        assert!(names.contains(&"Night"));

        let night = report
            .records
            .iter()
            .find(|r| r.meta.name == "Night")
            .unwrap();
        assert_eq!(night.meta.actors, vec!["Bo"]);
        assert_eq!(
            night.thumbnail.as_deref(),
            Some(root.join("sub").join("cover").join("Night.jpg").as_path())
        );

        let trip = report.records.iter().find(|r| r.meta.name == "Trip").unwrap();
        assert_eq!(trip.thumbnail, None);
        assert_eq!(trip.meta.rating.get(), 4);
    }

    #[test]
    fn test_scan_respects_configured_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a@1.mp4"));
        touch(&dir.path().join("b@1.webm"));

        let mut config = AppConfig::default();
        config.video_extensions = vec!["webm".to_string()];
        let report = scan_directory(dir.path(), &config).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].meta.name, "b");
    }

    #[test]
    fn test_unreadable_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = scan_directory(&missing, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, ScanError::UnreadableRoot { .. }));
    }

    #[test]
    fn test_async_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Clip@3.avi"));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let report = runtime
            .block_on(scan_directory_async(
                dir.path().to_path_buf(),
                AppConfig::default(),
            ))
            .unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.root, dir.path());
    }
}
