/// Metadata edits and committing them to disk
///
/// An edit never touches a sidecar or database: it renames the video so
/// that its file name encodes the new metadata. The cover, if there is one,
/// follows the title.
///
/// Form structs hold raw text as typed by the user. They are serializable
/// so a half-filled form can be logged or restored.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::codec;
use super::data::{dedup_preserving, Metadata, Rating, Record, ReleaseDate};
use crate::error::RenameError;
use crate::media::thumbnail::find_cover;

fn non_empty(raw: &str) -> Option<String> {
    Some(raw.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Single-record edit form
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RecordEdit {
    pub name: String,
    /// Comma separated
    pub tags: String,
    /// Comma separated
    pub actors: String,
    pub series: String,
    pub release: String,
    pub rating: Rating,
    pub feature: String,
}

impl RecordEdit {
    /// Prefill the form from a record's current metadata
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            name: meta.name.clone(),
            tags: meta.tags.join(", "),
            actors: meta.actors.join(", "),
            series: meta.series_str().to_string(),
            release: meta.release_str().to_string(),
            rating: meta.rating,
            feature: meta.feature_str().to_string(),
        }
    }

    /// Parse the form back into metadata
    pub fn to_metadata(&self) -> Metadata {
        Metadata {
            name: self.name.trim().to_string(),
            tags: codec::split_list(&self.tags),
            actors: codec::split_list(&self.actors),
            series: non_empty(&self.series),
            release: non_empty(&self.release).map(|raw| ReleaseDate::parse(&raw)),
            rating: self.rating,
            feature: non_empty(&self.feature),
        }
    }

    /// Add `tag` to the tag list, or remove it if it is already there
    pub fn toggle_tag(&mut self, tag: &str) {
        let mut tags = codec::split_list(&self.tags);
        match tags.iter().position(|t| t == tag) {
            Some(i) => {
                tags.remove(i);
            }
            None => tags.push(tag.to_string()),
        }
        self.tags = tags.join(", ");
    }

    /// True if saving would not change anything
    pub fn is_unchanged(&self, meta: &Metadata) -> bool {
        self.to_metadata() == *meta
    }
}

/// Edit applied to every record of a multi-selection.
///
/// Tags are appended. The other fields are replaced only when set;
/// an empty replacement clears the field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BatchEdit {
    /// Comma separated tags to append
    pub add_tags: String,
    pub actors: Option<String>,
    pub series: Option<String>,
    pub release: Option<String>,
    pub rating: Option<Rating>,
    pub feature: Option<String>,
}

impl BatchEdit {
    pub fn is_empty(&self) -> bool {
        codec::split_list(&self.add_tags).is_empty()
            && self.actors.is_none()
            && self.series.is_none()
            && self.release.is_none()
            && self.rating.is_none()
            && self.feature.is_none()
    }

    pub fn apply_to(&self, meta: &Metadata) -> Metadata {
        let mut out = meta.clone();

        let added = codec::split_list(&self.add_tags);
        if !added.is_empty() {
            out.tags = dedup_preserving(out.tags.into_iter().chain(added));
        }
        if let Some(actors) = &self.actors {
            out.actors = codec::split_list(actors);
        }
        if let Some(series) = &self.series {
            out.series = non_empty(series);
        }
        if let Some(release) = &self.release {
            out.release = non_empty(release).map(|raw| ReleaseDate::parse(&raw));
        }
        if let Some(rating) = self.rating {
            out.rating = rating;
        }
        if let Some(feature) = &self.feature {
            out.feature = non_empty(feature);
        }
        out
    }
}

/// Rename `record`'s file so it encodes `meta`, and return the record as
/// it now exists on disk. The cover is renamed on a best-effort basis.
pub fn commit(record: &Record, meta: &Metadata, cover_dir: &str) -> Result<Record, RenameError> {
    let file_name = codec::encode_file_name(meta, record.extension());
    if file_name.contains(['/', '\\']) {
        return Err(RenameError::PathSeparator(file_name));
    }
    let dir = record.directory();
    let new_path = dir.join(&file_name);

    if new_path != record.id {
        if new_path.exists() {
            return Err(RenameError::TargetExists(new_path));
        }
        fs::rename(&record.id, &new_path).map_err(|e| RenameError::Io {
            from: record.id.clone(),
            to: new_path.clone(),
            source: Arc::new(e),
        })?;
        info!("renamed {} -> {}", record.id.display(), file_name);
    } else {
        debug!("{} already encodes this metadata", record.id.display());
    }

    // What the next scan would see
    let meta = codec::decode_file_name(&file_name);
    let thumbnail = match &record.thumbnail {
        Some(old) => Some(rename_cover(old, &meta.name)),
        None => find_cover(dir, cover_dir, &meta.name),
    };

    Ok(Record::new(new_path, meta, thumbnail))
}

/// Move a cover to `<title>.<ext>` next to it. On failure the old path is kept.
fn rename_cover(old: &Path, title: &str) -> PathBuf {
    let Some(ext) = old.extension().and_then(|e| e.to_str()) else {
        return old.to_path_buf();
    };
    let new = old.with_file_name(format!("{}.{}", title, ext));
    if new == old || title.is_empty() {
        return old.to_path_buf();
    }
    if new.exists() {
        warn!("cover {} already exists, keeping {}", new.display(), old.display());
        return old.to_path_buf();
    }
    match fs::rename(old, &new) {
        Ok(()) => new,
        Err(e) => {
            warn!("could not rename cover {}: {}", old.display(), e);
            old.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_meta() -> Metadata {
        codec::decode("Trip[Beach, Sun]{Amy}(Summer)~2023-05-01@4%xyz")
    }

    #[test]
    fn test_form_round_trip() {
        let meta = sample_meta();
        let form = RecordEdit::from_metadata(&meta);
        assert_eq!(form.tags, "Beach, Sun");
        assert!(form.is_unchanged(&meta));
        assert_eq!(form.to_metadata(), meta);
    }

    #[test]
    fn test_form_normalizes_input() {
        let form = RecordEdit {
            name: "  Spaced  ".into(),
            tags: "a, ,b,a".into(),
            series: "   ".into(),
            rating: Rating::clamped(9),
            ..RecordEdit::default()
        };
        let meta = form.to_metadata();
        assert_eq!(meta.name, "Spaced");
        assert_eq!(meta.tags, vec!["a", "b"]);
        assert_eq!(meta.series, None);
        assert_eq!(meta.rating.get(), 5);
    }

    #[test]
    fn test_toggle_tag() {
        let mut form = RecordEdit::from_metadata(&sample_meta());
        form.toggle_tag("Sun");
        assert_eq!(form.tags, "Beach");
        form.toggle_tag("Night");
        assert_eq!(form.tags, "Beach, Night");
    }

    #[test]
    fn test_batch_edit_appends_tags_and_replaces_opted_fields() {
        let batch = BatchEdit {
            add_tags: "Sun, Road".into(),
            rating: Some(Rating::clamped(2)),
            feature: Some(String::new()),
            ..BatchEdit::default()
        };
        let out = batch.apply_to(&sample_meta());
        assert_eq!(out.tags, vec!["Beach", "Sun", "Road"]);
        assert_eq!(out.actors, vec!["Amy"]);
        assert_eq!(out.series.as_deref(), Some("Summer"));
        assert_eq!(out.rating.get(), 2);
        assert_eq!(out.feature, None);
        assert!(!batch.is_empty());
        assert!(BatchEdit::default().is_empty());
    }

    #[test]
    fn test_commit_renames_video_and_cover() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("Old@1.mp4");
        fs::write(&video, b"").unwrap();
        let covers = dir.path().join("cover");
        fs::create_dir(&covers).unwrap();
        let cover = covers.join("Old.jpg");
        fs::write(&cover, b"").unwrap();

        let record = Record::new(video.clone(), codec::decode("Old@1"), Some(cover.clone()));
        let mut meta = record.meta.clone();
        meta.name = "New".into();
        meta.tags = vec!["x".into()];

        let updated = commit(&record, &meta, "cover").unwrap();
        assert_eq!(updated.id, dir.path().join("New[x]@1.mp4"));
        assert!(updated.id.exists());
        assert!(!video.exists());
        assert_eq!(updated.thumbnail, Some(covers.join("New.jpg")));
        assert!(!cover.exists());
        assert_eq!(updated.meta, meta);
    }

    #[test]
    fn test_commit_refuses_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A@1.mp4");
        let b = dir.path().join("B@1.mp4");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        let record = Record::new(a.clone(), codec::decode("A@1"), None);
        let err = commit(&record, &codec::decode("B@1"), "cover").unwrap_err();
        assert!(matches!(err, RenameError::TargetExists(path) if path == b));
        assert!(a.exists());
        assert_eq!(fs::read(&b).unwrap(), b"b");
    }

    #[test]
    fn test_commit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let record = Record::new(dir.path().join("Gone@1.mp4"), codec::decode("Gone@1"), None);
        let err = commit(&record, &codec::decode("Back@1"), "cover").unwrap_err();
        assert!(matches!(err, RenameError::Io { .. }));
    }

    #[test]
    fn test_commit_refuses_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let video = dir.path().join("Clip@1.mp4");
        fs::write(&video, b"").unwrap();
        let record = Record::new(video.clone(), codec::decode("Clip@1"), None);

        for title in ["sub/Clip", "..\\Clip"] {
            let mut meta = record.meta.clone();
            meta.name = title.into();
            let err = commit(&record, &meta, "cover").unwrap_err();
            assert!(matches!(err, RenameError::PathSeparator(_)));
        }
        assert!(video.exists());
        assert!(!dir.path().join("sub").join("Clip@1.mp4").exists());
    }

    #[test]
    fn test_commit_picks_up_cover_for_new_title() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("Draft@1.mp4");
        fs::write(&video, b"").unwrap();
        fs::create_dir(dir.path().join("cover")).unwrap();
        fs::write(dir.path().join("cover").join("Final.png"), b"").unwrap();

        let record = Record::new(video, codec::decode("Draft@1"), None);
        let updated = commit(&record, &codec::decode("Final@3"), "cover").unwrap();
        assert_eq!(
            updated.thumbnail,
            Some(dir.path().join("cover").join("Final.png"))
        );
    }
}
