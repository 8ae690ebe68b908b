use serde::Serialize;
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

/// One audio file within an album directory, with its per-file tags.
#[derive(Debug, Clone)]
pub(crate) struct Track {
    pub album: Option<String>,
    pub title: String,
    pub track_no: u32,
    pub path: PathBuf,
}

/// A catalog entry for one album directory.
///
/// `id` is derived from the directory path (see [`crate::library::hash`]),
/// `tracks` is never empty, and artist/album/disc come from the first track.
#[derive(Debug, Clone)]
pub(crate) struct Audiobook {
    pub id: String,
    pub album: String,
    pub album_no: u32,
    pub artist: String,
    pub cover: Option<PathBuf>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub(crate) struct AudiobookSummary {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub album_no: u32,
    /// Cover file path relative to the covers root, when a cover exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_uri: Option<String>,
}

impl Audiobook {
    pub(crate) fn summary(&self, covers_dir: &Path) -> AudiobookSummary {
        let cover_uri = self.cover.as_ref().and_then(|cover| {
            match cover.strip_prefix(covers_dir) {
                Ok(relative) => Some(relative.to_string_lossy().into_owned()),
                Err(_) => {
                    tracing::error!(
                        cover = %cover.display(),
                        covers_dir = %covers_dir.display(),
                        "cover path is not under the covers root"
                    );
                    None
                }
            }
        });
        AudiobookSummary {
            id: self.id.clone(),
            artist: self.artist.clone(),
            title: self.album.clone(),
            album_no: self.album_no,
            cover_uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cover: Option<PathBuf>) -> Audiobook {
        Audiobook {
            id: "abc123".to_string(),
            album: "Wind in the Willows".to_string(),
            album_no: 1,
            artist: "A. Grahame".to_string(),
            cover,
            tracks: vec![Track {
                album: Some("Wind in the Willows".to_string()),
                title: "Chapter 1".to_string(),
                track_no: 1,
                path: PathBuf::from("/audiobooks/Wind in the Willows/01.mp3"),
            }],
        }
    }

    #[test]
    fn summary_relativizes_cover_path() {
        let book = sample(Some(PathBuf::from("/covers/abc123.png")));
        let summary = book.summary(Path::new("/covers"));
        assert_eq!(summary.cover_uri.as_deref(), Some("abc123.png"));
        assert_eq!(summary.title, "Wind in the Willows");
        assert_eq!(summary.artist, "A. Grahame");
    }

    #[test]
    fn summary_drops_cover_outside_covers_root() {
        let book = sample(Some(PathBuf::from("/elsewhere/abc123.png")));
        let summary = book.summary(Path::new("/covers"));
        assert!(summary.cover_uri.is_none());
    }

    #[test]
    fn summary_without_cover() {
        let summary = sample(None).summary(Path::new("/covers"));
        assert!(summary.cover_uri.is_none());
    }
}
