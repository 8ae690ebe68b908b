use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lofty::file::TaggedFileExt;
use lofty::picture::PictureType;
use lofty::tag::Accessor;
use walkdir::WalkDir;

use super::cover::persist_cover;
use super::hash::path_hash;
use super::model::{Audiobook, Track};

/// Walks the audiobooks root and builds a complete catalog snapshot.
///
/// Each immediate subdirectory is one album candidate. Albums that yield no
/// recognized audio files, or whose files cannot be read, are skipped with a
/// warning; the walk always continues to the next album. The returned list
/// is the entire new snapshot, never a partial one.
pub(crate) fn scan_library(
    root: &Path,
    covers_dir: &Path,
    extensions: &HashSet<String>,
) -> Vec<Audiobook> {
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "audiobooks root is not a directory");
        return Vec::new();
    }

    let mut album_dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();
    album_dirs.sort();
    tracing::debug!(root = %root.display(), albums = album_dirs.len(), "discovered album directories");

    let mut audiobooks = Vec::new();
    for album_dir in album_dirs {
        match scan_album(&album_dir, covers_dir, extensions) {
            Ok(Some(audiobook)) => audiobooks.push(audiobook),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(album = %album_dir.display(), error = %err, "skipping unreadable album");
            }
        }
    }
    audiobooks
}

fn scan_album(
    album_dir: &Path,
    covers_dir: &Path,
    extensions: &HashSet<String>,
) -> Result<Option<Audiobook>> {
    let files = audio_files(album_dir, extensions);
    if files.is_empty() {
        tracing::warn!(album = %album_dir.display(), "album directory has no recognized audio files");
        return Ok(None);
    }

    let mut tag_list = Vec::with_capacity(files.len());
    for file in &files {
        tag_list.push(read_tags(file)?);
    }

    let id = path_hash(album_dir);
    let cover_bytes = tag_list.first_mut().and_then(|tags| tags.front_cover.take());
    let cover = persist_cover(&covers_dir.join(&id), cover_bytes.as_deref());

    let distinct_albums: HashSet<&str> = tag_list
        .iter()
        .filter_map(|tags| tags.album.as_deref())
        .collect();
    if distinct_albums.len() > 1 {
        tracing::warn!(album = %album_dir.display(), "tracks disagree on the album title");
    }

    let Some(first) = tag_list.first() else {
        return Ok(None);
    };
    let album = first
        .album
        .clone()
        .or_else(|| {
            album_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "Unknown Album".to_string());
    let artist = first
        .artist
        .clone()
        .unwrap_or_else(|| "Unknown Artist".to_string());
    let album_no = first.disc_no.unwrap_or(1);

    let tracks = files
        .iter()
        .zip(&tag_list)
        .enumerate()
        .map(|(position, (file, tags))| Track {
            album: tags.album.clone(),
            title: tags.title.clone().unwrap_or_else(|| file_stem(file)),
            track_no: tags.track_no.unwrap_or(position as u32 + 1),
            path: file.clone(),
        })
        .collect();

    Ok(Some(Audiobook {
        id,
        album,
        album_no,
        artist,
        cover,
        tracks,
    }))
}

/// Audio files directly inside the album directory, sorted by file name so
/// positional track-number fallbacks are deterministic.
fn audio_files(album_dir: &Path, extensions: &HashSet<String>) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(album_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_audio_extension(path, extensions))
        .collect();
    files.sort();
    files
}

fn has_audio_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_ascii_lowercase()))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown Title".to_string())
}

#[derive(Debug, Default)]
struct FileTags {
    album: Option<String>,
    title: Option<String>,
    artist: Option<String>,
    track_no: Option<u32>,
    disc_no: Option<u32>,
    front_cover: Option<Vec<u8>>,
}

fn read_tags(path: &Path) -> Result<FileTags> {
    let tagged = lofty::read_from_path(path)
        .with_context(|| format!("failed to read audio file {}", path.display()))?;
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return Ok(FileTags::default());
    };

    let front_cover = tag
        .pictures()
        .iter()
        .find(|picture| picture.pic_type() == PictureType::CoverFront)
        .or_else(|| tag.pictures().first())
        .map(|picture| picture.data().to_vec());

    Ok(FileTags {
        album: non_empty(tag.album().as_deref()),
        title: non_empty(tag.title().as_deref()),
        artist: non_empty(tag.artist().as_deref()),
        track_no: tag.track(),
        disc_no: tag.disk(),
        front_cover,
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
