use std::fs;
use std::path::{Path, PathBuf};

/// Writes an album's embedded cover image next to the other covers,
/// named `<target_stem>.<ext>` with the extension inferred from the image
/// bytes rather than any filename. Returns the written path, or `None`
/// when there is nothing to persist or the bytes are not a known image.
pub(crate) fn persist_cover(target_stem: &Path, image: Option<&[u8]>) -> Option<PathBuf> {
    let image = match image {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => {
            tracing::debug!(target = %target_stem.display(), "no embedded cover image to persist");
            return None;
        }
    };

    let format = match image::guess_format(image) {
        Ok(format) => format,
        Err(err) => {
            tracing::error!(
                error = %err,
                target = %target_stem.display(),
                "could not determine cover image type"
            );
            return None;
        }
    };
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    let target = target_stem.with_extension(extension);

    if let Some(parent) = target.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::error!(error = %err, dir = %parent.display(), "failed to create covers directory");
            return None;
        }
    }
    match fs::write(&target, image) {
        Ok(()) => {
            tracing::info!(cover = %target.display(), "cover saved");
            Some(target)
        }
        Err(err) => {
            tracing::error!(error = %err, cover = %target.display(), "failed to write cover");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::png_bytes;
    use tempfile::TempDir;

    #[test]
    fn persists_png_with_detected_extension() {
        let dir = TempDir::new().unwrap();
        let bytes = png_bytes();
        let written = persist_cover(&dir.path().join("covers").join("abc123"), Some(&bytes));

        let written = written.unwrap();
        assert_eq!(written.extension().and_then(|ext| ext.to_str()), Some("png"));
        assert_eq!(fs::read(&written).unwrap(), bytes);
    }

    #[test]
    fn overwrite_with_identical_bytes_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let bytes = png_bytes();
        let stem = dir.path().join("abc123");
        let first = persist_cover(&stem, Some(&bytes)).unwrap();
        let second = persist_cover(&stem, Some(&bytes)).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), bytes);
    }

    #[test]
    fn missing_image_writes_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(persist_cover(&dir.path().join("abc123"), None).is_none());
        assert!(persist_cover(&dir.path().join("abc123"), Some(&[])).is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn undetectable_bytes_write_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(persist_cover(&dir.path().join("abc123"), Some(b"not an image")).is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
