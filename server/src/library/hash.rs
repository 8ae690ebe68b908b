use sha2::{Digest, Sha256};
use std::path::Path;

/// Stable identifier for an album directory.
///
/// The digest is taken over the path's string form, not the directory
/// contents, so the id identifies a location: rescans of the same directory
/// always yield the same id across process restarts, even when files change.
pub(crate) fn path_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let path = Path::new("/audiobooks/Wind in the Willows");
        assert_eq!(path_hash(path), path_hash(path));
    }

    #[test]
    fn hash_distinguishes_paths() {
        assert_ne!(
            path_hash(Path::new("/audiobooks/a")),
            path_hash(Path::new("/audiobooks/b"))
        );
    }

    #[test]
    fn hash_is_hex_sha256() {
        let digest = path_hash(Path::new("/audiobooks/a"));
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|byte| byte.is_ascii_hexdigit()));
    }
}
