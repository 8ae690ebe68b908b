use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::LibraryConfig;

use super::model::Audiobook;
use super::scan::scan_library;
use super::store::SnapshotStore;

/// Rebuilds the catalog snapshot from disk, one scan at a time.
///
/// Triggers arriving while a scan is running are coalesced into the
/// in-flight scan instead of spawning concurrent walks of the same tree.
/// The previous snapshot stays published until a scan completes.
pub(crate) struct LibraryRescanner {
    audiobooks_dir: PathBuf,
    covers_dir: PathBuf,
    extensions: HashSet<String>,
    store: Arc<SnapshotStore<Audiobook>>,
    scanning: AtomicBool,
}

impl LibraryRescanner {
    pub(crate) fn new(library: &LibraryConfig, store: Arc<SnapshotStore<Audiobook>>) -> Self {
        Self {
            audiobooks_dir: library.audiobooks_dir.clone(),
            covers_dir: library.covers_dir.clone(),
            extensions: library.extension_set(),
            store,
            scanning: AtomicBool::new(false),
        }
    }

    /// Starts a background rescan; returns false when one is already
    /// running and this request was coalesced into it.
    pub(crate) fn trigger(self: &Arc<Self>) -> bool {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("library rescan already in progress");
            return false;
        }
        let rescanner = Arc::clone(self);
        tokio::spawn(async move {
            rescanner.run().await;
            rescanner.scanning.store(false, Ordering::Release);
        });
        true
    }

    pub(crate) async fn run(&self) {
        let root = self.audiobooks_dir.clone();
        let covers_dir = self.covers_dir.clone();
        let extensions = self.extensions.clone();
        let result =
            tokio::task::spawn_blocking(move || scan_library(&root, &covers_dir, &extensions))
                .await;
        match result {
            Ok(audiobooks) => {
                tracing::info!(audiobooks = audiobooks.len(), "library rescan complete");
                self.store.replace(audiobooks);
            }
            Err(err) => {
                tracing::error!(error = %err, "library rescan failed; keeping previous catalog");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_wav;
    use std::fs;
    use tempfile::TempDir;

    fn library_config(root: &TempDir, covers: &TempDir) -> LibraryConfig {
        LibraryConfig {
            audiobooks_dir: root.path().to_path_buf(),
            covers_dir: covers.path().to_path_buf(),
            audio_extensions: vec!["wav".to_string()],
        }
    }

    #[tokio::test]
    async fn run_publishes_a_fresh_snapshot() {
        let root = TempDir::new().unwrap();
        let covers = TempDir::new().unwrap();
        let album = root.path().join("Album");
        fs::create_dir_all(&album).unwrap();
        write_wav(&album.join("01.wav"));

        let store = Arc::new(SnapshotStore::default());
        let rescanner = LibraryRescanner::new(&library_config(&root, &covers), Arc::clone(&store));

        rescanner.run().await;
        assert_eq!(store.current().len(), 1);

        // A second album shows up wholesale on the next run.
        let other = root.path().join("Other");
        fs::create_dir_all(&other).unwrap();
        write_wav(&other.join("01.wav"));
        rescanner.run().await;
        assert_eq!(store.current().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_triggers_are_coalesced() {
        let root = TempDir::new().unwrap();
        let covers = TempDir::new().unwrap();
        let store = Arc::new(SnapshotStore::default());
        let rescanner = Arc::new(LibraryRescanner::new(
            &library_config(&root, &covers),
            store,
        ));

        // Simulate an in-flight scan holding the guard.
        rescanner.scanning.store(true, Ordering::Release);
        assert!(!rescanner.trigger());

        rescanner.scanning.store(false, Ordering::Release);
        assert!(rescanner.trigger());
    }
}
