use std::sync::{Arc, RwLock};

/// A wholesale-replaceable snapshot of a collection.
///
/// Exactly one component writes each store; any number of readers may call
/// `current` concurrently. `replace` swaps a single `Arc`, so a reader holds
/// either the entire previous list or the entire new one, never a mix.
#[derive(Debug)]
pub(crate) struct SnapshotStore<T> {
    inner: RwLock<Arc<Vec<T>>>,
}

impl<T> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl<T> SnapshotStore<T> {
    pub(crate) fn replace(&self, items: Vec<T>) {
        let mut guard = self.inner.write().unwrap_or_else(|err| err.into_inner());
        *guard = Arc::new(items);
    }

    pub(crate) fn current(&self) -> Arc<Vec<T>> {
        self.inner
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn replace_swaps_whole_snapshot() {
        let store = SnapshotStore::default();
        assert!(store.current().is_empty());
        store.replace(vec![1, 2, 3]);
        assert_eq!(*store.current(), vec![1, 2, 3]);
        store.replace(vec![4]);
        assert_eq!(*store.current(), vec![4]);
    }

    #[test]
    fn readers_never_observe_a_partial_snapshot() {
        let store = Arc::new(SnapshotStore::default());
        store.replace(vec![0u32; 2]);

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for round in 0..500 {
                    let len = if round % 2 == 0 { 5 } else { 2 };
                    store.replace(vec![round; len]);
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = store.current();
                        assert!(snapshot.len() == 2 || snapshot.len() == 5);
                        // All elements belong to the same published round.
                        assert!(snapshot.windows(2).all(|pair| pair[0] == pair[1]));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
