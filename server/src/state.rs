use std::sync::Arc;

use ractor::ActorRef;

use crate::config::Settings;
use crate::jobs::upload::UploadQueueMessage;
use crate::library::model::Audiobook;
use crate::library::rescan::LibraryRescanner;
use crate::library::store::SnapshotStore;
use crate::tonie_cloud::Tonie;

/// Shared handles for the request handlers.
///
/// Each snapshot store has exactly one writer elsewhere (the rescanner and
/// the tonie list refresher); handlers only read snapshots or message the
/// upload queue.
pub(crate) struct AppState {
    pub settings: Arc<Settings>,
    pub catalog: Arc<SnapshotStore<Audiobook>>,
    pub tonies: Arc<SnapshotStore<Tonie>>,
    pub rescanner: Arc<LibraryRescanner>,
    pub upload_queue: ActorRef<UploadQueueMessage>,
}
