use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::FormatItem;
use tokio::sync::oneshot;
use utoipa::ToSchema;

use crate::api_error::ApiError;
use crate::library::model::Audiobook;
use crate::library::store::SnapshotStore;
use crate::tonie_cloud::{Tonie, TonieCloudApi};

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum UploadStatus {
    Queued,
    Uploading,
    Completed,
    Failed,
    Error,
    Unknown,
}

impl UploadStatus {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Error)
    }
}

/// One requested transfer of an audiobook onto a creative tonie.
#[derive(Debug, Clone)]
pub(crate) struct UploadTask {
    pub tonie_id: String,
    pub audiobook_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub(crate) struct UploadTaskModel {
    pub tonie_id: String,
    pub audiobook_id: String,
    pub status: UploadStatus,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub(crate) struct UploadQueueModel {
    pub queue: Vec<UploadTaskModel>,
}

#[derive(Debug)]
pub(crate) enum UploadOutcome {
    Completed,
    Failed(String),
    Error(String),
}

struct StatusEntry {
    status: UploadStatus,
    updated_at: String,
    seq: u64,
}

pub(crate) enum UploadQueueMessage {
    Enqueue {
        task: UploadTask,
        reply: oneshot::Sender<UploadTaskModel>,
    },
    GetStatus {
        audiobook_id: String,
        reply: oneshot::Sender<UploadStatus>,
    },
    GetStatusFor {
        tonie_id: String,
        audiobook_id: String,
        reply: oneshot::Sender<UploadStatus>,
    },
    GetQueue {
        reply: oneshot::Sender<UploadQueueModel>,
    },
    RunnerFinished {
        task: UploadTask,
        outcome: UploadOutcome,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub(crate) struct UploadQueueActor;

pub(crate) struct UploadQueueArgs {
    pub runner_name: Option<String>,
    pub catalog: Arc<SnapshotStore<Audiobook>>,
    pub tonies: Arc<SnapshotStore<Tonie>>,
    pub cloud: Arc<dyn TonieCloudApi>,
}

pub(crate) struct UploadQueueState {
    queue: VecDeque<UploadTask>,
    running: Option<UploadTask>,
    statuses: HashMap<(String, String), StatusEntry>,
    seq: u64,
    draining: Option<oneshot::Sender<()>>,
    runner: ActorRef<UploadRunnerMessage>,
}

impl UploadQueueState {
    fn set_status(&mut self, task: &UploadTask, status: UploadStatus) {
        self.seq += 1;
        self.statuses.insert(
            (task.tonie_id.clone(), task.audiobook_id.clone()),
            StatusEntry {
                status,
                updated_at: current_iso_timestamp(),
                seq: self.seq,
            },
        );
    }

    fn status_for(&self, task: &UploadTask) -> UploadStatus {
        self.statuses
            .get(&(task.tonie_id.clone(), task.audiobook_id.clone()))
            .map(|entry| entry.status)
            .unwrap_or(UploadStatus::Unknown)
    }

    /// The most recently updated slot for the audiobook, across tonies.
    fn latest_status(&self, audiobook_id: &str) -> UploadStatus {
        self.statuses
            .iter()
            .filter(|((_, book), _)| book == audiobook_id)
            .max_by_key(|(_, entry)| entry.seq)
            .map(|(_, entry)| entry.status)
            .unwrap_or(UploadStatus::Unknown)
    }

    fn model_for(&self, task: &UploadTask) -> UploadTaskModel {
        let entry = self
            .statuses
            .get(&(task.tonie_id.clone(), task.audiobook_id.clone()));
        UploadTaskModel {
            tonie_id: task.tonie_id.clone(),
            audiobook_id: task.audiobook_id.clone(),
            status: entry.map(|entry| entry.status).unwrap_or(UploadStatus::Unknown),
            updated_at: entry
                .map(|entry| entry.updated_at.clone())
                .unwrap_or_else(current_iso_timestamp),
        }
    }
}

pub(crate) enum UploadRunnerMessage {
    RunTask {
        task: UploadTask,
        reply: oneshot::Sender<Result<(), String>>,
    },
}

pub(crate) struct UploadRunnerActor;

pub(crate) struct UploadRunnerArgs {
    pub queue: ActorRef<UploadQueueMessage>,
    pub catalog: Arc<SnapshotStore<Audiobook>>,
    pub tonies: Arc<SnapshotStore<Tonie>>,
    pub cloud: Arc<dyn TonieCloudApi>,
}

pub(crate) struct UploadRunnerState {
    queue: ActorRef<UploadQueueMessage>,
    catalog: Arc<SnapshotStore<Audiobook>>,
    tonies: Arc<SnapshotStore<Tonie>>,
    cloud: Arc<dyn TonieCloudApi>,
}

impl Actor for UploadQueueActor {
    type Msg = UploadQueueMessage;
    type State = UploadQueueState;
    type Arguments = UploadQueueArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let (runner, _handle) = Actor::spawn(
            args.runner_name,
            UploadRunnerActor,
            UploadRunnerArgs {
                queue: myself.clone(),
                catalog: args.catalog,
                tonies: args.tonies,
                cloud: args.cloud,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to start upload runner");
            ActorProcessingErr::from("failed to start upload runner")
        })?;
        Ok(UploadQueueState {
            queue: VecDeque::new(),
            running: None,
            statuses: HashMap::new(),
            seq: 0,
            draining: None,
            runner,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            UploadQueueMessage::Enqueue { task, reply } => {
                state.set_status(&task, UploadStatus::Queued);
                state.queue.push_back(task.clone());
                if state.running.is_none() && state.draining.is_none() {
                    start_next_task(state).await;
                }
                let _ = reply.send(state.model_for(&task));
            }
            UploadQueueMessage::GetStatus { audiobook_id, reply } => {
                let _ = reply.send(state.latest_status(&audiobook_id));
            }
            UploadQueueMessage::GetStatusFor {
                tonie_id,
                audiobook_id,
                reply,
            } => {
                let task = UploadTask {
                    tonie_id,
                    audiobook_id,
                };
                let _ = reply.send(state.status_for(&task));
            }
            UploadQueueMessage::GetQueue { reply } => {
                let mut queue = Vec::new();
                if let Some(running) = state.running.as_ref() {
                    queue.push(state.model_for(running));
                }
                for task in state.queue.iter() {
                    queue.push(state.model_for(task));
                }
                let _ = reply.send(UploadQueueModel { queue });
            }
            UploadQueueMessage::RunnerFinished { task, outcome } => {
                match outcome {
                    UploadOutcome::Completed => {
                        tracing::info!(
                            tonie = %task.tonie_id,
                            audiobook = %task.audiobook_id,
                            "upload completed"
                        );
                        state.set_status(&task, UploadStatus::Completed);
                    }
                    UploadOutcome::Failed(detail) => {
                        tracing::warn!(
                            tonie = %task.tonie_id,
                            audiobook = %task.audiobook_id,
                            detail = %detail,
                            "upload failed"
                        );
                        state.set_status(&task, UploadStatus::Failed);
                    }
                    UploadOutcome::Error(detail) => {
                        tracing::error!(
                            tonie = %task.tonie_id,
                            audiobook = %task.audiobook_id,
                            detail = %detail,
                            "upload errored"
                        );
                        state.set_status(&task, UploadStatus::Error);
                    }
                }
                state.running = None;
                if let Some(reply) = state.draining.take() {
                    state.runner.stop(None);
                    let _ = reply.send(());
                    myself.stop(None);
                } else {
                    start_next_task(state).await;
                }
            }
            UploadQueueMessage::Shutdown { reply } => {
                if state.running.is_none() {
                    state.runner.stop(None);
                    let _ = reply.send(());
                    myself.stop(None);
                } else {
                    tracing::info!("upload queue draining; waiting for in-flight upload");
                    state.draining = Some(reply);
                }
            }
        }
        Ok(())
    }
}

async fn start_next_task(state: &mut UploadQueueState) {
    if state.running.is_some() {
        return;
    }
    let Some(task) = state.queue.pop_front() else {
        return;
    };
    state.set_status(&task, UploadStatus::Uploading);
    let (reply, rx) = oneshot::channel();
    if state
        .runner
        .send_message(UploadRunnerMessage::RunTask {
            task: task.clone(),
            reply,
        })
        .is_err()
    {
        tracing::error!(audiobook = %task.audiobook_id, "upload runner unavailable");
        state.set_status(&task, UploadStatus::Error);
        return;
    }
    match rx.await {
        Ok(Ok(())) => {
            state.running = Some(task);
        }
        Ok(Err(detail)) => {
            tracing::error!(error = %detail, audiobook = %task.audiobook_id, "upload runner rejected task");
            state.set_status(&task, UploadStatus::Error);
        }
        Err(_) => {
            tracing::error!(audiobook = %task.audiobook_id, "upload runner dropped response");
            state.set_status(&task, UploadStatus::Error);
        }
    }
}

impl Actor for UploadRunnerActor {
    type Msg = UploadRunnerMessage;
    type State = UploadRunnerState;
    type Arguments = UploadRunnerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(UploadRunnerState {
            queue: args.queue,
            catalog: args.catalog,
            tonies: args.tonies,
            cloud: args.cloud,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            UploadRunnerMessage::RunTask { task, reply } => {
                let queue = state.queue.clone();
                let catalog = Arc::clone(&state.catalog);
                let tonies = Arc::clone(&state.tonies);
                let cloud = Arc::clone(&state.cloud);
                tokio::spawn(async move {
                    let outcome =
                        execute_upload(&task, catalog.as_ref(), tonies.as_ref(), cloud.as_ref())
                            .await;
                    let _ = queue.send_message(UploadQueueMessage::RunnerFinished { task, outcome });
                });
                let _ = reply.send(Ok(()));
            }
        }
        Ok(())
    }
}

/// Resolves the task against whichever snapshots are current at execution
/// time, not at enqueue time, then performs the vendor upload. A task whose
/// ids no longer resolve fails on its own without disturbing the queue.
async fn execute_upload(
    task: &UploadTask,
    catalog: &SnapshotStore<Audiobook>,
    tonies: &SnapshotStore<Tonie>,
    cloud: &dyn TonieCloudApi,
) -> UploadOutcome {
    let tonie = tonies
        .current()
        .iter()
        .find(|tonie| tonie.id == task.tonie_id)
        .cloned();
    let Some(tonie) = tonie else {
        return UploadOutcome::Failed(format!("unknown creative tonie {}", task.tonie_id));
    };
    let audiobook = catalog
        .current()
        .iter()
        .find(|book| book.id == task.audiobook_id)
        .cloned();
    let Some(audiobook) = audiobook else {
        return UploadOutcome::Failed(format!("unknown audiobook {}", task.audiobook_id));
    };

    match cloud.upload_album(&tonie, &audiobook).await {
        Ok(true) => UploadOutcome::Completed,
        Ok(false) => UploadOutcome::Failed("vendor rejected the upload".to_string()),
        Err(err) => UploadOutcome::Error(format!("{err:#}")),
    }
}

pub(crate) async fn spawn_upload_queue(
    catalog: Arc<SnapshotStore<Audiobook>>,
    tonies: Arc<SnapshotStore<Tonie>>,
    cloud: Arc<dyn TonieCloudApi>,
) -> anyhow::Result<(ActorRef<UploadQueueMessage>, ractor::concurrency::JoinHandle<()>)> {
    Actor::spawn(
        Some("upload-queue".to_string()),
        UploadQueueActor,
        UploadQueueArgs {
            runner_name: Some("upload-runner".to_string()),
            catalog,
            tonies,
            cloud,
        },
    )
    .await
    .map_err(|err| anyhow::anyhow!("failed to start upload queue: {err}"))
}

pub(crate) async fn enqueue_upload(
    queue: &ActorRef<UploadQueueMessage>,
    task: UploadTask,
) -> ApiResult<UploadTaskModel> {
    let (reply, rx) = oneshot::channel();
    queue
        .send_message(UploadQueueMessage::Enqueue { task, reply })
        .map_err(|_| ApiError::internal("Upload queue unavailable"))?;
    rx.await
        .map_err(|_| ApiError::internal("Upload queue dropped response"))
}

pub(crate) async fn get_upload_status(
    queue: &ActorRef<UploadQueueMessage>,
    audiobook_id: String,
    tonie_id: Option<String>,
) -> ApiResult<UploadStatus> {
    let (reply, rx) = oneshot::channel();
    let message = match tonie_id {
        Some(tonie_id) => UploadQueueMessage::GetStatusFor {
            tonie_id,
            audiobook_id,
            reply,
        },
        None => UploadQueueMessage::GetStatus { audiobook_id, reply },
    };
    queue
        .send_message(message)
        .map_err(|_| ApiError::internal("Upload queue unavailable"))?;
    rx.await
        .map_err(|_| ApiError::internal("Upload queue dropped response"))
}

pub(crate) async fn get_queue_status(
    queue: &ActorRef<UploadQueueMessage>,
) -> ApiResult<UploadQueueModel> {
    let (reply, rx) = oneshot::channel();
    queue
        .send_message(UploadQueueMessage::GetQueue { reply })
        .map_err(|_| ApiError::internal("Upload queue unavailable"))?;
    rx.await
        .map_err(|_| ApiError::internal("Upload queue dropped response"))
}

/// Stops dispatching, lets any in-flight upload finish, then stops the
/// queue and runner actors.
pub(crate) async fn shutdown_upload_queue(queue: &ActorRef<UploadQueueMessage>) {
    let (reply, rx) = oneshot::channel();
    if queue
        .send_message(UploadQueueMessage::Shutdown { reply })
        .is_err()
    {
        return;
    }
    let _ = rx.await;
}

pub(crate) fn current_iso_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(iso_format())
        .unwrap_or_else(|_| OffsetDateTime::now_utc().format(iso_format()).unwrap())
}

fn iso_format() -> &'static [FormatItem<'static>] {
    static ISO_FORMAT: std::sync::OnceLock<Vec<FormatItem<'static>>> = std::sync::OnceLock::new();
    ISO_FORMAT.get_or_init(|| {
        time::format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]")
            .expect("invalid time format")
    })
}
