use std::sync::Arc;
use std::time::Duration;

use ractor::concurrency::Duration as RactorDuration;
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::library::store::SnapshotStore;
use crate::tonie_cloud::{Tonie, TonieCloudApi};

/// Keeps the published creative tonie list current.
///
/// Fetches once at startup and then on a fixed interval. A failed fetch
/// leaves the previous list authoritative until the next tick; readers are
/// never blocked on the vendor.
pub(crate) struct TonieListActor;

pub(crate) struct TonieListArgs {
    pub store: Arc<SnapshotStore<Tonie>>,
    pub cloud: Arc<dyn TonieCloudApi>,
    pub interval: Duration,
}

pub(crate) struct TonieListState {
    store: Arc<SnapshotStore<Tonie>>,
    cloud: Arc<dyn TonieCloudApi>,
}

pub(crate) enum TonieListMessage {
    Refresh,
}

impl Actor for TonieListActor {
    type Msg = TonieListMessage;
    type State = TonieListState;
    type Arguments = TonieListArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let state = TonieListState {
            store: args.store,
            cloud: args.cloud,
        };
        let _ = myself.send_interval(
            RactorDuration::from_secs(args.interval.as_secs()),
            || TonieListMessage::Refresh,
        );
        refresh_once(&state).await;
        Ok(state)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            TonieListMessage::Refresh => refresh_once(state).await,
        }
        Ok(())
    }
}

async fn refresh_once(state: &TonieListState) {
    match state.cloud.creative_tonies().await {
        Ok(tonies) => {
            tracing::info!(tonies = tonies.len(), "creative tonie list refreshed");
            state.store.replace(tonies);
        }
        Err(err) => {
            tracing::warn!(error = %err, "creative tonie refresh failed; keeping previous list");
        }
    }
}

pub(crate) async fn spawn_tonie_refresher(
    store: Arc<SnapshotStore<Tonie>>,
    cloud: Arc<dyn TonieCloudApi>,
    interval: Duration,
) -> anyhow::Result<(ActorRef<TonieListMessage>, ractor::concurrency::JoinHandle<()>)> {
    Actor::spawn(
        Some("tonie-list-refresher".to_string()),
        TonieListActor,
        TonieListArgs {
            store,
            cloud,
            interval,
        },
    )
    .await
    .map_err(|err| anyhow::anyhow!("failed to start tonie list refresher: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct ListingCloud {
        result: Result<Vec<Tonie>, String>,
    }

    #[async_trait]
    impl TonieCloudApi for ListingCloud {
        async fn creative_tonies(&self) -> anyhow::Result<Vec<Tonie>> {
            match &self.result {
                Ok(tonies) => Ok(tonies.clone()),
                Err(detail) => bail!("{detail}"),
            }
        }

        async fn upload_album(
            &self,
            _tonie: &Tonie,
            _audiobook: &crate::library::model::Audiobook,
        ) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    fn tonie(id: &str) -> Tonie {
        Tonie {
            id: id.to_string(),
            name: "Tonie".to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn initial_fetch_publishes_the_list() {
        let store = Arc::new(SnapshotStore::default());
        let cloud = Arc::new(ListingCloud {
            result: Ok(vec![tonie("t1"), tonie("t2")]),
        });
        let (actor, handle) = Actor::spawn(
            None,
            TonieListActor,
            TonieListArgs {
                store: Arc::clone(&store),
                cloud,
                interval: Duration::from_secs(300),
            },
        )
        .await
        .unwrap();

        assert_eq!(store.current().len(), 2);

        actor.stop(None);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failed_fetch_keeps_the_previous_list() {
        let store = Arc::new(SnapshotStore::default());
        store.replace(vec![tonie("stale")]);
        let cloud = Arc::new(ListingCloud {
            result: Err("vendor down".to_string()),
        });
        let (actor, handle) = Actor::spawn(
            None,
            TonieListActor,
            TonieListArgs {
                store: Arc::clone(&store),
                cloud,
                interval: Duration::from_secs(300),
            },
        )
        .await
        .unwrap();

        let current = store.current();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, "stale");

        actor.stop(None);
        handle.await.unwrap();
    }
}
