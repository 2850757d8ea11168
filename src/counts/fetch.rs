use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use log::{debug, error};

use super::{CountEntry, CountsAction, Dispatch, FetchFailure, NodeId};
use crate::fleet::{ApiClient, ApiError, ContainerItem, ContainerState, NodeHead};

/// Where container lists come from.
pub trait ContainerSource: Send + Sync {
    fn list_containers(&self, node_id: NodeId) -> BoxFuture<'_, Result<Vec<ContainerItem>, ApiError>>;
}

impl ContainerSource for ApiClient {
    fn list_containers(&self, node_id: NodeId) -> BoxFuture<'_, Result<Vec<ContainerItem>, ApiError>> {
        Box::pin(self.list_node_containers(node_id))
    }
}

impl<T: ContainerSource + ?Sized> ContainerSource for Arc<T> {
    fn list_containers(&self, node_id: NodeId) -> BoxFuture<'_, Result<Vec<ContainerItem>, ApiError>> {
        (**self).list_containers(node_id)
    }
}

/// What the poller needs to know about a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub online: bool,
}

impl From<&NodeHead> for NodeRef {
    fn from(node: &NodeHead) -> Self {
        Self {
            id: node.id,
            online: node.online,
        }
    }
}

/// Fetch one node's containers and fold them into a count entry. Never fails:
/// errors become [`CountEntry::Failed`].
pub async fn fetch_one<S>(source: &S, node_id: NodeId, online: bool) -> CountEntry
where
    S: ContainerSource + ?Sized,
{
    if !online {
        debug!("Node {} is offline, skipping container fetch", node_id);
        return CountEntry::failed(FetchFailure::HostOffline);
    }

    match source.list_containers(node_id).await {
        Ok(containers) => {
            let count = |state: ContainerState| {
                containers
                    .iter()
                    .filter(|c| c.container_state() == state)
                    .count()
            };
            CountEntry::Ready {
                running: count(ContainerState::Running),
                stopped: count(ContainerState::Exited),
                last_updated: Utc::now(),
            }
        }
        Err(e) => {
            error!("Failed to fetch containers for node {}: {}", node_id, e);
            CountEntry::failed(FetchFailure::ServiceUnavailable)
        }
    }
}

/// Runs fetches and reports every transition through the dispatcher.
pub struct Aggregator<S, D> {
    source: S,
    dispatcher: D,
}

impl<S, D> Aggregator<S, D>
where
    S: ContainerSource,
    D: Dispatch,
{
    pub fn new(source: S, dispatcher: D) -> Self {
        Self { source, dispatcher }
    }

    /// `Loading`, then whatever the fetch ends in.
    pub async fn refresh_one(&self, node: NodeRef) {
        self.dispatcher
            .dispatch(CountsAction::update(node.id, CountEntry::Loading));
        let entry = fetch_one(&self.source, node.id, node.online).await;
        self.dispatcher.dispatch(CountsAction::update(node.id, entry));
    }

    /// One node at a time, in list order. The next fetch only starts once the
    /// previous one has settled, which keeps the load on the agents flat.
    pub async fn refresh_all(&self, nodes: &[NodeRef]) {
        for node in nodes {
            self.refresh_one(*node).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Canned container lists; a node without one answers with a 503.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub lists: HashMap<NodeId, Vec<ContainerItem>>,
        pub calls: Mutex<Vec<NodeId>>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        pub fn with(lists: Vec<(NodeId, Vec<&str>)>) -> Self {
            let lists = lists
                .into_iter()
                .map(|(id, states)| {
                    let items = states
                        .into_iter()
                        .enumerate()
                        .map(|(i, state)| ContainerItem {
                            id: format!("{}-{}", id, i),
                            name: format!("c{}", i),
                            image: "nginx:latest".to_string(),
                            status: String::new(),
                            state: state.to_string(),
                            stale: "no".to_string(),
                        })
                        .collect();
                    (id, items)
                })
                .collect();
            Self {
                lists,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<NodeId> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ContainerSource for FakeSource {
        fn list_containers(
            &self,
            node_id: NodeId,
        ) -> BoxFuture<'_, Result<Vec<ContainerItem>, ApiError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(node_id);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.lists.get(&node_id).cloned().ok_or(ApiError::Status {
                    url: format!("/nodes/{}/containers", node_id),
                    status: 503,
                })
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct Recorder(pub Mutex<Vec<CountsAction>>);

    impl Recorder {
        pub fn actions(&self) -> Vec<CountsAction> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Dispatch for Recorder {
        fn dispatch(&self, action: CountsAction) {
            self.0.lock().unwrap().push(action);
        }
    }

    fn node(id: NodeId, online: bool) -> NodeRef {
        NodeRef { id, online }
    }

    #[tokio::test]
    async fn offline_node_is_never_fetched() {
        let source = FakeSource::with(vec![(1, vec!["running"])]);
        let entry = fetch_one(&source, 1, false).await;
        assert!(!entry.is_loading());
        assert!(!entry.has_data());
        assert_eq!(entry.error(), Some(FetchFailure::HostOffline));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn counts_running_and_exited() {
        let source = FakeSource::with(vec![(
            3,
            vec!["running", "exited", "running", "paused", "exited", "created", "running"],
        )]);
        let entry = fetch_one(&source, 3, true).await;
        assert_eq!(entry.running(), Some(3));
        assert_eq!(entry.stopped(), Some(2));
        assert_eq!(source.calls(), vec![3]);
    }

    #[tokio::test]
    async fn failing_source_becomes_service_unavailable() {
        let source = FakeSource::default();
        let entry = fetch_one(&source, 9, true).await;
        assert_eq!(entry.error(), Some(FetchFailure::ServiceUnavailable));
        assert!(!entry.has_data());
    }

    #[tokio::test]
    async fn refresh_all_is_sequential_and_paired() {
        let source = Arc::new(FakeSource::with(vec![
            (1, vec!["running"]),
            (3, vec!["exited", "exited"]),
        ]));
        let recorder = Arc::new(Recorder::default());
        let aggregator = Aggregator::new(Arc::clone(&source), Arc::clone(&recorder));

        aggregator
            .refresh_all(&[node(1, true), node(2, true), node(3, true), node(4, false)])
            .await;

        let actions = recorder.actions();
        assert_eq!(actions.len(), 8);
        let ids: Vec<NodeId> = actions
            .iter()
            .map(|a| match a {
                CountsAction::UpdateNode { node_id, .. } => *node_id,
                other => panic!("unexpected action {:?}", other),
            })
            .collect();
        assert_eq!(ids, vec![1, 1, 2, 2, 3, 3, 4, 4]);

        for pair in actions.chunks(2) {
            match (&pair[0], &pair[1]) {
                (
                    CountsAction::UpdateNode { entry: first, .. },
                    CountsAction::UpdateNode { entry: second, .. },
                ) => {
                    assert!(first.is_loading());
                    assert!(!second.is_loading());
                }
                other => panic!("unexpected pair {:?}", other),
            }
        }

        // node 2 has no canned list, node 4 is offline and never asked
        assert_eq!(source.calls(), vec![1, 2, 3]);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        match &actions[3] {
            CountsAction::UpdateNode { entry, .. } => {
                assert_eq!(entry.error(), Some(FetchFailure::ServiceUnavailable))
            }
            other => panic!("unexpected action {:?}", other),
        }
        match &actions[7] {
            CountsAction::UpdateNode { entry, .. } => {
                assert_eq!(entry.error(), Some(FetchFailure::HostOffline))
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[tokio::test]
    async fn refresh_one_dispatches_loading_then_result() {
        let source = FakeSource::with(vec![(5, vec!["running", "running"])]);
        let recorder = Arc::new(Recorder::default());
        let aggregator = Aggregator::new(source, Arc::clone(&recorder));

        aggregator.refresh_one(node(5, true)).await;

        let actions = recorder.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], CountsAction::update(5, CountEntry::Loading));
        match &actions[1] {
            CountsAction::UpdateNode { node_id: 5, entry } => assert_eq!(entry.running(), Some(2)),
            other => panic!("unexpected action {:?}", other),
        }
    }
}
