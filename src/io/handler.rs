use eyre::Result;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::IoEvent;

use crate::app::App;
use crate::counts::{Aggregator, CountsAction, NodeId, NodeRef, Poller};
use crate::fleet::ApiClient;

pub type CountsAggregator = Aggregator<ApiClient, mpsc::UnboundedSender<CountsAction>>;
pub type CountsPoller = Poller<ApiClient, mpsc::UnboundedSender<CountsAction>>;

/// Runs the network side of the app. Lives on its own task and owns the
/// poller, so the poll timer stops when the handler goes away.
pub struct IoAsyncHandler {
    app: Arc<Mutex<App>>,
    client: ApiClient,
    aggregator: Arc<CountsAggregator>,
    poller: CountsPoller,
}

impl IoAsyncHandler {
    pub fn new(
        app: Arc<Mutex<App>>,
        client: ApiClient,
        aggregator: Arc<CountsAggregator>,
        poller: CountsPoller,
    ) -> Self {
        Self {
            app,
            client,
            aggregator,
            poller,
        }
    }

    pub async fn handle_io_event(&mut self, io_event: IoEvent) {
        let result = match io_event {
            IoEvent::Initialize => self.initialize().await,
            IoEvent::LoadNodes => self.load_nodes().await,
            IoEvent::LoadContainers(node_id) => self.load_containers(node_id).await,
            IoEvent::RefreshNode(node) => self.refresh_node(node),
            IoEvent::SetRefreshInterval(interval) => {
                self.poller.set_interval(interval);
                Ok(())
            }
        };

        if let Err(err) = result {
            error!("Oops, something wrong happen: {:?}", err);
            self.app.lock().await.set_status(err.to_string());
        }
    }

    /// First node load, then the poller. The poller starts even when the load
    /// failed so a later reload still gets counts.
    async fn initialize(&mut self) -> Result<()> {
        info!("Using management API at {}", self.client.base_url());
        let loaded = self.load_nodes().await;
        let interval = self.app.lock().await.refresh_interval();
        self.poller.start(interval);
        loaded
    }

    async fn load_nodes(&mut self) -> Result<()> {
        let nodes = self.client.list_nodes().await?;
        info!("Loaded {} nodes", nodes.len());
        self.app.lock().await.set_nodes(nodes);
        Ok(())
    }

    async fn load_containers(&mut self, node_id: NodeId) -> Result<()> {
        let containers = self.client.list_node_containers(node_id).await?;
        info!("Loaded {} containers of node {}", containers.len(), node_id);
        self.app.lock().await.set_containers(node_id, containers);
        Ok(())
    }

    /// Out of band so a slow agent does not hold up the event queue.
    fn refresh_node(&mut self, node: NodeRef) -> Result<()> {
        info!("Refreshing container counts of node {}", node.id);
        let aggregator = Arc::clone(&self.aggregator);
        tokio::spawn(async move {
            aggregator.refresh_one(node).await;
        });
        Ok(())
    }
}
