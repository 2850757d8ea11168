pub mod actions;
pub mod state;
pub mod ui;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error};
use tokio::sync::{mpsc, watch};

use crate::counts::{CountEntry, CountsStore, NodeId, NodeRef, RefreshInterval};
use crate::fleet::{ContainerItem, NodeHead};
use crate::inputs::key::Key;
use crate::io::IoEvent;
use crate::listing::{ListView, Paginator, StateStore};
use actions::{Action, Actions};
use state::AppState;

pub const NODE_FILTER_FIELDS: &[&str] = &["name", "environment", "agentVersion"];
pub const NODE_SORT_FIELDS: [&str; 3] = ["name", "environment", "agentVersion"];
pub const CONTAINER_FILTER_FIELDS: &[&str] = &["name", "image", "state", "status"];
pub const CONTAINER_SORT_FIELDS: [&str; 3] = ["name", "image", "state"];

#[derive(Debug, PartialEq, Eq)]
pub enum AppReturn {
    Exit,
    Continue,
}

/// What the app is wired to: the IO worker, the counts store and the poller's
/// inputs and outputs.
pub struct AppContext {
    pub io_tx: mpsc::Sender<IoEvent>,
    pub counts: CountsStore,
    pub node_refs: watch::Sender<Vec<NodeRef>>,
    pub last_refresh: watch::Receiver<Option<DateTime<Utc>>>,
    pub store: Arc<dyn StateStore>,
    pub page_size: usize,
    pub refresh_interval: RefreshInterval,
}

pub struct App {
    /// We could dispatch an IO event
    io_tx: mpsc::Sender<IoEvent>,
    /// Contextual actions
    actions: Actions,
    state: AppState,
    nodes: Vec<NodeHead>,
    nodes_loaded: bool,
    nodes_view: ListView,
    containers: Vec<ContainerItem>,
    containers_loaded: bool,
    containers_view: ListView,
    // Row index inside the current page
    selected: usize,
    searching: bool,
    counts: CountsStore,
    node_refs: watch::Sender<Vec<NodeRef>>,
    last_refresh: watch::Receiver<Option<DateTime<Utc>>>,
    refresh_interval: RefreshInterval,
    store: Arc<dyn StateStore>,
    status: Option<String>,
}

impl App {
    pub fn new(ctx: AppContext) -> Self {
        let state = AppState::default();
        let actions = state.get_actions();
        let nodes_view = ListView::new(
            "nodes",
            ctx.page_size,
            NODE_FILTER_FIELDS,
            Some("name"),
            Arc::clone(&ctx.store),
        );
        let containers_view = ListView::new(
            "containers",
            ctx.page_size,
            CONTAINER_FILTER_FIELDS,
            Some("name"),
            Arc::clone(&ctx.store),
        );

        Self {
            io_tx: ctx.io_tx,
            actions,
            state,
            nodes: Vec::new(),
            nodes_loaded: false,
            nodes_view,
            containers: Vec::new(),
            containers_loaded: false,
            containers_view,
            selected: 0,
            searching: false,
            counts: ctx.counts,
            node_refs: ctx.node_refs,
            last_refresh: ctx.last_refresh,
            refresh_interval: ctx.refresh_interval,
            store: ctx.store,
            status: None,
        }
    }

    /// Handle a user action
    pub async fn do_action(&mut self, key: Key) -> AppReturn {
        if self.searching {
            // Ctrl-c still quits, 'q' is just a letter here
            if key == Key::Ctrl('c') {
                return AppReturn::Exit;
            }
            self.do_search_input(key);
            return AppReturn::Continue;
        }
        let action = match self.actions.find(key) {
            Some(action) => *action,
            None => return AppReturn::Continue,
        };
        match action {
            Action::Quit => return AppReturn::Exit,
            Action::Back => self.back(),
            Action::Open => self.open_selected().await,
            Action::Next => self.next(),
            Action::Previous => self.previous(),
            Action::NextPage => self.with_pager(Paginator::next_page),
            Action::PrevPage => self.with_pager(Paginator::prev_page),
            Action::FirstPage => self.with_pager(Paginator::goto_first_page),
            Action::LastPage => self.with_pager(Paginator::goto_last_page),
            Action::CyclePageSize => self.with_pager(Paginator::cycle_page_size),
            Action::Search => self.searching = true,
            Action::SortFirst => self.request_sort(0),
            Action::SortSecond => self.request_sort(1),
            Action::SortThird => self.request_sort(2),
            Action::RefreshNode => self.refresh_selected().await,
            Action::CycleInterval => self.cycle_interval().await,
            Action::Reload => self.reload().await,
        }
        AppReturn::Continue
    }

    fn do_search_input(&mut self, key: Key) {
        match key {
            Key::Enter => self.searching = false,
            Key::Esc => {
                self.searching = false;
                self.view_mut().filter.clear_search();
            }
            Key::Backspace => self.view_mut().filter.pop_search_char(),
            Key::Char(c) => self.view_mut().filter.push_search_char(c),
            _ => return,
        }
        self.selected = 0;
        self.sync_view();
    }

    /// Nothing to poll from the UI side; counts arrive through the store.
    pub async fn update_on_tick(&mut self) -> AppReturn {
        AppReturn::Continue
    }

    /// Send a network event to the IO thread
    pub async fn dispatch(&mut self, action: IoEvent) {
        if let Err(e) = self.io_tx.send(action).await {
            error!("Error from dispatch {}", e);
        };
    }

    fn view_mut(&mut self) -> &mut ListView {
        match self.state {
            AppState::Nodes => &mut self.nodes_view,
            AppState::Containers { .. } => &mut self.containers_view,
        }
    }

    fn sync_view(&mut self) {
        match self.state {
            AppState::Nodes if self.nodes_loaded => self.nodes_view.sync(&self.nodes),
            AppState::Containers { .. } if self.containers_loaded => {
                self.containers_view.sync(&self.containers)
            }
            _ => {}
        }
        let visible = self.visible_len();
        if self.selected >= visible {
            self.selected = visible.saturating_sub(1);
        }
    }

    fn with_pager(&mut self, f: impl FnOnce(&mut Paginator)) {
        f(&mut self.view_mut().pager);
        self.selected = 0;
    }

    fn request_sort(&mut self, column: usize) {
        let key = if self.state.is_nodes() {
            NODE_SORT_FIELDS[column]
        } else {
            CONTAINER_SORT_FIELDS[column]
        };
        self.view_mut().filter.request_sort(key);
    }

    fn back(&mut self) {
        if self.state.is_containers() {
            self.state = AppState::Nodes;
            self.actions = self.state.get_actions();
            self.containers.clear();
            self.containers_loaded = false;
            self.selected = 0;
        } else {
            self.nodes_view.filter.clear_search();
        }
        self.sync_view();
    }

    async fn open_selected(&mut self) {
        let node = match self.selected_node() {
            Some(node) => node.clone(),
            None => return,
        };
        debug!("Opening node {} ({})", node.name, node.id);
        self.state = AppState::Containers {
            node_id: node.id,
            node_name: node.name,
        };
        self.actions = self.state.get_actions();
        self.containers.clear();
        self.containers_loaded = false;
        self.selected = 0;
        self.dispatch(IoEvent::LoadContainers(node.id)).await;
    }

    async fn refresh_selected(&mut self) {
        if let Some(node) = self.selected_node().map(NodeRef::from) {
            self.dispatch(IoEvent::RefreshNode(node)).await;
        }
    }

    async fn cycle_interval(&mut self) {
        self.refresh_interval = self.refresh_interval.next();
        self.refresh_interval.save(self.store.as_ref());
        self.dispatch(IoEvent::SetRefreshInterval(self.refresh_interval))
            .await;
    }

    async fn reload(&mut self) {
        let event = match &self.state {
            AppState::Nodes => IoEvent::LoadNodes,
            AppState::Containers { node_id, .. } => IoEvent::LoadContainers(*node_id),
        };
        self.dispatch(event).await;
    }

    pub fn next(&mut self) {
        if self.selected + 1 < self.visible_len() {
            self.selected += 1;
        }
    }

    pub fn previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// New node list from the API. The poller picks it up on its next pass.
    pub fn set_nodes(&mut self, nodes: Vec<NodeHead>) {
        self.node_refs
            .send_replace(nodes.iter().map(NodeRef::from).collect());
        self.nodes = nodes;
        self.nodes_loaded = true;
        self.nodes_view.sync(&self.nodes);
        self.status = None;
        self.sync_view();
    }

    /// Container list for `node_id`; dropped if the user already left that node.
    pub fn set_containers(&mut self, node_id: NodeId, containers: Vec<ContainerItem>) {
        match &self.state {
            AppState::Containers { node_id: current, .. } if *current == node_id => {
                self.containers = containers;
                self.containers_loaded = true;
                self.status = None;
                self.sync_view();
            }
            _ => debug!("Dropping containers of node {}, view has moved on", node_id),
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }
    pub fn state(&self) -> &AppState {
        &self.state
    }
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
    pub fn searching(&self) -> bool {
        self.searching
    }
    pub fn refresh_interval(&self) -> RefreshInterval {
        self.refresh_interval
    }
    pub fn view(&self) -> &ListView {
        match self.state {
            AppState::Nodes => &self.nodes_view,
            AppState::Containers { .. } => &self.containers_view,
        }
    }
    pub fn is_loaded(&self) -> bool {
        match self.state {
            AppState::Nodes => self.nodes_loaded,
            AppState::Containers { .. } => self.containers_loaded,
        }
    }
    pub fn visible_nodes(&self) -> Vec<&NodeHead> {
        self.nodes_view.visible(&self.nodes)
    }
    pub fn visible_containers(&self) -> Vec<&ContainerItem> {
        self.containers_view.visible(&self.containers)
    }
    pub fn selected_index(&self) -> Option<usize> {
        (self.visible_len() > 0).then_some(self.selected)
    }
    pub fn selected_node(&self) -> Option<&NodeHead> {
        self.visible_nodes().get(self.selected).copied()
    }
    pub fn node_count(&self, node_id: NodeId) -> Option<CountEntry> {
        self.counts.get(node_id)
    }

    fn visible_len(&self) -> usize {
        match self.state {
            AppState::Nodes => self.visible_nodes().len(),
            AppState::Containers { .. } => self.visible_containers().len(),
        }
    }

    /// `Refresh: 60s | Last refresh: 12s ago (next in 48s)`
    pub fn refresh_status(&self, now: DateTime<Utc>) -> String {
        let interval = self.refresh_interval;
        let last = *self.last_refresh.borrow();
        match (interval.as_secs(), last) {
            (0, _) | (_, None) => format!("Refresh: {}", interval),
            (secs, Some(last)) => {
                let ago = (now - last).num_seconds().max(0) as u64;
                if ago < secs {
                    format!(
                        "Refresh: {} | Last refresh: {}s ago (next in {}s)",
                        interval,
                        ago,
                        secs - ago
                    )
                } else {
                    format!("Refresh: {} | Last refresh: {}s ago", interval, ago)
                }
            }
        }
    }
}
