//! Per-node running/stopped container counts, refreshed by polling each
//! node's container list.
//!
//! All writes go through [`CountsState::apply`], fed by a single task that
//! owns the receiving end of the action channel. Fetchers only ever send
//! [`CountsAction`]s.

mod fetch;
mod poller;

pub use fetch::{fetch_one, Aggregator, ContainerSource, NodeRef};
pub use poller::{Poller, RefreshInterval};

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    HostOffline,
    ServiceUnavailable,
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            FetchFailure::HostOffline => "Host offline",
            FetchFailure::ServiceUnavailable => "Service unavailable",
        };
        write!(f, "{}", str)
    }
}

/// Count summary for one node. Being an enum, an entry is always exactly one
/// of loading, failed or holding data.
#[derive(Debug, Clone, PartialEq)]
pub enum CountEntry {
    Loading,
    Ready {
        running: usize,
        stopped: usize,
        last_updated: DateTime<Utc>,
    },
    Failed {
        reason: FetchFailure,
        last_updated: DateTime<Utc>,
    },
}

impl CountEntry {
    pub fn failed(reason: FetchFailure) -> Self {
        CountEntry::Failed {
            reason,
            last_updated: Utc::now(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, CountEntry::Loading)
    }

    pub fn has_data(&self) -> bool {
        matches!(self, CountEntry::Ready { .. })
    }

    pub fn running(&self) -> Option<usize> {
        match self {
            CountEntry::Ready { running, .. } => Some(*running),
            _ => None,
        }
    }

    pub fn stopped(&self) -> Option<usize> {
        match self {
            CountEntry::Ready { stopped, .. } => Some(*stopped),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<FetchFailure> {
        match self {
            CountEntry::Failed { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        match self {
            CountEntry::Loading => None,
            CountEntry::Ready { last_updated, .. } | CountEntry::Failed { last_updated, .. } => {
                Some(*last_updated)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountsAction {
    UpdateNode { node_id: NodeId, entry: CountEntry },
    BatchUpdate(HashMap<NodeId, CountEntry>),
    Reset,
}

impl CountsAction {
    pub fn update(node_id: NodeId, entry: CountEntry) -> Self {
        CountsAction::UpdateNode { node_id, entry }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountsState {
    entries: HashMap<NodeId, CountEntry>,
}

impl CountsState {
    pub fn apply(&mut self, action: CountsAction) {
        match action {
            CountsAction::UpdateNode { node_id, entry } => {
                self.entries.insert(node_id, entry);
            }
            CountsAction::BatchUpdate(updates) => self.entries.extend(updates),
            CountsAction::Reset => self.entries.clear(),
        }
    }

    pub fn get(&self, node_id: NodeId) -> Option<&CountEntry> {
        self.entries.get(&node_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sending side of the counts store.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, action: CountsAction);
}

impl Dispatch for mpsc::UnboundedSender<CountsAction> {
    fn dispatch(&self, action: CountsAction) {
        if self.send(action).is_err() {
            debug!("Counts store is gone, dropping update");
        }
    }
}

impl<T: Dispatch + ?Sized> Dispatch for Arc<T> {
    fn dispatch(&self, action: CountsAction) {
        (**self).dispatch(action)
    }
}

/// Shared, read-mostly view of the counts plus the channel that updates it.
#[derive(Debug, Clone)]
pub struct CountsStore {
    state: Arc<RwLock<CountsState>>,
    tx: mpsc::UnboundedSender<CountsAction>,
}

impl CountsStore {
    /// Start the writer task. It lives until every dispatcher is dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<CountsAction>();
        let state = Arc::new(RwLock::new(CountsState::default()));
        let writer = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Some(action) = rx.recv().await {
                writer
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .apply(action);
            }
        });
        (Self { state, tx }, handle)
    }

    pub fn dispatcher(&self) -> mpsc::UnboundedSender<CountsAction> {
        self.tx.clone()
    }

    pub fn get(&self, node_id: NodeId) -> Option<CountEntry> {
        self.read().get(node_id).cloned()
    }

    pub fn snapshot(&self) -> CountsState {
        self.read().clone()
    }

    /// Forget every entry, e.g. when leaving the node list.
    pub fn reset(&self) {
        self.tx.dispatch(CountsAction::Reset);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CountsState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
