use std::collections::HashSet;
use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::fetch::{Aggregator, ContainerSource, NodeRef};
use super::{Dispatch, NodeId};
use crate::listing::StateStore;

const INTERVAL_STORE_KEY: &str = "refreshInterval";

/// How often the counts are refreshed. Zero turns the timer off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RefreshInterval(u64);

impl RefreshInterval {
    pub const OFF: Self = Self(0);
    pub const OPTIONS: [u64; 6] = [30, 60, 120, 180, 300, 0];

    pub fn from_secs(secs: u64) -> Option<Self> {
        Self::OPTIONS.contains(&secs).then_some(Self(secs))
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn period(self) -> Option<Duration> {
        (self.0 > 0).then(|| Duration::from_secs(self.0))
    }

    /// The next option in the selector, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::OPTIONS
            .iter()
            .position(|secs| *secs == self.0)
            .unwrap_or(0);
        Self(Self::OPTIONS[(idx + 1) % Self::OPTIONS.len()])
    }

    /// Interval saved by a previous run, or `default`.
    pub fn load(store: &dyn StateStore, default: Self) -> Self {
        store
            .get(INTERVAL_STORE_KEY)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .and_then(Self::from_secs)
            .unwrap_or(default)
    }

    pub fn save(self, store: &dyn StateStore) {
        if let Err(e) = store.set(INTERVAL_STORE_KEY, &self.0.to_string()) {
            warn!("Cannot persist refresh interval: {}", e);
        }
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self(60)
    }
}

impl TryFrom<u64> for RefreshInterval {
    type Error = String;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::from_secs(secs).ok_or_else(|| {
            format!(
                "refresh interval must be one of {:?} seconds, got {}",
                Self::OPTIONS,
                secs
            )
        })
    }
}

impl From<RefreshInterval> for u64 {
    fn from(interval: RefreshInterval) -> Self {
        interval.0
    }
}

impl Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "None"),
            secs => write!(f, "{}s", secs),
        }
    }
}

struct PollTask {
    stop: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

/// Owns the background task that runs refresh passes on a timer.
///
/// The node set is read from a watch channel at the start of every pass.
/// Nodes published in between that no pass has covered yet are refreshed as
/// soon as they show up, timer or not.
pub struct Poller<S, D> {
    aggregator: Arc<Aggregator<S, D>>,
    nodes: watch::Receiver<Vec<NodeRef>>,
    last_refresh: Arc<watch::Sender<Option<DateTime<Utc>>>>,
    interval: RefreshInterval,
    task: Option<PollTask>,
}

impl<S, D> Poller<S, D>
where
    S: ContainerSource + 'static,
    D: Dispatch + 'static,
{
    pub fn new(aggregator: Arc<Aggregator<S, D>>, nodes: watch::Receiver<Vec<NodeRef>>) -> Self {
        let (last_refresh, _) = watch::channel(None);
        Self {
            aggregator,
            nodes,
            last_refresh: Arc::new(last_refresh),
            interval: RefreshInterval::OFF,
            task: None,
        }
    }

    pub fn interval(&self) -> RefreshInterval {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Start time of the latest pass.
    pub fn last_refresh(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_refresh.subscribe()
    }

    /// Run a pass right away, then one every `interval`. Any previous task is
    /// stopped first.
    pub fn start(&mut self, interval: RefreshInterval) {
        self.stop();
        self.interval = interval;
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.aggregator),
            self.nodes.clone(),
            Arc::clone(&self.last_refresh),
            interval,
            stop_rx,
        ));
        self.task = Some(PollTask {
            stop: stop_tx,
            _handle: handle,
        });
    }

    pub fn set_interval(&mut self, interval: RefreshInterval) {
        info!("Refresh interval set to {}", interval);
        self.start(interval);
    }

    /// No new fetch starts after this. One already in flight is left to
    /// finish and report.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.stop.send(true);
        }
    }
}

impl<S, D> Drop for Poller<S, D> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.stop.send(true);
        }
    }
}

async fn poll_loop<S, D>(
    aggregator: Arc<Aggregator<S, D>>,
    mut nodes: watch::Receiver<Vec<NodeRef>>,
    last_refresh: Arc<watch::Sender<Option<DateTime<Utc>>>>,
    interval: RefreshInterval,
    mut stop: watch::Receiver<bool>,
) where
    S: ContainerSource,
    D: Dispatch,
{
    let mut ticker = interval.period().map(|period| {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    // Nodes that already went through a pass
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut nodes_open = true;

    loop {
        let pass: Vec<NodeRef> = nodes.borrow_and_update().clone();
        debug!("Refreshing container counts for {} nodes", pass.len());
        last_refresh.send_replace(Some(Utc::now()));
        if !refresh_nodes(&aggregator, pass, &mut seen, &stop).await {
            return;
        }

        loop {
            let next_tick = async {
                match ticker.as_mut() {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = next_tick => break,
                _ = stop.changed() => return,
                changed = nodes.changed(), if nodes_open => {
                    if changed.is_err() {
                        nodes_open = false;
                        continue;
                    }
                    let fresh: Vec<NodeRef> = nodes
                        .borrow_and_update()
                        .iter()
                        .filter(|node| !seen.contains(&node.id))
                        .copied()
                        .collect();
                    if !fresh.is_empty() {
                        debug!("Refreshing container counts for {} new nodes", fresh.len());
                    }
                    if !refresh_nodes(&aggregator, fresh, &mut seen, &stop).await {
                        return;
                    }
                }
            }
        }
    }
}

/// Sequential `refresh_one` over `pass`. False once the stop signal is seen.
async fn refresh_nodes<S, D>(
    aggregator: &Aggregator<S, D>,
    pass: Vec<NodeRef>,
    seen: &mut HashSet<NodeId>,
    stop: &watch::Receiver<bool>,
) -> bool
where
    S: ContainerSource,
    D: Dispatch,
{
    for node in pass {
        if *stop.borrow() {
            debug!("Poller stopped mid-pass");
            return false;
        }
        seen.insert(node.id);
        aggregator.refresh_one(node).await;
    }
    true
}
