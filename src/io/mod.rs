pub mod handler;

use crate::counts::{NodeId, NodeRef, RefreshInterval};

#[derive(Debug, Clone, PartialEq)]
pub enum IoEvent {
    /// Load the node list, then start polling the container counts.
    Initialize,
    LoadNodes,
    LoadContainers(NodeId),
    RefreshNode(NodeRef),
    SetRefreshInterval(RefreshInterval),
}
