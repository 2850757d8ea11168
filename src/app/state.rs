use super::actions::{Action, Actions};
use crate::counts::NodeId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppState {
    Nodes,
    Containers { node_id: NodeId, node_name: String },
}

impl Default for AppState {
    fn default() -> Self {
        Self::Nodes
    }
}

impl AppState {
    pub fn get_actions(&self) -> Actions {
        let mut actions = vec![
            Action::Quit,
            Action::Back,
            Action::Next,
            Action::Previous,
            Action::NextPage,
            Action::PrevPage,
            Action::FirstPage,
            Action::LastPage,
            Action::Search,
            Action::SortFirst,
            Action::SortSecond,
            Action::SortThird,
            Action::CyclePageSize,
            Action::Reload,
        ];
        if self.is_nodes() {
            actions.extend([Action::Open, Action::RefreshNode, Action::CycleInterval]);
        }
        actions.into()
    }

    pub fn is_nodes(&self) -> bool {
        matches!(self, &Self::Nodes)
    }

    pub fn is_containers(&self) -> bool {
        matches!(self, &Self::Containers { .. })
    }
}
