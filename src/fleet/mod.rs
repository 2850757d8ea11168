//! Records served by the fleet-management API and the client that fetches them.

mod agent;
mod client;

pub use agent::{display_version, AgentVersion, NodeAddresses};
pub use client::{ApiClient, ApiError};

use serde::Deserialize;

use crate::listing::{FieldValue, Record};

/// The node that runs the management server itself.
pub const SERVER_NODE_ID: u32 = 1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHead {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub agent_version: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub registered: bool,
    #[serde(default)]
    pub container_base_url: Option<String>,
}

impl Record for NodeHead {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Int(self.id as i64)),
            "name" => Some(FieldValue::Str(&self.name)),
            "agentVersion" => Some(FieldValue::Str(&self.agent_version)),
            "environment" => Some(FieldValue::Str(&self.environment)),
            "online" => Some(FieldValue::Bool(self.online)),
            "registered" => Some(FieldValue::Bool(self.registered)),
            "containerBaseUrl" => self.container_base_url.as_deref().map(FieldValue::Str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContainerItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub stale: String,
}

impl ContainerItem {
    pub fn container_state(&self) -> ContainerState {
        ContainerState::from(self.state.as_str())
    }
}

impl Record for ContainerItem {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Str(&self.id)),
            "name" => Some(FieldValue::Str(&self.name)),
            "image" => Some(FieldValue::Str(&self.image)),
            "status" => Some(FieldValue::Str(&self.status)),
            "state" => Some(FieldValue::Str(&self.state)),
            "stale" => Some(FieldValue::Str(&self.stale)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl From<&str> for ContainerState {
    fn from(s: &str) -> Self {
        match s {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }
}

/// `{"items": [...]}` envelope used by every list endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_head_from_api_json() {
        let raw = r#"{
            "containerBaseUrl": null,
            "name": "edge-01",
            "agentVersion": "1.4.0-arm64@192.168.1.20",
            "environment": "prod",
            "id": 4,
            "online": true,
            "registered": true
        }"#;
        let node: NodeHead = serde_json::from_str(raw).unwrap();
        assert_eq!(node.id, 4);
        assert_eq!(node.agent_version, "1.4.0-arm64@192.168.1.20");
        assert!(node.online);
        assert_eq!(node.field("environment"), Some(FieldValue::Str("prod")));
        assert_eq!(node.field("containerBaseUrl"), None);
    }

    #[test]
    fn missing_items_is_an_empty_list() {
        let body: ListResponse<ContainerItem> = serde_json::from_str("{}").unwrap();
        assert!(body.items.is_empty());
    }

    #[test]
    fn container_state_parsing() {
        let item: ContainerItem =
            serde_json::from_str(r#"{"id":"abc","name":"web","state":"exited"}"#).unwrap();
        assert_eq!(item.container_state(), ContainerState::Exited);
        assert_eq!(ContainerState::from("running"), ContainerState::Running);
        assert_eq!(ContainerState::from("weird"), ContainerState::Unknown);
    }
}
