use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{ContainerItem, ListResponse, NodeHead};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

/// Thin client over the management API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeHead>, ApiError> {
        self.get_items("/nodes").await
    }

    pub async fn list_node_containers(&self, node_id: u32) -> Result<Vec<ContainerItem>, ApiError> {
        self.get_items(&format!("/nodes/{}/containers", node_id)).await
    }

    async fn get_items<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ApiError::Status { url, status });
        }
        let body: ListResponse<T> = response.json().await?;
        Ok(body.items)
    }
}
