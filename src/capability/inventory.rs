//! Sources of platform descriptors: the vendor's REST inventory or a
//! static JSON list.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::GridSettings;
use crate::error::{HarnessError, HarnessResult};

use super::types::PlatformDescriptor;

/// Anything that can list the platforms to test on
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    async fn platforms(&self) -> HarnessResult<Vec<PlatformDescriptor>>;

    /// Short label for logs
    fn describe(&self) -> String;
}

/// Fetches the flat browser list from the grid vendor
#[derive(Debug, Clone)]
pub struct RemoteInventory {
    url: String,
    username: String,
    access_key: String,
    http: reqwest::Client,
}

impl RemoteInventory {
    pub fn new(url: impl Into<String>, username: impl Into<String>, access_key: impl Into<String>) -> HarnessResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.into(),
            username: username.into(),
            access_key: access_key.into(),
            http,
        })
    }

    pub fn from_settings(grid: &GridSettings) -> HarnessResult<Self> {
        Self::new(&grid.inventory_url, &grid.username, &grid.access_key)
    }
}

#[async_trait]
impl CapabilitySource for RemoteInventory {
    async fn platforms(&self) -> HarnessResult<Vec<PlatformDescriptor>> {
        tracing::debug!(url = %self.url, "fetching capability inventory");
        let resp = self
            .http
            .get(&self.url)
            .basic_auth(&self.username, Some(&self.access_key))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HarnessError::Inventory(format!(
                "{} returned {}",
                self.url, status
            )));
        }
        let platforms = resp.json::<Vec<PlatformDescriptor>>().await?;
        tracing::info!(count = platforms.len(), "capability inventory loaded");
        Ok(platforms)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads descriptors from a JSON file, for offline or pinned runs
#[derive(Debug, Clone)]
pub struct StaticInventory {
    path: PathBuf,
}

impl StaticInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CapabilitySource for StaticInventory {
    async fn platforms(&self) -> HarnessResult<Vec<PlatformDescriptor>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            HarnessError::Inventory(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
