// Static analytics fixture bundled with the service
use crate::application::analytics_repository::AnalyticsRepository;
use crate::domain::analytics::{AnalyticsQuery, AnalyticsResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FixtureAnalyticsRepository {
    path: PathBuf,
}

impl FixtureAnalyticsRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AnalyticsRepository for FixtureAnalyticsRepository {
    async fn fetch(&self, _query: &AnalyticsQuery) -> Result<AnalyticsResponse> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read fixture {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fixture {}", self.path.display()))
    }
}
