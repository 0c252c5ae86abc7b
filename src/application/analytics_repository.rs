// Repository trait for conversation analytics
use crate::domain::analytics::{AnalyticsQuery, AnalyticsResponse};
use async_trait::async_trait;

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Fetch word statistics, totals and date buckets for the query window
    async fn fetch(&self, query: &AnalyticsQuery) -> anyhow::Result<AnalyticsResponse>;
}
