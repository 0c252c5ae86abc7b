// HTTP analytics repository implementation
use crate::application::analytics_repository::AnalyticsRepository;
use crate::domain::analytics::{AnalyticsQuery, AnalyticsResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpAnalyticsRepository {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpAnalyticsRepository {
    pub fn new(base_url: String, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build analytics HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn build_url(&self, query: &AnalyticsQuery) -> String {
        let mut params = vec![
            ("startDate", query.start_date.to_string()),
            ("endDate", query.end_date.to_string()),
            ("timezone", query.timezone.clone()),
            ("organizationId", query.organization_id.clone()),
        ];
        if let Some(role) = &query.word_role {
            params.push(("wordRole", role.clone()));
        }
        if let Some(pos) = &query.pos_filter {
            params.push(("posFilter", pos.clone()));
        }

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/conversation-analytics?{}", self.base_url, query_string)
    }
}

#[async_trait]
impl AnalyticsRepository for HttpAnalyticsRepository {
    async fn fetch(&self, query: &AnalyticsQuery) -> Result<AnalyticsResponse> {
        let url = self.build_url(query);
        tracing::debug!("Fetching analytics: {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to analytics endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Analytics request failed with status {}: {}", status, body);
        }

        response
            .json::<AnalyticsResponse>()
            .await
            .context("Failed to parse analytics response")
    }
}
