// Analytics service - live fetch with a single fallback to the bundled fixture
use crate::application::analytics_repository::AnalyticsRepository;
use crate::domain::analytics::{
    date_bars, word_cloud, AnalyticsData, AnalyticsQuery, AnalyticsReport, AnalyticsSource,
};
use anyhow::Context;
use std::sync::Arc;

const DEFAULT_WORD_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AnalyticsService {
    primary: Arc<dyn AnalyticsRepository>,
    fallback: Arc<dyn AnalyticsRepository>,
    word_limit: usize,
}

impl AnalyticsService {
    pub fn new(primary: Arc<dyn AnalyticsRepository>, fallback: Arc<dyn AnalyticsRepository>) -> Self {
        Self {
            primary,
            fallback,
            word_limit: DEFAULT_WORD_LIMIT,
        }
    }

    pub fn with_word_limit(mut self, word_limit: usize) -> Self {
        self.word_limit = word_limit;
        self
    }

    pub async fn conversation_analytics(
        &self,
        query: &AnalyticsQuery,
    ) -> anyhow::Result<AnalyticsReport> {
        let live = match self.primary.fetch(query).await {
            Ok(response) if response.success => response.data,
            Ok(_) => {
                tracing::warn!("Analytics endpoint reported failure, using fixture");
                None
            }
            Err(e) => {
                tracing::warn!("Analytics endpoint unavailable, using fixture: {:#}", e);
                None
            }
        };

        let (source, data) = match live {
            Some(data) => (AnalyticsSource::Live, data),
            None => {
                let response = self
                    .fallback
                    .fetch(query)
                    .await
                    .context("Failed to load analytics fixture")?;
                let mut data = response.data.unwrap_or_default();
                Self::apply_query(&mut data, query);
                (AnalyticsSource::Fixture, data)
            }
        };

        Ok(AnalyticsReport {
            source,
            totals: data.totals.clone(),
            words: word_cloud(&data.word_stats, self.word_limit),
            dates: date_bars(&data.by_date),
        })
    }

    // The fixture is static, so narrow it to what the query asked for
    fn apply_query(data: &mut AnalyticsData, query: &AnalyticsQuery) {
        data.by_date
            .retain(|b| b.date >= query.start_date && b.date <= query.end_date);
        data.word_stats.retain(|stat| query.admits(stat));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analytics::{AnalyticsResponse, DateBucket, Totals, WordStat};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Ok(AnalyticsResponse),
        Unsuccessful,
        Fail,
    }

    struct StubRepository {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubRepository {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalyticsRepository for StubRepository {
        async fn fetch(&self, _query: &AnalyticsQuery) -> anyhow::Result<AnalyticsResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Ok(response) => Ok(response.clone()),
                Behaviour::Unsuccessful => Ok(AnalyticsResponse {
                    success: false,
                    data: None,
                }),
                Behaviour::Fail => anyhow::bail!("connection refused"),
            }
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn query() -> AnalyticsQuery {
        AnalyticsQuery {
            start_date: date(2),
            end_date: date(4),
            timezone: "Asia/Seoul".to_string(),
            organization_id: "org-1".to_string(),
            word_role: None,
            pos_filter: None,
        }
    }

    fn sample() -> AnalyticsResponse {
        AnalyticsResponse {
            success: true,
            data: Some(AnalyticsData {
                word_stats: vec![WordStat {
                    word: "elevator".to_string(),
                    count: 7,
                    pos: None,
                    role: None,
                }],
                totals: Totals {
                    conversations: 3,
                    messages: 10,
                    words: 40,
                },
                by_date: vec![
                    DateBucket { date: date(1), count: 1 },
                    DateBucket { date: date(3), count: 4 },
                ],
            }),
        }
    }

    #[tokio::test]
    async fn test_live_data_skips_fixture() {
        let primary = StubRepository::new(Behaviour::Ok(sample()));
        let fixture = StubRepository::new(Behaviour::Ok(sample()));
        let service = AnalyticsService::new(primary.clone(), fixture.clone());

        let report = service.conversation_analytics(&query()).await.unwrap();
        assert_eq!(report.source, AnalyticsSource::Live);
        assert_eq!(report.dates.len(), 2);
        assert_eq!(fixture.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_falls_back_exactly_once() {
        for behaviour in [Behaviour::Fail, Behaviour::Unsuccessful] {
            let primary = StubRepository::new(behaviour);
            let fixture = StubRepository::new(Behaviour::Ok(sample()));
            let service = AnalyticsService::new(primary.clone(), fixture.clone());

            let report = service.conversation_analytics(&query()).await.unwrap();
            assert_eq!(report.source, AnalyticsSource::Fixture);
            assert_eq!(primary.calls(), 1);
            assert_eq!(fixture.calls(), 1);
            // 2024-05-01 falls outside the window
            assert_eq!(report.dates.len(), 1);
            assert_eq!(report.dates[0].percent, 100);
        }
    }

    fn word(word: &str, count: u64, pos: &str, role: &str) -> WordStat {
        WordStat {
            word: word.to_string(),
            count,
            pos: Some(pos.to_string()),
            role: Some(role.to_string()),
        }
    }

    #[tokio::test]
    async fn test_fallback_honours_word_filters() {
        let mut fixture_response = sample();
        if let Some(data) = fixture_response.data.as_mut() {
            data.word_stats = vec![
                word("elevator", 9, "noun", "user"),
                word("battery", 5, "noun", "assistant"),
                word("charge", 3, "verb", "assistant"),
            ];
        }
        let primary = StubRepository::new(Behaviour::Fail);
        let fixture = StubRepository::new(Behaviour::Ok(fixture_response));
        let service = AnalyticsService::new(primary, fixture.clone());

        let mut assistant = query();
        assistant.word_role = Some("assistant".to_string());
        let report = service.conversation_analytics(&assistant).await.unwrap();
        let words: Vec<&str> = report.words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["battery", "charge"]);

        assistant.pos_filter = Some("verb".to_string());
        let report = service.conversation_analytics(&assistant).await.unwrap();
        assert_eq!(report.words.len(), 1);
        assert_eq!(report.words[0].word, "charge");
        assert_eq!(fixture.calls(), 2);
    }

    #[tokio::test]
    async fn test_fixture_failure_is_an_error() {
        let primary = StubRepository::new(Behaviour::Fail);
        let fixture = StubRepository::new(Behaviour::Fail);
        let service = AnalyticsService::new(primary, fixture.clone());

        assert!(service.conversation_analytics(&query()).await.is_err());
        assert_eq!(fixture.calls(), 1);
    }
}
