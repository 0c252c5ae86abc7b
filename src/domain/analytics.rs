// Conversation analytics domain models
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone: String,
    pub organization_id: String,
    #[serde(default)]
    pub word_role: Option<String>,
    #[serde(default)]
    pub pos_filter: Option<String>,
}

impl AnalyticsQuery {
    /// A word passes when it carries every role/POS the query names.
    pub fn admits(&self, stat: &WordStat) -> bool {
        fn allowed(filter: &Option<String>, value: &Option<String>) -> bool {
            match (filter, value) {
                (None, _) => true,
                (Some(want), Some(got)) => want.eq_ignore_ascii_case(got),
                (Some(_), None) => false,
            }
        }
        allowed(&self.word_role, &stat.role) && allowed(&self.pos_filter, &stat.pos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordStat {
    pub word: String,
    pub count: u64,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(default)]
    pub conversations: u64,
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub words: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateBucket {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    #[serde(default)]
    pub word_stats: Vec<WordStat>,
    #[serde(default)]
    pub totals: Totals,
    #[serde(default)]
    pub by_date: Vec<DateBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<AnalyticsData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsSource {
    Live,
    Fixture,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedWord {
    pub word: String,
    pub count: u64,
    /// count / max count, in `0.0..=1.0`
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateBar {
    pub date: NaiveDate,
    pub count: u64,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub source: AnalyticsSource,
    pub totals: Totals,
    pub words: Vec<WeightedWord>,
    pub dates: Vec<DateBar>,
}

/// Top `limit` words by count (ties broken alphabetically).
pub fn word_cloud(stats: &[WordStat], limit: usize) -> Vec<WeightedWord> {
    let mut sorted: Vec<&WordStat> = stats.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    sorted.truncate(limit);

    let max = sorted.first().map(|w| w.count).unwrap_or(0);
    sorted
        .into_iter()
        .map(|w| WeightedWord {
            word: w.word.clone(),
            count: w.count,
            weight: if max == 0 { 0.0 } else { w.count as f64 / max as f64 },
        })
        .collect()
}

/// Bars sorted by date, each scaled against the busiest day.
pub fn date_bars(buckets: &[DateBucket]) -> Vec<DateBar> {
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    let mut bars: Vec<DateBar> = buckets
        .iter()
        .map(|b| DateBar {
            date: b.date,
            count: b.count,
            percent: if max == 0 {
                0
            } else {
                (100.0 * b.count as f64 / max as f64).round() as u32
            },
        })
        .collect();
    bars.sort_by_key(|b| b.date);
    bars
}
