use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// One review as delivered by the acquisition layer, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewRecord {
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub review_date: Option<String>,
    /// Columns the engine does not read (asin, review_text, reviewer, ...).
    pub passthrough: BTreeMap<String, String>,
}

/// A review that passed the eligibility filter.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleReview {
    pub category: String,
    pub rating: f64,
    pub review_date: NaiveDate,
    pub week_start: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: i8,
}

/// How many reviews in a bucket landed on each label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl LabelCounts {
    pub fn record(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Negative => self.negative += 1,
        }
    }
}

impl fmt::Display for LabelCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.positive, self.neutral, self.negative)
    }
}

/// Mean sentiment of one category over one week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyBucket {
    pub week_start: NaiveDate,
    pub review_count: usize,
    pub labels: LabelCounts,
    pub weekly_sentiment: f64,
}

/// A category's weekly buckets, ascending by `week_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySeries {
    pub category: String,
    pub weeks: Vec<WeeklyBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySentiment {
    pub category: String,
    pub week_start: NaiveDate,
    pub review_count: usize,
    pub labels: LabelCounts,
    pub weekly_sentiment: f64,
    pub rolling_avg: f64,
    pub prev_rolling_avg: Option<f64>,
    pub delta: Option<f64>,
    pub prev_delta: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    NegativeSpike,
    PositiveSpike,
    TrendShift,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::NegativeSpike => "NEGATIVE_SPIKE",
            AlertType::PositiveSpike => "POSITIVE_SPIKE",
            AlertType::TrendShift => "TREND_SHIFT",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertType::NegativeSpike => "NEGATIVE SPIKE",
            AlertType::PositiveSpike => "POSITIVE SPIKE",
            AlertType::TrendShift => "TREND SHIFT",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub date: NaiveDate,
    pub category: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub change: f64,
}
