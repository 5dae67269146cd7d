use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::{CategorySeries, EligibleReview, LabelCounts, ReviewRecord, WeeklyBucket};
use crate::sentiment::rating_to_sentiment;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAggregation {
    pub series: Vec<CategorySeries>,
    pub eligible: usize,
    pub dropped: usize,
}

/// Parses the date shapes review feeds hand us. Returns `None` for anything
/// that is not a real calendar date.
pub fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // "Reviewed in the United States on January 5, 2025"
    let value = match value.rfind(" on ") {
        Some(idx) => value[idx + 4..].trim(),
        None => value,
    };

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Some(timestamp.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Monday of the ISO week containing `date`, or `None` when that Monday
/// falls before the earliest representable date.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(date.weekday().num_days_from_monday() as u64))
}

impl ReviewRecord {
    pub fn eligible(&self) -> Option<EligibleReview> {
        let category = self.category.as_deref()?;
        if category.trim().is_empty() {
            return None;
        }
        let rating = self.rating.filter(|value| !value.is_nan())?;
        let review_date = self.review_date.as_deref().and_then(parse_review_date)?;
        let week_start = week_start(review_date)?;

        Some(EligibleReview {
            category: category.to_string(),
            rating,
            review_date,
            week_start,
        })
    }
}

/// Buckets eligible reviews by category and ISO week and averages their
/// sentiment scores. Weeks without reviews produce no bucket.
pub fn aggregate_weekly(records: &[ReviewRecord]) -> WeeklyAggregation {
    let mut buckets: BTreeMap<String, BTreeMap<NaiveDate, (i64, usize, LabelCounts)>> =
        BTreeMap::new();
    let mut eligible = 0usize;

    for review in records.iter().filter_map(ReviewRecord::eligible) {
        eligible += 1;
        let sentiment = rating_to_sentiment(review.rating);
        let entry = buckets
            .entry(review.category)
            .or_default()
            .entry(review.week_start)
            .or_insert((0, 0, LabelCounts::default()));
        entry.0 += sentiment.score as i64;
        entry.1 += 1;
        entry.2.record(sentiment.label);
    }

    let dropped = records.len() - eligible;
    debug!(eligible, dropped, "filtered review records");

    let series = buckets
        .into_iter()
        .map(|(category, weeks)| CategorySeries {
            category,
            weeks: weeks
                .into_iter()
                .map(|(week_start, (total, count, labels))| WeeklyBucket {
                    week_start,
                    review_count: count,
                    labels,
                    weekly_sentiment: total as f64 / count as f64,
                })
                .collect(),
        })
        .collect();

    WeeklyAggregation {
        series,
        eligible,
        dropped,
    }
}
