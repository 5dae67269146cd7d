use tracing::info;

use crate::alerts::{classify_all, filter_recent};
use crate::config::DetectorConfig;
use crate::error::EngineError;
use crate::models::{Alert, ReviewRecord, WeeklySentiment};
use crate::rolling::roll_series;
use crate::weekly::aggregate_weekly;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub weekly: Vec<WeeklySentiment>,
    pub alerts: Vec<Alert>,
    pub eligible_reviews: usize,
    pub dropped_reviews: usize,
}

/// Runs the whole detection pipeline over a batch of reviews.
///
/// Every category is rolled and classified on its own; the per-category
/// results are merged before the recency filter is applied once over all of
/// them.
pub fn detect(records: &[ReviewRecord], config: &DetectorConfig) -> Result<Detection, EngineError> {
    config.validate()?;

    let aggregation = aggregate_weekly(records);

    let (weekly, raw_alerts) = aggregation.series.iter().try_fold(
        (Vec::new(), Vec::new()),
        |(mut weekly, mut alerts), series| -> Result<_, EngineError> {
            let rows = roll_series(series, config.week_window)?;
            alerts.extend(classify_all(&rows, config));
            weekly.extend(rows);
            Ok((weekly, alerts))
        },
    )?;

    let candidates = raw_alerts.len();
    let alerts = filter_recent(raw_alerts, config.recency_days);

    info!(
        categories = aggregation.series.len(),
        weeks = weekly.len(),
        candidates,
        alerts = alerts.len(),
        "sentiment detection finished"
    );

    Ok(Detection {
        weekly,
        alerts,
        eligible_reviews: aggregation.eligible,
        dropped_reviews: aggregation.dropped,
    })
}
