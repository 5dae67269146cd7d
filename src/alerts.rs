use chrono::{Duration, NaiveDate};

use crate::config::DetectorConfig;
use crate::models::{Alert, AlertType, WeeklySentiment};

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Applies the spike and trend-shift rules to one weekly row. The rules are
/// independent, so a single row can raise up to three alerts.
pub fn classify(row: &WeeklySentiment, config: &DetectorConfig) -> Vec<Alert> {
    let mut out = Vec::new();

    let Some(delta) = row.delta else {
        return out;
    };

    let emit = |alert_type: AlertType| Alert {
        date: row.week_start,
        category: row.category.clone(),
        alert_type,
        change: round3(delta),
    };

    if delta <= -config.spike_threshold {
        out.push(emit(AlertType::NegativeSpike));
    }

    if delta >= config.spike_threshold {
        out.push(emit(AlertType::PositiveSpike));
    }

    if let Some(prev_delta) = row.prev_delta {
        if delta * prev_delta < 0.0 && delta.abs() >= config.trend_shift_threshold {
            out.push(emit(AlertType::TrendShift));
        }
    }

    out
}

pub fn classify_all(rows: &[WeeklySentiment], config: &DetectorConfig) -> Vec<Alert> {
    rows.iter().flat_map(|row| classify(row, config)).collect()
}

/// Keeps alerts dated within `recency_days` of the newest alert across all
/// categories, ordered by date then category.
pub fn filter_recent(alerts: Vec<Alert>, recency_days: i64) -> Vec<Alert> {
    let Some(latest) = alerts.iter().map(|alert| alert.date).max() else {
        return alerts;
    };
    // A window reaching past the earliest date keeps everything.
    let cutoff = Duration::try_days(recency_days)
        .and_then(|window| latest.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN);

    let mut recent: Vec<Alert> = alerts
        .into_iter()
        .filter(|alert| alert.date >= cutoff)
        .collect();
    recent.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.category.cmp(&b.category)));
    recent
}
