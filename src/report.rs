use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::config::DetectorConfig;
use crate::engine::Detection;
use crate::models::{Alert, WeeklySentiment};

/// What a run hands to the notification layer. Failure is never folded into
/// the all-clear case.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Alerts(Vec<Alert>),
    AllClear,
    Failed(String),
}

impl RunOutcome {
    pub fn from_result<E: std::fmt::Display>(result: &Result<Detection, E>) -> Self {
        match result {
            Ok(detection) if detection.alerts.is_empty() => RunOutcome::AllClear,
            Ok(detection) => RunOutcome::Alerts(detection.alerts.clone()),
            Err(err) => RunOutcome::Failed(format!("{err:#}")),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            RunOutcome::Alerts(_) => "alerts",
            RunOutcome::AllClear => "all_clear",
            RunOutcome::Failed(_) => "failed",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            RunOutcome::Failed(_) => "Review Sentiment Pipeline Failed",
            _ => "Review Sentiment Report",
        }
    }

    pub fn message(&self) -> String {
        match self {
            RunOutcome::Alerts(alerts) => format!(
                "Sentiment spikes detected ({} alerts). Please find the weekly sentiment alert report attached.",
                alerts.len()
            ),
            RunOutcome::AllClear => {
                "Review data processed successfully. No major sentiment spikes detected this week."
                    .to_string()
            }
            RunOutcome::Failed(reason) => format!("Review sentiment pipeline failed due to: {reason}"),
        }
    }

    pub fn alerts(&self) -> &[Alert] {
        match self {
            RunOutcome::Alerts(alerts) => alerts,
            _ => &[],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationPayload<'a> {
    pub status: &'static str,
    pub subject: &'static str,
    pub message: String,
    pub config: &'a DetectorConfig,
    pub alerts: &'a [Alert],
}

pub fn notification_payload<'a>(
    outcome: &'a RunOutcome,
    config: &'a DetectorConfig,
) -> NotificationPayload<'a> {
    NotificationPayload {
        status: outcome.status(),
        subject: outcome.subject(),
        message: outcome.message(),
        config,
        alerts: outcome.alerts(),
    }
}

pub fn write_notification(path: &Path, payload: &NotificationPayload<'_>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[derive(Serialize)]
struct AlertCsvRow<'a> {
    date: String,
    category: &'a str,
    #[serde(rename = "type")]
    alert_type: &'static str,
    change: f64,
}

pub fn write_alerts_csv<W: std::io::Write>(writer: W, alerts: &[Alert]) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for alert in alerts {
        csv_writer.serialize(AlertCsvRow {
            date: alert.date.to_string(),
            category: &alert.category,
            alert_type: alert.alert_type.as_str(),
            change: alert.change,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Most recent weekly row per category.
pub fn latest_by_category(weekly: &[WeeklySentiment]) -> Vec<&WeeklySentiment> {
    let mut latest: BTreeMap<&str, &WeeklySentiment> = BTreeMap::new();
    for row in weekly {
        let entry = latest.entry(row.category.as_str()).or_insert(row);
        if row.week_start > entry.week_start {
            *entry = row;
        }
    }
    latest.into_values().collect()
}

fn signed(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:+.3}"),
        None => "n/a".to_string(),
    }
}

pub fn build_report(source: &str, outcome: &RunOutcome, detection: Option<&Detection>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Review Sentiment Report");
    let _ = writeln!(output, "Generated from {source}");
    let _ = writeln!(output);
    let _ = writeln!(output, "**Status:** {}", outcome.message());

    if let Some(detection) = detection {
        let _ = writeln!(
            output,
            "{} eligible reviews analyzed ({} skipped).",
            detection.eligible_reviews, detection.dropped_reviews
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Last Week Alerts");

    match outcome {
        RunOutcome::Failed(_) => {
            let _ = writeln!(output, "Alerts unavailable: the run did not complete.");
        }
        RunOutcome::AllClear => {
            let _ = writeln!(output, "No sentiment spikes in the last week.");
        }
        RunOutcome::Alerts(alerts) => {
            for alert in alerts {
                let _ = writeln!(
                    output,
                    "- {} {} ({}): change {:+.3}",
                    alert.date, alert.category, alert.alert_type, alert.change
                );
            }
        }
    }

    let Some(detection) = detection else {
        return output;
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Trends");

    let latest = latest_by_category(&detection.weekly);
    if latest.is_empty() {
        let _ = writeln!(output, "No eligible reviews recorded.");
    } else {
        let _ = writeln!(
            output,
            "| Category | Week | Reviews | Pos/Neu/Neg | Weekly | Rolling | Delta |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for row in latest {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {:+.3} | {:+.3} | {} |",
                row.category,
                row.week_start,
                row.review_count,
                row.labels,
                row.weekly_sentiment,
                row.rolling_avg,
                signed(row.delta)
            );
        }
    }

    output
}
