use crate::error::EngineError;
use crate::models::{CategorySeries, WeeklySentiment};

/// Computes rolling average, delta and their one-row lags for a single
/// category. "Previous" is the previous row of the series, even when the
/// weeks are not calendar-adjacent.
pub fn roll_series(
    series: &CategorySeries,
    window: usize,
) -> Result<Vec<WeeklySentiment>, EngineError> {
    if window == 0 {
        return Err(EngineError::InvalidConfig {
            name: "week_window",
            reason: "must be at least 1".to_string(),
        });
    }

    for pair in series.weeks.windows(2) {
        if pair[1].week_start <= pair[0].week_start {
            return Err(EngineError::UnorderedSeries {
                category: series.category.clone(),
                week_start: pair[1].week_start,
            });
        }
    }

    let mut rows: Vec<WeeklySentiment> = Vec::with_capacity(series.weeks.len());

    for (idx, bucket) in series.weeks.iter().enumerate() {
        let start = (idx + 1).saturating_sub(window);
        let trailing = &series.weeks[start..=idx];
        let rolling_avg = trailing
            .iter()
            .map(|week| week.weekly_sentiment)
            .sum::<f64>()
            / trailing.len() as f64;

        let previous = rows.last();
        let prev_rolling_avg = previous.map(|row| row.rolling_avg);
        let prev_delta = previous.and_then(|row| row.delta);
        let delta = prev_rolling_avg.map(|prev| rolling_avg - prev);

        rows.push(WeeklySentiment {
            category: series.category.clone(),
            week_start: bucket.week_start,
            review_count: bucket.review_count,
            labels: bucket.labels,
            weekly_sentiment: bucket.weekly_sentiment,
            rolling_avg,
            prev_rolling_avg,
            delta,
            prev_delta,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabelCounts, WeeklyBucket};
    use chrono::{Duration, NaiveDate};

    fn series(category: &str, values: &[f64]) -> CategorySeries {
        let first = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        CategorySeries {
            category: category.to_string(),
            weeks: values
                .iter()
                .enumerate()
                .map(|(idx, value)| WeeklyBucket {
                    week_start: first + Duration::weeks(idx as i64),
                    review_count: 1,
                    labels: LabelCounts::default(),
                    weekly_sentiment: *value,
                })
                .collect(),
        }
    }

    fn assert_close(actual: Option<f64>, expected: Option<f64>) {
        match (actual, expected) {
            (Some(a), Some(e)) => assert!((a - e).abs() < 1e-9, "expected {e}, got {a}"),
            (None, None) => {}
            _ => panic!("expected {expected:?}, got {actual:?}"),
        }
    }

    #[test]
    fn wearables_scenario_rolls_as_expected() {
        let rows = roll_series(&series("Wearables", &[1.0, 1.0, -0.2, -0.9]), 2).unwrap();

        let rolling: Vec<f64> = rows.iter().map(|row| row.rolling_avg).collect();
        for (actual, expected) in rolling.iter().zip([1.0, 1.0, 0.4, -0.55]) {
            assert!((actual - expected).abs() < 1e-9);
        }

        assert_close(rows[0].delta, None);
        assert_close(rows[1].delta, Some(0.0));
        assert_close(rows[2].delta, Some(-0.6));
        assert_close(rows[3].delta, Some(-0.95));

        assert_close(rows[0].prev_rolling_avg, None);
        assert_close(rows[2].prev_rolling_avg, Some(1.0));

        assert_close(rows[0].prev_delta, None);
        assert_close(rows[1].prev_delta, None);
        assert_close(rows[2].prev_delta, Some(0.0));
        assert_close(rows[3].prev_delta, Some(-0.6));
    }

    #[test]
    fn first_row_uses_shortened_window() {
        let rows = roll_series(&series("Wearables", &[-0.5]), 2).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rolling_avg, -0.5);
        assert!(rows[0].delta.is_none());
    }

    #[test]
    fn wider_window_averages_more_rows() {
        let rows = roll_series(&series("Wearables", &[1.0, 0.0, -1.0, -1.0]), 3).unwrap();
        assert_close(Some(rows[1].rolling_avg), Some(0.5));
        assert_close(Some(rows[2].rolling_avg), Some(0.0));
        assert_close(Some(rows[3].rolling_avg), Some(-2.0 / 3.0));
    }

    #[test]
    fn categories_do_not_leak_into_each_other() {
        let a = roll_series(&series("A", &[1.0, 1.0]), 2).unwrap();
        let b = roll_series(&series("B", &[-1.0, -1.0]), 2).unwrap();

        assert!(a.iter().all(|row| row.category == "A"));
        assert_eq!(b[0].category, "B");
        assert!(b[0].prev_rolling_avg.is_none());
        assert!(b[0].delta.is_none());
        assert_eq!(b[0].rolling_avg, -1.0);
        assert_eq!(b[1].delta, Some(0.0));
    }

    #[test]
    fn unordered_series_is_rejected() {
        let mut input = series("Wearables", &[1.0, 0.0]);
        input.weeks.swap(0, 1);
        assert!(matches!(
            roll_series(&input, 2),
            Err(EngineError::UnorderedSeries { .. })
        ));
    }

    #[test]
    fn duplicate_week_is_rejected() {
        let mut input = series("Wearables", &[1.0, 0.0]);
        input.weeks[1].week_start = input.weeks[0].week_start;
        assert!(roll_series(&input, 2).is_err());
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(roll_series(&series("Wearables", &[1.0]), 0).is_err());
    }
}
