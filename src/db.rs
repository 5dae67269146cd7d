use std::collections::BTreeMap;

use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{Alert, ReviewRecord};

/// Columns stored next to the fields the detector reads.
const PASSTHROUGH_COLS: [&str; 6] = [
    "keyword_used",
    "asin",
    "product_title",
    "review_title",
    "review_text",
    "reviewer",
];

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Stable key for a review so re-imports of the same feed do not duplicate
/// rows. Falls back to a random key when the review has no identity.
pub fn source_key(record: &ReviewRecord) -> String {
    if let Some(key) = record.passthrough.get("source_key").filter(|k| !k.trim().is_empty()) {
        return key.clone();
    }

    let asin = record.passthrough.get("asin").map(String::as_str).unwrap_or("");
    let text = record
        .passthrough
        .get("review_text")
        .map(String::as_str)
        .unwrap_or("");

    if asin.trim().is_empty() && text.trim().is_empty() {
        return format!("import-{}", Uuid::new_v4());
    }

    let identity = format!("{asin}\u{1f}{text}");
    format!("review-{}", Uuid::new_v5(&Uuid::NAMESPACE_OID, identity.as_bytes()))
}

fn passthrough_value<'a>(record: &'a ReviewRecord, column: &str) -> Option<&'a str> {
    record
        .passthrough
        .get(column)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}

pub async fn import_reviews(pool: &PgPool, records: &[ReviewRecord]) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for record in records {
        let result = sqlx::query(
            r#"
            INSERT INTO review_sentiment.reviews
            (id, category, keyword_used, asin, product_title, rating,
             review_title, review_text, review_date, reviewer, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.category.as_deref())
        .bind(passthrough_value(record, "keyword_used"))
        .bind(passthrough_value(record, "asin"))
        .bind(passthrough_value(record, "product_title"))
        .bind(record.rating)
        .bind(passthrough_value(record, "review_title"))
        .bind(passthrough_value(record, "review_text"))
        .bind(record.review_date.as_deref())
        .bind(passthrough_value(record, "reviewer"))
        .bind(source_key(record))
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    info!(inserted, total = records.len(), "imported reviews");
    Ok(inserted)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    // Wearables trends down over four weeks, Mobile_Accessories recovers.
    let weeks: [(&str, &str, &[f64]); 8] = [
        ("Wearables", "2026-01-05", &[5.0, 4.0]),
        ("Wearables", "2026-01-12", &[5.0, 5.0, 4.0]),
        ("Wearables", "2026-01-19", &[5.0, 4.0, 1.0, 2.0, 1.0]),
        ("Wearables", "2026-01-26", &[3.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 1.0]),
        ("Mobile_Accessories", "2026-01-05", &[4.0, 5.0, 3.0]),
        ("Mobile_Accessories", "2026-01-12", &[1.0, 2.0, 1.0]),
        ("Mobile_Accessories", "2026-01-19", &[2.0, 3.0]),
        ("Mobile_Accessories", "2026-01-26", &[5.0, 5.0, 4.0]),
    ];

    let mut records = Vec::new();
    for (category, week, ratings) in weeks {
        let monday = NaiveDate::parse_from_str(week, "%Y-%m-%d")?;
        for (idx, rating) in ratings.iter().enumerate() {
            let date = monday + chrono::Duration::days((idx % 7) as i64);
            let mut passthrough = BTreeMap::new();
            passthrough.insert(
                "source_key".to_string(),
                format!("seed-{category}-{week}-{idx}"),
            );
            passthrough.insert("asin".to_string(), format!("SEED-{category}"));
            passthrough.insert(
                "review_text".to_string(),
                format!("Seed review {idx} for week of {week}"),
            );
            records.push(ReviewRecord {
                category: Some(category.to_string()),
                rating: Some(*rating),
                review_date: Some(date.to_string()),
                passthrough,
            });
        }
    }

    import_reviews(pool, &records).await
}

pub async fn fetch_reviews(
    pool: &PgPool,
    category: Option<&str>,
) -> anyhow::Result<Vec<ReviewRecord>> {
    let mut query = String::from(
        "SELECT category, rating, review_date, keyword_used, asin, product_title, \
         review_title, review_text, reviewer \
         FROM review_sentiment.reviews",
    );

    if category.is_some() {
        query.push_str(" WHERE category = $1");
    }
    query.push_str(" ORDER BY collected_at, id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = category {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut reviews = Vec::with_capacity(records.len());

    for row in records {
        let mut passthrough = BTreeMap::new();
        for column in PASSTHROUGH_COLS {
            let value: Option<String> = row.get(column);
            if let Some(value) = value {
                passthrough.insert(column.to_string(), value);
            }
        }

        reviews.push(ReviewRecord {
            category: row.get("category"),
            rating: row.get("rating"),
            review_date: row.get("review_date"),
            passthrough,
        });
    }

    Ok(reviews)
}

pub async fn save_alerts(pool: &PgPool, run_id: Uuid, alerts: &[Alert]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    for alert in alerts {
        sqlx::query(
            r#"
            INSERT INTO review_sentiment.alerts
            (id, run_id, alert_date, category, alert_type, change)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(run_id)
        .bind(alert.date)
        .bind(&alert.category)
        .bind(alert.alert_type.as_str())
        .bind(alert.change)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(%run_id, alerts = alerts.len(), "saved alerts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> ReviewRecord {
        ReviewRecord {
            passthrough: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..ReviewRecord::default()
        }
    }

    #[test]
    fn explicit_source_key_wins() {
        let review = record(&[("source_key", "seed-001"), ("asin", "B0001")]);
        assert_eq!(source_key(&review), "seed-001");
    }

    #[test]
    fn same_review_gets_same_key() {
        let a = record(&[("asin", "B0001"), ("review_text", "Great battery")]);
        let b = record(&[("asin", "B0001"), ("review_text", "Great battery")]);
        let c = record(&[("asin", "B0001"), ("review_text", "Strap broke")]);
        assert_eq!(source_key(&a), source_key(&b));
        assert_ne!(source_key(&a), source_key(&c));
        assert!(source_key(&a).starts_with("review-"));
    }

    #[test]
    fn anonymous_reviews_get_random_keys() {
        let review = record(&[]);
        let first = source_key(&review);
        assert!(first.starts_with("import-"));
        assert_ne!(first, source_key(&review));
    }
}
