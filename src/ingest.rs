use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::error::EngineError;
use crate::models::ReviewRecord;

pub const CATEGORY_COL: &str = "category";
pub const RATING_COL: &str = "rating";
pub const DATE_COL: &str = "review_date";

const DEDUP_COLS: [&str; 2] = ["asin", "review_text"];

/// Coerces a textual rating; anything that is not a number counts as missing.
pub fn parse_rating(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
}

fn non_blank(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

pub fn load_reviews(path: &Path) -> Result<Vec<ReviewRecord>, EngineError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let records = read_reviews(file)?;
    info!(path = %path.display(), reviews = records.len(), "loaded reviews");
    Ok(records)
}

pub fn read_reviews<R: Read>(input: R) -> Result<Vec<ReviewRecord>, EngineError> {
    read_records(csv::Reader::from_reader(input))
}

fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<ReviewRecord>, EngineError> {
    let headers = reader.headers()?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|header| header.trim() == name)
            .ok_or(EngineError::MissingColumn(name))
    };

    let category_idx = position(CATEGORY_COL)?;
    let rating_idx = position(RATING_COL)?;
    let date_idx = position(DATE_COL)?;
    let dedup = DEDUP_COLS.iter().all(|col| position(*col).is_ok());

    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let mut passthrough = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == category_idx || idx == rating_idx || idx == date_idx {
                continue;
            }
            passthrough.insert(header.trim().to_string(), field(idx).to_string());
        }

        if dedup {
            let key = (
                passthrough.get("asin").and_then(|v| non_blank(v)),
                passthrough.get("review_text").and_then(|v| non_blank(v)),
            );
            if !seen.insert(key) {
                continue;
            }
        }

        records.push(ReviewRecord {
            category: non_blank(field(category_idx)),
            rating: parse_rating(field(rating_idx)),
            review_date: non_blank(field(date_idx)),
            passthrough,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_are_coerced_to_numbers() {
        assert_eq!(parse_rating("5"), Some(5.0));
        assert_eq!(parse_rating(" 4.0 "), Some(4.0));
        assert_eq!(parse_rating(""), None);
        assert_eq!(parse_rating("five"), None);
        assert_eq!(parse_rating("NaN"), None);
    }

    #[test]
    fn reads_required_and_passthrough_columns() {
        let data = "\
category,keyword_used,rating,review_date,reviewer
Wearables,smartwatch,5,2025-01-06,Avery
Wearables,fitness band,,2025-01-07,Jules
,smartwatch,2,2025-01-08,Kiara
";
        let records = read_reviews(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].category.as_deref(), Some("Wearables"));
        assert_eq!(records[0].rating, Some(5.0));
        assert_eq!(records[0].review_date.as_deref(), Some("2025-01-06"));
        assert_eq!(records[0].passthrough["keyword_used"], "smartwatch");
        assert_eq!(records[0].passthrough["reviewer"], "Avery");
        assert!(!records[0].passthrough.contains_key("rating"));

        assert_eq!(records[1].rating, None);
        assert_eq!(records[2].category, None);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let data = "category,rating\nWearables,5\n";
        let err = read_reviews(data.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn("review_date")));
    }

    #[test]
    fn duplicate_reviews_are_dropped() {
        let data = "\
category,asin,rating,review_date,review_text
Wearables,B0001,5,2025-01-06,Great battery
Wearables,B0001,5,2025-01-06,Great battery
Wearables,B0001,1,2025-01-07,Strap broke
Wearables,B0002,5,2025-01-06,Great battery
";
        let records = read_reviews(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].rating, Some(1.0));
    }

    #[test]
    fn no_dedup_without_identity_columns() {
        let data = "\
category,rating,review_date
Wearables,5,2025-01-06
Wearables,5,2025-01-06
";
        let records = read_reviews(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
    }
}
