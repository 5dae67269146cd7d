use chrono::NaiveDate;
use thiserror::Error;

/// Failures that stop the detection engine from producing any result.
///
/// Ineligible review rows are not errors; they are filtered before
/// aggregation and never surface here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("input is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("failed to read review input: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid detector setting '{name}': {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    #[error("weekly series for '{category}' is not strictly ascending at {week_start}")]
    UnorderedSeries {
        category: String,
        week_start: NaiveDate,
    },
}
