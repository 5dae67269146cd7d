use crate::models::{Sentiment, SentimentLabel};

/// Maps a star rating to a sentiment label and signed score.
pub fn rating_to_sentiment(rating: f64) -> Sentiment {
    if rating >= 4.0 {
        Sentiment {
            label: SentimentLabel::Positive,
            score: 1,
        }
    } else if rating == 3.0 {
        Sentiment {
            label: SentimentLabel::Neutral,
            score: 0,
        }
    } else {
        Sentiment {
            label: SentimentLabel::Negative,
            score: -1,
        }
    }
}
