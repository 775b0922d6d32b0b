//! Product review types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::{ProductId, ReviewId, ReviewStatus, UserId, round_money};

/// A customer review.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// Display name of the author at read time.
    pub author_name: String,
    pub rating: i16,
    pub title: String,
    pub body: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

/// Review submission body.
#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub rating: i16,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl ReviewInput {
    pub const MAX_BODY_LENGTH: usize = 4000;

    /// # Errors
    ///
    /// Returns a message when the rating is outside 1-5 or the text is too long.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_owned());
        }
        if self.title.chars().count() > 200 {
            return Err("title must be at most 200 characters".to_owned());
        }
        if self.body.chars().count() > Self::MAX_BODY_LENGTH {
            return Err(format!(
                "review must be at most {} characters",
                Self::MAX_BODY_LENGTH
            ));
        }
        Ok(())
    }
}

/// Admin listing filter.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    pub status: Option<ReviewStatus>,
    pub product_id: Option<ProductId>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Average rating and per-star counts over approved reviews.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    pub average: Decimal,
    pub count: i64,
    /// Index 0 holds one-star reviews, index 4 five-star reviews.
    pub distribution: [i64; 5],
}

impl RatingSummary {
    /// Build a summary from `(rating, count)` pairs.
    #[must_use]
    pub fn from_counts(counts: &[(i16, i64)]) -> Self {
        let mut distribution = [0_i64; 5];
        let mut total = 0_i64;
        let mut weighted = 0_i64;
        for (rating, count) in counts {
            let Ok(index) = usize::try_from(rating - 1) else {
                continue;
            };
            if let Some(slot) = distribution.get_mut(index) {
                *slot += count;
                total += count;
                weighted += i64::from(*rating) * count;
            }
        }
        let average = if total == 0 {
            Decimal::ZERO
        } else {
            round_money(Decimal::from(weighted) / Decimal::from(total))
        };
        Self {
            average,
            count: total,
            distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary() {
        let summary = RatingSummary::from_counts(&[(5, 3), (4, 1), (1, 1), (9, 4)]);
        assert_eq!(summary.count, 5);
        assert_eq!(summary.distribution, [1, 0, 0, 1, 3]);
        assert_eq!(summary.average, Decimal::new(400, 2));
    }

    #[test]
    fn test_empty_summary() {
        let summary = RatingSummary::from_counts(&[]);
        assert_eq!(summary, RatingSummary::default());
    }

    #[test]
    fn test_review_input_validation() {
        let ok = ReviewInput {
            rating: 4,
            title: "Comfy".to_owned(),
            body: "Wore them on a 10k.".to_owned(),
        };
        assert!(ok.validate().is_ok());

        let bad = ReviewInput { rating: 0, ..ok };
        assert!(bad.validate().is_err());
    }
}
