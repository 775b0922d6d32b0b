//! Coupon eligibility and discount calculation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CouponKind, round_money};

/// Why a coupon cannot be applied to a basket.
///
/// Serialized with a `reason` tag so the storefront can show a specific
/// message next to the coupon input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CouponRejection {
    #[error("coupon code not found")]
    Unknown,
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotStarted,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageExhausted,
    #[error("you have already used this coupon")]
    PerUserLimit,
    #[error("order must be at least {minimum} to use this coupon")]
    BelowMinimum { minimum: Decimal },
}

/// A coupon definition that fails basic sanity checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCoupon {
    #[error("coupon code must be 3-32 letters, digits, '-' or '_'")]
    Code,
    #[error("percentage must be greater than 0 and at most 100")]
    Percentage,
    #[error("discount value must be greater than 0")]
    Value,
    #[error("coupon must start before it expires")]
    Window,
    #[error("{0} must not be negative")]
    Negative(&'static str),
}

/// Canonical form of a coupon code: trimmed and uppercased.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// The rules of a coupon, independent of storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRules {
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    /// Cap on the discount of a percentage coupon.
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl CouponRules {
    /// Check a definition before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoupon`] for out-of-range values or an inverted
    /// validity window.
    pub fn check_definition(&self, code: &str) -> Result<(), InvalidCoupon> {
        let code_ok = (3..=32).contains(&code.len())
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !code_ok {
            return Err(InvalidCoupon::Code);
        }

        match self.kind {
            CouponKind::Percentage
                if self.value <= Decimal::ZERO || self.value > Decimal::ONE_HUNDRED =>
            {
                return Err(InvalidCoupon::Percentage);
            }
            CouponKind::Fixed if self.value <= Decimal::ZERO => return Err(InvalidCoupon::Value),
            _ => {}
        }

        if self.min_order_amount.is_some_and(|m| m < Decimal::ZERO) {
            return Err(InvalidCoupon::Negative("minimum order amount"));
        }
        if self.max_discount.is_some_and(|m| m < Decimal::ZERO) {
            return Err(InvalidCoupon::Negative("maximum discount"));
        }
        if self.usage_limit.is_some_and(|l| l < 0) {
            return Err(InvalidCoupon::Negative("usage limit"));
        }
        if self.per_user_limit.is_some_and(|l| l < 0) {
            return Err(InvalidCoupon::Negative("per-user limit"));
        }

        if let (Some(start), Some(end)) = (self.starts_at, self.expires_at)
            && start >= end
        {
            return Err(InvalidCoupon::Window);
        }
        Ok(())
    }

    /// Evaluate the coupon against a basket and return the discount.
    ///
    /// `user_uses` is how many orders this customer has already placed with
    /// the coupon.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies, checked in the
    /// order: active, window, global usage, per-user usage, minimum amount.
    pub fn evaluate(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
        user_uses: i64,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if self.starts_at.is_some_and(|s| now < s) {
            return Err(CouponRejection::NotStarted);
        }
        if self.expires_at.is_some_and(|e| now >= e) {
            return Err(CouponRejection::Expired);
        }
        if self.usage_limit.is_some_and(|l| self.used_count >= l) {
            return Err(CouponRejection::UsageExhausted);
        }
        if self
            .per_user_limit
            .is_some_and(|l| user_uses >= i64::from(l))
        {
            return Err(CouponRejection::PerUserLimit);
        }
        if let Some(minimum) = self.min_order_amount
            && subtotal < minimum
        {
            return Err(CouponRejection::BelowMinimum { minimum });
        }

        Ok(self.discount_for(subtotal))
    }

    /// Discount for a subtotal, ignoring eligibility.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let raw = match self.kind {
            CouponKind::Percentage => {
                let pct = subtotal * self.value / Decimal::ONE_HUNDRED;
                self.max_discount.map_or(pct, |cap| pct.min(cap))
            }
            CouponKind::Fixed => self.value,
        };
        round_money(raw.min(subtotal))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn percent(value: &str) -> CouponRules {
        CouponRules {
            kind: CouponKind::Percentage,
            value: dec(value),
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            per_user_limit: None,
            used_count: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let c = percent("10");
        assert_eq!(c.evaluate(dec("2499"), Utc::now(), 0), Ok(dec("249.90")));
    }

    #[test]
    fn test_percentage_respects_cap() {
        let c = CouponRules {
            max_discount: Some(dec("300")),
            ..percent("20")
        };
        assert_eq!(c.discount_for(dec("5000")), dec("300"));
        assert_eq!(c.discount_for(dec("1000")), dec("200"));
    }

    #[test]
    fn test_fixed_never_exceeds_subtotal() {
        let c = CouponRules {
            kind: CouponKind::Fixed,
            value: dec("500"),
            ..percent("1")
        };
        assert_eq!(c.discount_for(dec("350")), dec("350"));
        assert_eq!(c.discount_for(dec("1350")), dec("500"));
    }

    #[test]
    fn test_rejections() {
        let now = Utc::now();

        let inactive = CouponRules {
            is_active: false,
            ..percent("10")
        };
        assert_eq!(
            inactive.evaluate(dec("100"), now, 0),
            Err(CouponRejection::Inactive)
        );

        let future = CouponRules {
            starts_at: Some(now + Duration::days(1)),
            ..percent("10")
        };
        assert_eq!(
            future.evaluate(dec("100"), now, 0),
            Err(CouponRejection::NotStarted)
        );

        let expired = CouponRules {
            expires_at: Some(now - Duration::hours(1)),
            ..percent("10")
        };
        assert_eq!(
            expired.evaluate(dec("100"), now, 0),
            Err(CouponRejection::Expired)
        );

        let exhausted = CouponRules {
            usage_limit: Some(50),
            used_count: 50,
            ..percent("10")
        };
        assert_eq!(
            exhausted.evaluate(dec("100"), now, 0),
            Err(CouponRejection::UsageExhausted)
        );

        let once = CouponRules {
            per_user_limit: Some(1),
            ..percent("10")
        };
        assert_eq!(
            once.evaluate(dec("100"), now, 1),
            Err(CouponRejection::PerUserLimit)
        );
        assert!(once.evaluate(dec("100"), now, 0).is_ok());

        let minimum = CouponRules {
            min_order_amount: Some(dec("999")),
            ..percent("10")
        };
        assert_eq!(
            minimum.evaluate(dec("998"), now, 0),
            Err(CouponRejection::BelowMinimum {
                minimum: dec("999")
            })
        );
    }

    #[test]
    fn test_rejection_serializes_with_reason_tag() {
        let json = serde_json::to_value(CouponRejection::UsageExhausted).unwrap();
        assert_eq!(json["reason"], "usage_exhausted");
    }

    #[test]
    fn test_check_definition() {
        assert!(percent("15").check_definition("DIWALI15").is_ok());
        assert_eq!(
            percent("0").check_definition("ZERO"),
            Err(InvalidCoupon::Percentage)
        );
        assert_eq!(
            percent("120").check_definition("HUGE"),
            Err(InvalidCoupon::Percentage)
        );
        assert_eq!(
            percent("10").check_definition("has space"),
            Err(InvalidCoupon::Code)
        );

        let now = Utc::now();
        let inverted = CouponRules {
            starts_at: Some(now),
            expires_at: Some(now - Duration::days(1)),
            ..percent("10")
        };
        assert_eq!(
            inverted.check_definition("BACKWARDS"),
            Err(InvalidCoupon::Window)
        );
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  welcome10 "), "WELCOME10");
    }
}
