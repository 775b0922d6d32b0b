//! Coupon types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::coupon::{CouponRejection, CouponRules};
use stride_core::{CouponId, CouponKind};

/// A persisted coupon.
#[derive(Debug, Clone, Serialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub const fn rules(&self) -> CouponRules {
        CouponRules {
            kind: self.kind,
            value: self.value,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            per_user_limit: self.per_user_limit,
            used_count: self.used_count,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

/// Create/update body.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl CouponInput {
    /// Rules as they would be stored, with a zero usage count.
    #[must_use]
    pub const fn rules(&self) -> CouponRules {
        CouponRules {
            kind: self.kind,
            value: self.value,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            per_user_limit: self.per_user_limit,
            used_count: 0,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

/// Storefront coupon check body.
#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: Decimal,
}

/// Result of a coupon check. Rejections are a normal outcome, not an error.
#[derive(Debug, Serialize)]
pub struct CouponValidation {
    pub code: String,
    pub valid: bool,
    pub discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<CouponRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CouponValidation {
    #[must_use]
    pub fn from_outcome(code: String, outcome: Result<Decimal, CouponRejection>) -> Self {
        match outcome {
            Ok(discount) => Self {
                code,
                valid: true,
                discount,
                rejection: None,
                message: None,
            },
            Err(rejection) => Self {
                code,
                valid: false,
                discount: Decimal::ZERO,
                message: Some(rejection.to_string()),
                rejection: Some(rejection),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_serializes_rejection() {
        let v = CouponValidation::from_outcome(
            "SAVE10".to_owned(),
            Err(CouponRejection::BelowMinimum {
                minimum: Decimal::from(500),
            }),
        );
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["rejection"]["reason"], "below_minimum");
        assert!(json["message"].is_string());
    }

    #[test]
    fn test_validation_success_omits_rejection() {
        let v = CouponValidation::from_outcome("SAVE10".to_owned(), Ok(Decimal::from(100)));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["valid"], true);
        assert!(json.get("rejection").is_none());
    }
}
