//! Status and kind enums stored as Postgres enum types.
//!
//! Each enum serializes as `snake_case` in JSON and maps to a Postgres enum of
//! the same spelling (see `crates/server/migrations`). `Display` and `FromStr`
//! use the same spelling so query strings and CLI flags round-trip.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` from a variant/label table.
macro_rules! impl_labels {
    ($ty:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` label used in JSON and SQL.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(format!("invalid {}: {s}", stringify!($ty))),
                }
            }
        }
    };
}

/// Lifecycle of an order. Transition rules live in [`crate::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Online payment initiated but not yet verified.
    PendingPayment,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl_labels!(OrderStatus {
    PendingPayment => "pending_payment",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    /// Prepaid through the payment gateway.
    Online,
}

impl_labels!(PaymentMethod {
    Cod => "cod",
    Online => "online",
});

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl_labels!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

/// Reason recorded on a stock movement ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "stock_movement_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Units leaving stock at checkout.
    Sale,
    /// Units restored when an order is cancelled.
    Cancellation,
    /// Inline edit or manual correction from the inventory screen.
    ManualAdjustment,
    /// Units returned by a customer.
    Return,
    /// Units restored when an online payment fails.
    PaymentFailed,
}

impl_labels!(MovementType {
    Sale => "sale",
    Cancellation => "cancellation",
    ManualAdjustment => "manual_adjustment",
    Return => "return",
    PaymentFailed => "payment_failed",
});

impl MovementType {
    /// Whether this movement type may be recorded by hand from the admin.
    #[must_use]
    pub const fn is_manual(self) -> bool {
        matches!(self, Self::ManualAdjustment | Self::Return)
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    /// Store staff with access to the back-office API.
    Admin,
    /// Store owner; same API access as `Admin`.
    SuperAdmin,
}

impl_labels!(UserRole {
    Customer => "customer",
    Admin => "admin",
    SuperAdmin => "super_admin",
});

impl UserRole {
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

/// Moderation state of a product review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "review_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl_labels!(ReviewStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// How a coupon's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "coupon_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a percentage of the subtotal.
    Percentage,
    /// `value` is a flat amount off.
    Fixed,
}

impl_labels!(CouponKind {
    Percentage => "percentage",
    Fixed => "fixed",
});

/// Storefront filter facet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "filter_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Category,
    Size,
    Color,
    Price,
    Custom,
}

impl_labels!(FilterKind {
    Category => "category",
    Size => "size",
    Color => "color",
    Price => "price",
    Custom => "custom",
});

/// Storefront analytics event type, in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "analytics_event_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEventKind {
    PageView,
    ProductView,
    AddToCart,
    CheckoutStarted,
    Purchase,
}

impl_labels!(AnalyticsEventKind {
    PageView => "page_view",
    ProductView => "product_view",
    AddToCart => "add_to_cart",
    CheckoutStarted => "checkout_started",
    Purchase => "purchase",
});

/// Device class derived from a user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "device_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Bot,
}

impl_labels!(DeviceType {
    Mobile => "mobile",
    Tablet => "tablet",
    Desktop => "desktop",
    Bot => "bot",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        for kind in MovementType::ALL {
            assert_eq!(kind.to_string().parse::<MovementType>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_json_matches_label() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
        let json = serde_json::to_string(&UserRole::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "shipping".parse::<OrderStatus>().unwrap_err();
        assert!(err.contains("OrderStatus"));
    }

    #[test]
    fn test_manual_movement_types() {
        assert!(MovementType::ManualAdjustment.is_manual());
        assert!(MovementType::Return.is_manual());
        assert!(!MovementType::Sale.is_manual());
        assert!(!MovementType::PaymentFailed.is_manual());
    }

    #[test]
    fn test_staff_roles() {
        assert!(!UserRole::Customer.is_staff());
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::SuperAdmin.is_staff());
    }
}
