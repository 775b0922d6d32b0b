//! Stock levels and movement planning.
//!
//! Products carry an aggregate `stock` and optional per-size stock. When a
//! product has sizes, the aggregate is the sum of its sizes. Every change to a
//! quantity is recorded as a stock movement with a signed delta, so the ledger
//! can always explain the current number.

use serde::{Deserialize, Serialize};

/// Stock errors surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    #[error("only {available} left of {product}{}", size_suffix(.size.as_deref()))]
    Insufficient {
        product: String,
        size: Option<String>,
        requested: i32,
        available: i32,
    },
    #[error("stock cannot go below zero (current {current}, change {delta})")]
    Negative { current: i32, delta: i32 },
    #[error("quantity must be a positive number")]
    InvalidQuantity,
    #[error("stock change cannot be zero")]
    ZeroDelta,
    #[error("size {0} does not exist for this product")]
    UnknownSize(String),
    #[error("duplicate size {0}")]
    DuplicateSize(String),
}

fn size_suffix(size: Option<&str>) -> String {
    size.map(|s| format!(" in size {s}")).unwrap_or_default()
}

/// Stock held for a single size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct SizeStock {
    pub size: String,
    pub stock: i32,
}

/// Coarse availability shown in the inventory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    InStock,
    Low,
    OutOfStock,
}

impl StockLevel {
    /// Classify a stock quantity.
    ///
    /// The `out_of_stock` flag forces [`StockLevel::OutOfStock`] regardless of
    /// the quantity.
    #[must_use]
    pub const fn classify(stock: i32, low_threshold: i32, out_of_stock: bool) -> Self {
        if out_of_stock || stock <= 0 {
            Self::OutOfStock
        } else if stock <= low_threshold {
            Self::Low
        } else {
            Self::InStock
        }
    }
}

/// Sum of per-size stock.
#[must_use]
pub fn aggregate(sizes: &[SizeStock]) -> i32 {
    sizes.iter().map(|s| s.stock).sum()
}

/// Apply a signed delta, refusing to go negative.
///
/// # Errors
///
/// Returns [`StockError::Negative`] if the result would be below zero.
pub const fn apply_delta(current: i32, delta: i32) -> Result<i32, StockError> {
    match current.checked_add(delta) {
        Some(next) if next >= 0 => Ok(next),
        _ => Err(StockError::Negative { current, delta }),
    }
}

/// A quantity change to be written together with its ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// `None` for products without sizes.
    pub size: Option<String>,
    pub delta: i32,
    pub resulting: i32,
}

/// Plan the adjustments that turn `current` per-size stock into `desired`.
///
/// Sizes missing from `desired` are left untouched; sizes in `desired` that do
/// not exist yet are created from zero. Unchanged sizes produce no
/// adjustment.
///
/// # Errors
///
/// Returns [`StockError`] for negative targets or a size listed twice.
pub fn plan_size_adjustments(
    current: &[SizeStock],
    desired: &[SizeStock],
) -> Result<Vec<Adjustment>, StockError> {
    let mut seen = std::collections::HashSet::new();
    let mut plan = Vec::new();

    for target in desired {
        let size = target.size.trim();
        if !seen.insert(size.to_owned()) {
            return Err(StockError::DuplicateSize(size.to_owned()));
        }
        if target.stock < 0 {
            return Err(StockError::Negative {
                current: 0,
                delta: target.stock,
            });
        }

        let before = current
            .iter()
            .find(|s| s.size == size)
            .map_or(0, |s| s.stock);
        let delta = target.stock - before;
        if delta != 0 {
            plan.push(Adjustment {
                size: Some(size.to_owned()),
                delta,
                resulting: target.stock,
            });
        }
    }

    Ok(plan)
}

/// Plan an aggregate edit for a product without sizes.
///
/// # Errors
///
/// Returns [`StockError::Negative`] for a negative target.
pub const fn plan_aggregate_adjustment(
    current: i32,
    desired: i32,
) -> Result<Option<Adjustment>, StockError> {
    if desired < 0 {
        return Err(StockError::Negative {
            current,
            delta: desired - current,
        });
    }
    if desired == current {
        return Ok(None);
    }
    Ok(Some(Adjustment {
        size: None,
        delta: desired - current,
        resulting: desired,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sizes(pairs: &[(&str, i32)]) -> Vec<SizeStock> {
        pairs
            .iter()
            .map(|(size, stock)| SizeStock {
                size: (*size).to_owned(),
                stock: *stock,
            })
            .collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(StockLevel::classify(0, 5, false), StockLevel::OutOfStock);
        assert_eq!(StockLevel::classify(3, 5, false), StockLevel::Low);
        assert_eq!(StockLevel::classify(5, 5, false), StockLevel::Low);
        assert_eq!(StockLevel::classify(40, 5, false), StockLevel::InStock);
        assert_eq!(StockLevel::classify(40, 5, true), StockLevel::OutOfStock);
    }

    #[test]
    fn test_apply_delta() {
        assert_eq!(apply_delta(10, -3), Ok(7));
        assert_eq!(apply_delta(2, 5), Ok(7));
        assert_eq!(
            apply_delta(2, -3),
            Err(StockError::Negative {
                current: 2,
                delta: -3
            })
        );
    }

    #[test]
    fn test_plan_size_adjustments_only_changed_sizes() {
        let current = sizes(&[("7", 4), ("8", 10), ("9", 0)]);
        let desired = sizes(&[("7", 4), ("8", 6), ("10", 3)]);
        let plan = plan_size_adjustments(&current, &desired).unwrap();

        assert_eq!(
            plan,
            vec![
                Adjustment {
                    size: Some("8".into()),
                    delta: -4,
                    resulting: 6
                },
                Adjustment {
                    size: Some("10".into()),
                    delta: 3,
                    resulting: 3
                },
            ]
        );
    }

    #[test]
    fn test_plan_size_adjustments_rejects_bad_input() {
        let current = sizes(&[("7", 4)]);
        assert!(matches!(
            plan_size_adjustments(&current, &sizes(&[("7", -1)])),
            Err(StockError::Negative { .. })
        ));
        assert_eq!(
            plan_size_adjustments(&current, &sizes(&[("8", 1), ("8", 2)])),
            Err(StockError::DuplicateSize("8".into()))
        );
    }

    #[test]
    fn test_plan_aggregate_adjustment() {
        assert_eq!(plan_aggregate_adjustment(10, 10), Ok(None));
        assert_eq!(
            plan_aggregate_adjustment(10, 12),
            Ok(Some(Adjustment {
                size: None,
                delta: 2,
                resulting: 12
            }))
        );
        assert!(plan_aggregate_adjustment(10, -1).is_err());
    }

    #[test]
    fn test_aggregate() {
        assert_eq!(aggregate(&sizes(&[("7", 4), ("8", 6)])), 10);
        assert_eq!(aggregate(&[]), 0);
    }

    #[test]
    fn test_insufficient_message_mentions_size() {
        let err = StockError::Insufficient {
            product: "Court Runner".into(),
            size: Some("9".into()),
            requested: 3,
            available: 1,
        };
        assert_eq!(err.to_string(), "only 1 left of Court Runner in size 9");
    }
}
