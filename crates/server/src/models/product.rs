//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stride_core::ProductId;
use stride_core::inventory::SizeStock;

use super::review::{RatingSummary, Review};

/// A product with its per-size stock.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    /// Aggregate stock; equals the sum of `sizes` when the product has sizes.
    pub stock: i32,
    pub sizes: Vec<SizeStock>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    /// Manual override that hides the product from sale regardless of stock.
    pub out_of_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn has_sizes(&self) -> bool {
        !self.sizes.is_empty()
    }

    /// Units that can be sold for an optional size.
    ///
    /// Returns `None` when the product has sizes and `size` is missing or
    /// unknown.
    #[must_use]
    pub fn available(&self, size: Option<&str>) -> Option<i32> {
        if self.out_of_stock || !self.is_active {
            return Some(0);
        }
        if !self.has_sizes() {
            return Some(self.stock);
        }
        let size = size?;
        self.sizes.iter().find(|s| s.size == size).map(|s| s.stock)
    }
}

/// Create/update body for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    /// Stock for products without sizes. Ignored when `sizes` is non-empty.
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

const fn default_true() -> bool {
    true
}

impl ProductInput {
    /// Validate and normalize the input in place.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn normalize(&mut self) -> Result<(), String> {
        self.name = self.name.trim().to_owned();
        self.category = self.category.trim().to_lowercase();
        if self.name.is_empty() {
            return Err("name is required".to_owned());
        }
        if self.category.is_empty() {
            return Err("category is required".to_owned());
        }
        if self.price < Decimal::ZERO {
            return Err("price must not be negative".to_owned());
        }
        if let Some(compare) = self.compare_at_price
            && compare < self.price
        {
            return Err("compare-at price must be at least the price".to_owned());
        }
        if self.stock < 0 || self.sizes.iter().any(|s| s.stock < 0) {
            return Err("stock must not be negative".to_owned());
        }

        let slug = self
            .slug
            .as_deref()
            .map_or_else(|| slugify(&self.name), slugify);
        if slug.is_empty() {
            return Err("slug must contain letters or digits".to_owned());
        }
        self.slug = Some(slug);

        for size in &mut self.sizes {
            size.size = size.size.trim().to_owned();
        }
        self.sizes.retain(|s| !s.size.is_empty());
        self.colors = self
            .colors
            .iter()
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(())
    }

    /// Aggregate stock implied by the input.
    #[must_use]
    pub fn total_stock(&self) -> i32 {
        if self.sizes.is_empty() {
            self.stock
        } else {
            stride_core::inventory::aggregate(&self.sizes)
        }
    }
}

/// URL slug: lowercase ASCII letters and digits separated by single dashes.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_owned()
}

/// Sort order for the public listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// `ORDER BY` clause; values are fixed strings, never user input.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id",
            Self::PriceDesc => "p.price DESC, p.id",
            Self::Name => "p.name ASC, p.id",
        }
    }
}

/// Listing filters, shared by the storefront and admin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    /// Admin only; the storefront always lists active products.
    pub include_inactive: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Product page payload: product, approved reviews and rating.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub rating: RatingSummary,
    pub reviews: Vec<Review>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "  Court Runner ".to_owned(),
            slug: None,
            description: String::new(),
            category: " Sneakers".to_owned(),
            price: Decimal::from(2499),
            compare_at_price: Some(Decimal::from(2999)),
            stock: 0,
            sizes: vec![
                SizeStock {
                    size: " 8 ".to_owned(),
                    stock: 4,
                },
                SizeStock {
                    size: "9".to_owned(),
                    stock: 6,
                },
            ],
            colors: vec!["White".to_owned(), " ".to_owned()],
            images: vec![],
            is_active: true,
            is_featured: false,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Court Runner 2.0"), "court-runner-2-0");
        assert_eq!(slugify("  --Trail  & Hike-- "), "trail-hike");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_normalize_fills_slug_and_trims() {
        let mut input = input();
        input.normalize().unwrap();
        assert_eq!(input.name, "Court Runner");
        assert_eq!(input.category, "sneakers");
        assert_eq!(input.slug.as_deref(), Some("court-runner"));
        assert_eq!(input.sizes[0].size, "8");
        assert_eq!(input.colors, vec!["White"]);
        assert_eq!(input.total_stock(), 10);
    }

    #[test]
    fn test_normalize_rejects_compare_below_price() {
        let mut input = ProductInput {
            compare_at_price: Some(Decimal::from(1000)),
            ..input()
        };
        assert!(input.normalize().is_err());
    }

    #[test]
    fn test_available_by_size() {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(1),
            name: "Court Runner".to_owned(),
            slug: "court-runner".to_owned(),
            description: String::new(),
            category: "sneakers".to_owned(),
            price: Decimal::from(2499),
            compare_at_price: None,
            stock: 10,
            sizes: input().sizes,
            colors: vec![],
            images: vec![],
            is_active: true,
            is_featured: false,
            out_of_stock: false,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(product.available(Some("9")), Some(6));
        assert_eq!(product.available(Some("12")), None);
        assert_eq!(product.available(None), None);

        let hidden = Product {
            out_of_stock: true,
            ..product
        };
        assert_eq!(hidden.available(Some("9")), Some(0));
    }
}
