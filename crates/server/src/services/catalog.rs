//! Catalog service: product pages and admin product management.

use sqlx::PgPool;
use tracing::instrument;

use stride_core::{ProductId, UserId};

use crate::db::{Page, Pagination, ProductRepository, RepositoryError, ReviewRepository};
use crate::error::{AppError, Result};
use crate::models::product::{Product, ProductDetail, ProductInput, ProductQuery};
use crate::models::review::RatingSummary;
use crate::services::inventory::{
    MovementContext, apply_size_targets, apply_stock_target, replace_sizes,
};

/// Approved reviews shown on a product page.
const PRODUCT_PAGE_REVIEWS: i64 = 20;

const INITIAL_STOCK_NOTE: &str = "initial stock";
const PRODUCT_EDIT_NOTE: &str = "product edit";

pub struct CatalogService<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Storefront or admin listing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an inverted price range.
    pub async fn list(&self, query: &ProductQuery, public: bool) -> Result<Page<Product>> {
        if let (Some(min), Some(max)) = (query.min_price, query.max_price)
            && min > max
        {
            return Err(AppError::BadRequest(
                "min_price must not exceed max_price".to_string(),
            ));
        }
        let pagination = Pagination::new(query.page, query.per_page);
        Ok(ProductRepository::new(self.pool)
            .list(query, pagination, public)
            .await?)
    }

    /// Product page by slug. Inactive products are hidden.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if there is no active product with the slug.
    pub async fn detail(&self, slug: &str) -> Result<ProductDetail> {
        let product = ProductRepository::new(self.pool)
            .get_by_slug(slug)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let reviews = ReviewRepository::new(self.pool);
        let counts = reviews.rating_counts(product.id).await?;
        let approved = reviews
            .approved_for_product(product.id, PRODUCT_PAGE_REVIEWS)
            .await?;

        Ok(ProductDetail {
            product,
            rating: RatingSummary::from_counts(&counts),
            reviews: approved,
        })
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product> {
        ProductRepository::new(self.pool)
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Create a product; initial stock is ledgered as a manual adjustment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid input and
    /// `AppError::Database` with a conflict for a duplicate slug.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, mut input: ProductInput, actor: UserId) -> Result<Product> {
        input.normalize().map_err(AppError::BadRequest)?;

        let mut tx = self.pool.begin().await?;
        let id = ProductRepository::insert(&mut tx, &input).await?;
        let product = ProductRepository::find(&mut tx, id, true)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let ctx = MovementContext::manual(actor, Some(INITIAL_STOCK_NOTE));
        if input.sizes.is_empty() {
            apply_stock_target(&mut tx, &product, input.stock, &ctx).await?;
        } else {
            apply_size_targets(&mut tx, &product, &input.sizes, &ctx).await?;
        }

        let created = ProductRepository::find(&mut tx, id, false)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        tracing::info!(product_id = %id, slug = %created.slug, "Product created");
        Ok(created)
    }

    /// Update a product. The size list is replaced by the input's; every
    /// stock difference is ledgered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product does not exist.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        mut input: ProductInput,
        actor: UserId,
    ) -> Result<Product> {
        input.normalize().map_err(AppError::BadRequest)?;

        let mut tx = self.pool.begin().await?;
        let product = ProductRepository::find(&mut tx, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        ProductRepository::update_details(&mut tx, id, &input).await?;

        let ctx = MovementContext::manual(actor, Some(PRODUCT_EDIT_NOTE));
        match (product.has_sizes(), input.sizes.is_empty()) {
            // Switching to sizes: the unsized stock leaves first
            (false, false) => {
                apply_stock_target(&mut tx, &product, 0, &ctx).await?;
                let current = ProductRepository::find(&mut tx, id, true)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                replace_sizes(&mut tx, &current, &input.sizes, &ctx).await?;
            }
            (true, false) => replace_sizes(&mut tx, &product, &input.sizes, &ctx).await?,
            // Dropping sizes: zero them, then set the plain stock
            (true, true) => {
                replace_sizes(&mut tx, &product, &[], &ctx).await?;
                let current = ProductRepository::find(&mut tx, id, true)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                apply_stock_target(&mut tx, &current, input.stock, &ctx).await?;
            }
            (false, true) => apply_stock_target(&mut tx, &product, input.stock, &ctx).await?,
        }

        let updated = ProductRepository::find(&mut tx, id, false)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a product that was never ordered.
    ///
    /// # Errors
    ///
    /// Returns a conflict when orders reference the product.
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        ProductRepository::new(self.pool).delete(id).await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(ProductRepository::new(self.pool).categories().await?)
    }
}
