//! Product and per-size stock repository.
//!
//! Stock columns are only changed through the `*_stock` functions, which take
//! a connection so callers can pair every change with a ledger entry in the
//! same transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use stride_core::ProductId;
use stride_core::inventory::SizeStock;

use super::{Page, Pagination, RepositoryError, like_pattern};
use crate::models::inventory::InventoryQuery;
use crate::models::product::{Product, ProductInput, ProductQuery};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    category: String,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    stock: i32,
    colors: Vec<String>,
    images: Vec<String>,
    is_active: bool,
    is_featured: bool,
    out_of_stock: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, sizes: Vec<SizeStock>) -> Product {
        Product {
            id: ProductId::new(self.id),
            name: self.name,
            slug: self.slug,
            description: self.description,
            category: self.category,
            price: self.price,
            compare_at_price: self.compare_at_price,
            stock: self.stock,
            sizes,
            colors: self.colors,
            images: self.images,
            is_active: self.is_active,
            is_featured: self.is_featured,
            out_of_stock: self.out_of_stock,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SizeRow {
    product_id: i32,
    size: String,
    stock: i32,
}

const COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.category, p.price, \
     p.compare_at_price, p.stock, p.colors, p.images, p.is_active, p.is_featured, \
     p.out_of_stock, p.created_at, p.updated_at";

/// Numeric sizes sort by value, anything else after them alphabetically.
const SIZE_ORDER: &str =
    "(CASE WHEN size ~ '^[0-9]+(\\.[0-9]+)?$' THEN size::numeric END) NULLS LAST, size";

fn push_listing_filters<'q>(qb: &mut QueryBuilder<'q, Postgres>, query: &ProductQuery, public: bool) {
    if public || !query.include_inactive.unwrap_or(false) {
        qb.push(" AND p.is_active");
    }
    if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        qb.push(" AND p.category = ").push_bind(category.to_lowercase());
    }
    if let Some(size) = query.size.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(
            " AND EXISTS (SELECT 1 FROM product_sizes s \
             WHERE s.product_id = p.id AND s.stock > 0 AND s.size = ",
        )
        .push_bind(size.to_owned())
        .push(")");
    }
    if let Some(color) = query.color.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        qb.push(" AND EXISTS (SELECT 1 FROM unnest(p.colors) c WHERE lower(c) = lower(")
            .push_bind(color.to_owned())
            .push("))");
    }
    if let Some(min) = query.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(featured) = query.featured {
        qb.push(" AND p.is_featured = ").push_bind(featured);
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.category ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_inventory_filters<'q>(
    qb: &mut QueryBuilder<'q, Postgres>,
    query: &InventoryQuery,
    low_threshold: i32,
) {
    if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        qb.push(" AND p.category = ").push_bind(category.to_lowercase());
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.slug ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if query.low_only {
        qb.push(" AND (p.out_of_stock OR p.stock <= ")
            .push_bind(low_threshold)
            .push(
                " OR EXISTS (SELECT 1 FROM product_sizes s \
                 WHERE s.product_id = p.id AND s.stock <= ",
            )
            .push_bind(low_threshold)
            .push("))");
    }
}

/// Repository for the catalog.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn load_sizes(
        conn: &mut PgConnection,
        rows: Vec<ProductRow>,
    ) -> Result<Vec<Product>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let sizes = sqlx::query_as::<_, SizeRow>(&format!(
            "SELECT product_id, size, stock FROM product_sizes
             WHERE product_id = ANY($1) ORDER BY product_id, {SIZE_ORDER}"
        ))
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let own = sizes
                    .iter()
                    .filter(|s| s.product_id == row.id)
                    .map(|s| SizeStock {
                        size: s.size.clone(),
                        stock: s.stock,
                    })
                    .collect();
                row.into_product(own)
            })
            .collect())
    }

    /// List products for the storefront (`public`) or the admin table.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: &ProductQuery,
        pagination: Pagination,
        public: bool,
    ) -> Result<Page<Product>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p WHERE TRUE");
        push_listing_filters(&mut count, query, public);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM products p WHERE TRUE"));
        push_listing_filters(&mut qb, query, public);
        qb.push(" ORDER BY ")
            .push(query.sort.order_by())
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let mut conn = self.pool.acquire().await?;
        let rows: Vec<ProductRow> = qb.build_query_as::<ProductRow>().fetch_all(&mut *conn).await?;
        let items = Self::load_sizes(&mut conn, rows).await?;
        Ok(Page::new(items, total, pagination))
    }

    /// List products for the inventory screen, all states included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_inventory(
        &self,
        query: &InventoryQuery,
        low_threshold: i32,
        pagination: Pagination,
    ) -> Result<Page<Product>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p WHERE TRUE");
        push_inventory_filters(&mut count, query, low_threshold);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM products p WHERE TRUE"));
        push_inventory_filters(&mut qb, query, low_threshold);
        qb.push(" ORDER BY p.stock ASC, p.name ASC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let mut conn = self.pool.acquire().await?;
        let rows: Vec<ProductRow> = qb.build_query_as::<ProductRow>().fetch_all(&mut *conn).await?;
        let items = Self::load_sizes(&mut conn, rows).await?;
        Ok(Page::new(items, total, pagination))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id, false).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(Self::load_sizes(&mut conn, row.into_iter().collect())
            .await?
            .into_iter()
            .next())
    }

    /// Load a product, optionally taking a row lock for the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        conn: &mut PgConnection,
        id: ProductId,
        for_update: bool,
    ) -> Result<Option<Product>, RepositoryError> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products p WHERE p.id = $1{lock}"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(Self::load_sizes(conn, row.into_iter().collect())
            .await?
            .into_iter()
            .next())
    }

    /// Load several products by id in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_many(
        conn: &mut PgConnection,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products p WHERE p.id = ANY($1) ORDER BY p.id"
        ))
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;
        Self::load_sizes(conn, rows).await
    }

    /// Active product categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products WHERE is_active ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Insert a product and its sizes with zero stock.
    ///
    /// Stock is set afterwards through [`Self::set_stock`] /
    /// [`Self::set_size_stock`] so the initial quantities are ledgered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &ProductInput,
    ) -> Result<ProductId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO products
                (name, slug, description, category, price, compare_at_price, colors, images,
                 is_active, is_featured)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
        )
        .bind(&input.name)
        .bind(input.slug.as_deref().unwrap_or_default())
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(&input.colors)
        .bind(&input.images)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already in use"))?;

        for size in &input.sizes {
            sqlx::query("INSERT INTO product_sizes (product_id, size, stock) VALUES ($1, $2, 0)")
                .bind(id)
                .bind(&size.size)
                .execute(&mut *conn)
                .await
                .map_err(|e| RepositoryError::unique_violation(e, "duplicate size"))?;
        }

        Ok(ProductId::new(id))
    }

    /// Update everything except stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_details(
        conn: &mut PgConnection,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products
             SET name = $2, slug = $3, description = $4, category = $5, price = $6,
                 compare_at_price = $7, colors = $8, images = $9, is_active = $10,
                 is_featured = $11, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.slug.as_deref().unwrap_or_default())
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(&input.colors)
        .bind(&input.images)
        .bind(input.is_active)
        .bind(input.is_featured)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already in use"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a product that has never been ordered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when orders reference the product.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::Conflict(
                        "product has orders; deactivate it instead".to_owned(),
                    )
                }
                other => RepositoryError::Database(other),
            })?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Take units from stock if enough are available.
    ///
    /// Returns the resulting stock of the size (or of the product when
    /// `size` is `None`), or `None` when stock was insufficient.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn take_stock(
        conn: &mut PgConnection,
        id: ProductId,
        size: Option<&str>,
        quantity: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        let resulting = match size {
            Some(size) => {
                let remaining: Option<i32> = sqlx::query_scalar(
                    "UPDATE product_sizes SET stock = stock - $3
                     WHERE product_id = $1 AND size = $2 AND stock >= $3
                     RETURNING stock",
                )
                .bind(id)
                .bind(size)
                .bind(quantity)
                .fetch_optional(&mut *conn)
                .await?;
                if remaining.is_some() {
                    sqlx::query(
                        "UPDATE products SET stock = stock - $2, updated_at = now() WHERE id = $1",
                    )
                    .bind(id)
                    .bind(quantity)
                    .execute(&mut *conn)
                    .await?;
                }
                remaining
            }
            None => {
                sqlx::query_scalar(
                    "UPDATE products SET stock = stock - $2, updated_at = now()
                     WHERE id = $1 AND stock >= $2
                     RETURNING stock",
                )
                .bind(id)
                .bind(quantity)
                .fetch_optional(&mut *conn)
                .await?
            }
        };
        Ok(resulting)
    }

    /// Return units to stock. Returns the resulting stock.
    ///
    /// A size that no longer exists is recreated so returned units are not
    /// lost.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn restore_stock(
        conn: &mut PgConnection,
        id: ProductId,
        size: Option<&str>,
        quantity: i32,
    ) -> Result<i32, RepositoryError> {
        let product_stock: Option<i32> = sqlx::query_scalar(
            "UPDATE products SET stock = stock + $2, updated_at = now() WHERE id = $1 RETURNING stock",
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;
        let product_stock = product_stock.ok_or(RepositoryError::NotFound)?;

        match size {
            Some(size) => {
                let size_stock: i32 = sqlx::query_scalar(
                    "INSERT INTO product_sizes (product_id, size, stock) VALUES ($1, $2, $3)
                     ON CONFLICT (product_id, size) DO UPDATE
                     SET stock = product_sizes.stock + EXCLUDED.stock
                     RETURNING stock",
                )
                .bind(id)
                .bind(size)
                .bind(quantity)
                .fetch_one(&mut *conn)
                .await?;
                Ok(size_stock)
            }
            None => Ok(product_stock),
        }
    }

    /// Set the stock of one size, creating the size if needed, and refresh
    /// the aggregate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_size_stock(
        conn: &mut PgConnection,
        id: ProductId,
        size: &str,
        stock: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_sizes (product_id, size, stock) VALUES ($1, $2, $3)
             ON CONFLICT (product_id, size) DO UPDATE SET stock = EXCLUDED.stock",
        )
        .bind(id)
        .bind(size)
        .bind(stock)
        .execute(&mut *conn)
        .await?;
        Self::sync_aggregate(conn, id).await
    }

    /// Remove sizes not in `keep`. Callers zero their stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_sizes_except(
        conn: &mut PgConnection,
        id: ProductId,
        keep: &[String],
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM product_sizes WHERE product_id = $1 AND NOT (size = ANY($2))")
            .bind(id)
            .bind(keep)
            .execute(&mut *conn)
            .await?;
        Self::sync_aggregate(conn, id).await
    }

    async fn sync_aggregate(conn: &mut PgConnection, id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE products
             SET stock = COALESCE((SELECT SUM(stock) FROM product_sizes WHERE product_id = $1), 0),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Set the aggregate stock of a product without sizes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_stock(
        conn: &mut PgConnection,
        id: ProductId,
        stock: i32,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET stock = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(stock)
                .execute(&mut *conn)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set or clear the manual out-of-stock override.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_out_of_stock(
        conn: &mut PgConnection,
        id: ProductId,
        out_of_stock: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET out_of_stock = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(out_of_stock)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
