//! Catalog seeding from YAML.
//!
//! ```yaml
//! products:
//!   - name: Trail Runner
//!     category: running
//!     price: 4499
//!     sizes: [{ size: "8", stock: 12 }, { size: "9", stock: 10 }]
//!     colors: [Black, Olive]
//! filters:
//!   - name: Size
//!     kind: size
//!     options: ["6", "7", "8", "9", "10"]
//! banners:
//!   - title: Monsoon Sale
//!     image_url: https://cdn.stride.shoes/banners/monsoon.jpg
//! ```
//!
//! Entries that already exist (product slug, filter name, banner title) are
//! skipped, so a file can be applied more than once.

use std::collections::HashSet;

use serde::Deserialize;

use stride_core::{Email, UserId};
use stride_server::config::ServerConfig;
use stride_server::db::{RepositoryError, UserRepository};
use stride_server::error::AppError;
use stride_server::models::banner::BannerInput;
use stride_server::models::filter::FilterInput;
use stride_server::models::product::ProductInput;
use stride_server::services::catalog::CatalogService;
use stride_server::services::content::ContentService;
use stride_server::state::AppState;

use super::CommandError;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<ProductInput>,
    #[serde(default)]
    pub filters: Vec<FilterInput>,
    #[serde(default)]
    pub banners: Vec<BannerInput>,
}

#[derive(Debug, Default)]
struct Tally {
    inserted: usize,
    skipped: usize,
}

fn parse(content: &str) -> Result<CatalogFile, CommandError> {
    Ok(serde_yaml::from_str(content)?)
}

async fn staff_actor(state: &AppState, email: &str) -> Result<UserId, CommandError> {
    let address = Email::parse(email).map_err(|_| CommandError::UnknownUser(email.to_owned()))?;
    UserRepository::new(state.pool())
        .get_by_email(&address)
        .await?
        .filter(|u| u.role.is_staff())
        .map(|u| u.id)
        .ok_or_else(|| CommandError::UnknownUser(email.to_owned()))
}

async fn seed_products(
    state: &AppState,
    products: Vec<ProductInput>,
    actor: UserId,
) -> Result<Tally, CommandError> {
    let catalog = CatalogService::new(state.pool());
    let mut tally = Tally::default();
    for product in products {
        let name = product.name.clone();
        match catalog.create(product, actor).await {
            Ok(_) => tally.inserted += 1,
            Err(AppError::Database(RepositoryError::Conflict(_))) => {
                tracing::info!(%name, "Product exists, skipped");
                tally.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(tally)
}

async fn seed_filters(state: &AppState, filters: Vec<FilterInput>) -> Result<Tally, CommandError> {
    let content = ContentService::new(state);
    let existing: HashSet<String> = content
        .filters()
        .await?
        .into_iter()
        .map(|f| f.name.to_lowercase())
        .collect();

    let mut tally = Tally::default();
    for filter in filters {
        if existing.contains(&filter.name.trim().to_lowercase()) {
            tally.skipped += 1;
            continue;
        }
        content.create_filter(filter).await?;
        tally.inserted += 1;
    }
    Ok(tally)
}

async fn seed_banners(state: &AppState, banners: Vec<BannerInput>) -> Result<Tally, CommandError> {
    let content = ContentService::new(state);
    let existing: HashSet<String> = content
        .banners()
        .await?
        .into_iter()
        .map(|b| b.title.to_lowercase())
        .collect();

    let mut tally = Tally::default();
    for banner in banners {
        if existing.contains(&banner.title.trim().to_lowercase()) {
            tally.skipped += 1;
            continue;
        }
        content.create_banner(banner).await?;
        tally.inserted += 1;
    }
    Ok(tally)
}

/// Load products, filters and banners from `file_path`. Initial stock is
/// ledgered against the staff account `actor_email`.
pub async fn catalog(file_path: &str, actor_email: &str) -> Result<(), CommandError> {
    // Parse before touching the database
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CommandError::Read {
            path: file_path.to_owned(),
            source,
        })?;
    let file = parse(&content)?;
    tracing::info!(
        products = file.products.len(),
        filters = file.filters.len(),
        banners = file.banners.len(),
        "Parsed catalog file"
    );

    let config = ServerConfig::from_env()?;
    let pool = stride_server::db::create_pool(&config.database_url).await?;
    let state = AppState::new(config, pool)?;
    let actor = staff_actor(&state, actor_email).await?;

    let products = seed_products(&state, file.products, actor).await?;
    let filters = seed_filters(&state, file.filters).await?;
    let banners = seed_banners(&state, file.banners).await?;

    tracing::info!("Seeding complete");
    tracing::info!("  Products: {} inserted, {} skipped", products.inserted, products.skipped);
    tracing::info!("  Filters:  {} inserted, {} skipped", filters.inserted, filters.skipped);
    tracing::info!("  Banners:  {} inserted, {} skipped", banners.inserted, banners.skipped);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
products:
  - name: Trail Runner
    category: running
    price: 4499
    compare_at_price: 4999
    sizes:
      - { size: "8", stock: 12 }
      - { size: "9", stock: 10 }
    colors: [Black, Olive]
  - name: Canvas Slip-On
    category: casual
    price: "1299.50"
    stock: 40
filters:
  - name: Size
    kind: size
    options: ["6", "7", "8", "9", "10"]
banners:
  - title: Monsoon Sale
    image_url: https://cdn.stride.shoes/banners/monsoon.jpg
    position: 1
"#;

    #[test]
    fn test_parse_catalog_file() {
        let file = parse(SAMPLE).unwrap();
        assert_eq!(file.products.len(), 2);
        assert_eq!(file.products[0].sizes.len(), 2);
        assert!(file.products[0].is_active);
        assert_eq!(file.products[1].stock, 40);
        assert_eq!(file.products[1].price.to_string(), "1299.50");
        assert_eq!(file.filters[0].options.len(), 5);
        assert!(file.banners[0].is_active);
    }

    #[test]
    fn test_sections_are_optional() {
        let file = parse("products: []\n").unwrap();
        assert!(file.products.is_empty());
        assert!(file.filters.is_empty());
        assert!(file.banners.is_empty());
    }

    #[test]
    fn test_product_requires_price() {
        assert!(parse("products:\n  - name: X\n    category: y\n").is_err());
    }
}
