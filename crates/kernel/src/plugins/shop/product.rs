//! Shop catalogue storage.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::models::post::slugify;
use crate::pagination::Pager;

/// Schema owned by the shop. Applied by `setup`; every statement is
/// idempotent.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS shop_product_category (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        sub_categories TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shop_product (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL DEFAULT '',
        price INTEGER NOT NULL DEFAULT 0,
        description TEXT NOT NULL DEFAULT '',
        picture TEXT NOT NULL DEFAULT '',
        more_pictures TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'pending',
        category_id INTEGER REFERENCES shop_product_category (id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_shop_product_name ON shop_product (name)",
];

/// A product row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub price: i64,
    pub description: String,
    pub picture: String,
    pub more_pictures: String,
    pub status: String,
    pub category_id: Option<i64>,
}

/// Input for a new product. Text fields are expected to be sanitized.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub price: i64,
    pub description: String,
    pub picture: String,
    pub more_pictures: String,
    pub category_id: Option<i64>,
}

/// One page of products.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pager: Pager,
}

/// Create the shop tables and the example category.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in MIGRATIONS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to apply shop migration")?;
    }

    let categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop_product_category")
        .fetch_one(pool)
        .await
        .context("failed to count shop categories")?;

    if categories == 0 {
        sqlx::query("INSERT INTO shop_product_category (name) VALUES ('Category 1')")
            .execute(pool)
            .await
            .context("failed to seed shop category")?;
        tracing::info!("seeded default shop category");
    }

    Ok(())
}

/// `LIKE` pattern matching `term` anywhere, with wildcards in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Count products whose name contains `search` (all products when empty).
pub async fn count(pool: &SqlitePool, search: &str) -> Result<u64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM shop_product WHERE name LIKE ? ESCAPE '\\'",
    )
    .bind(contains_pattern(search))
    .fetch_one(pool)
    .await
    .context("failed to count products")?;

    Ok(u64::try_from(total).unwrap_or(0))
}

/// Fetch one page of products matching `search`.
pub async fn page(
    pool: &SqlitePool,
    search: &str,
    requested_page: u32,
    per_page: u32,
) -> Result<ProductPage> {
    let total = count(pool, search).await?;
    let pager = Pager::new(requested_page, per_page, total);

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM shop_product WHERE name LIKE ? ESCAPE '\\' ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(contains_pattern(search))
    .bind(pager.limit())
    .bind(pager.offset())
    .fetch_all(pool)
    .await
    .context("failed to fetch products")?;

    Ok(ProductPage { products, pager })
}

/// Products whose name contains `search`, capped at `limit`.
pub async fn search(pool: &SqlitePool, search: &str, limit: i64) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM shop_product WHERE name LIKE ? ESCAPE '\\' ORDER BY id LIMIT ?",
    )
    .bind(contains_pattern(search))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to search products")?;

    Ok(products)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM shop_product WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch product")?;

    Ok(product)
}

/// Insert a product. A missing category falls back to the first one.
pub async fn create(pool: &SqlitePool, input: NewProduct) -> Result<Product> {
    let category_id = match input.category_id {
        Some(id) => Some(id),
        None => sqlx::query_scalar::<_, Option<i64>>("SELECT MIN(id) FROM shop_product_category")
            .fetch_one(pool)
            .await
            .context("failed to look up default category")?,
    };

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO shop_product (name, slug, price, description, picture, more_pictures, category_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(slugify(&input.name))
    .bind(input.price)
    .bind(&input.description)
    .bind(&input.picture)
    .bind(&input.more_pictures)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .context("failed to create product")?;

    Ok(product)
}
