//! # Product Repository
//!
//! Registry of stocked products.
//!
//! ## Key Operations
//! - Create / insert with a unique display name
//! - Lookup by id or name
//! - Active product listing, counting (seed uses it to skip re-seeding)
//!
//! Stage records reference products by id. A record naming an unknown
//! product fails the foreign key and the whole operation writes nothing.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use shiftbook_core::{Product, Quantity};

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, name, category, brand, volume_ml, unit, is_active, created_at";

/// Fields a caller supplies for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub category: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub volume_ml: Option<Quantity>,
    pub unit: &'a str,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_id("uuid-here").await?;
/// let whisky = repo.get_by_name("Johnnie Walker Black 750ml").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Registers a product under a generated id.
    pub async fn create(&self, new: NewProduct<'_>) -> DbResult<Product> {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.to_string(),
            category: new.category.map(str::to_string),
            brand: new.brand.map(str::to_string),
            volume_ml: new.volume_ml,
            unit: new.unit.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.insert(&product).await?;
        Ok(product)
    }

    /// Inserts a product as given.
    ///
    /// ## Errors
    /// `UniqueViolation` if the id or name is taken.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        );
        sqlx::query(&sql)
            .bind(&product.id)
            .bind(&product.name)
            .bind(&product.category)
            .bind(&product.brand)
            .bind(product.volume_ml)
            .bind(&product.unit)
            .bind(product.is_active)
            .bind(product.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => {
                    DbError::duplicate(field, product.name.as_str())
                }
                other => other,
            })?;
        Ok(())
    }

    /// Gets a product by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Gets a product by its exact display name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Lists active products, optionally within one category.
    pub async fn list_active(&self, category: Option<&str>) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND (?1 IS NULL OR category = ?1) \
             ORDER BY name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed active products");
        Ok(products)
    }

    /// Marks a product inactive. Past stage records keep referencing it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
