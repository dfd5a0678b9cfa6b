//! # Bar Repository
//!
//! Registry of bars (venues). Sessions and prices reference these rows.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use shiftbook_core::Bar;

use crate::error::{DbError, DbResult};

const BAR_COLUMNS: &str = "id, name, location, is_active, created_at";

/// Repository for bar database operations.
#[derive(Debug, Clone)]
pub struct BarRepository {
    pool: SqlitePool,
}

impl BarRepository {
    /// Creates a new BarRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BarRepository { pool }
    }

    /// Registers a bar under a generated id.
    pub async fn create(&self, name: &str, location: Option<&str>) -> DbResult<Bar> {
        let bar = Bar {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            location: location.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
        };
        self.insert(&bar).await?;
        Ok(bar)
    }

    /// Inserts a bar with a caller-chosen id.
    pub async fn insert(&self, bar: &Bar) -> DbResult<()> {
        debug!(id = %bar.id, name = %bar.name, "Inserting bar");

        let sql = format!("INSERT INTO bars ({BAR_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)");
        sqlx::query(&sql)
            .bind(&bar.id)
            .bind(&bar.name)
            .bind(&bar.location)
            .bind(bar.is_active)
            .bind(bar.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, bar.id.as_str()),
                other => other,
            })?;
        Ok(())
    }

    /// Gets a bar by id.
    pub async fn get(&self, id: &str) -> DbResult<Bar> {
        let sql = format!("SELECT {BAR_COLUMNS} FROM bars WHERE id = ?1");
        sqlx::query_as::<_, Bar>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Bar", id))
    }

    /// Lists active bars by name.
    pub async fn list_active(&self) -> DbResult<Vec<Bar>> {
        let sql = format!("SELECT {BAR_COLUMNS} FROM bars WHERE is_active = 1 ORDER BY name");
        let bars = sqlx::query_as::<_, Bar>(&sql).fetch_all(&self.pool).await?;
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_get_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bars();

        let bar = repo.create("Rooftop", Some("Level 9")).await.unwrap();
        let fetched = repo.get(&bar.id).await.unwrap();
        assert_eq!(fetched.name, "Rooftop");
        assert_eq!(fetched.location.as_deref(), Some("Level 9"));

        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_bar() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.bars().get("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bar = db.bars().create("Lobby", None).await.unwrap();
        assert!(matches!(
            db.bars().insert(&bar).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }
}
