// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::store::{Collection, DocumentStore};

/// Documents live in a single JSONB table keyed by `(collection, id)`;
/// `seq` keeps insertion order.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("✅ Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: Collection, id: Uuid, body: Value) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(body))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError> {
        let body = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(body.map(|Json(v)| v))
    }

    async fn find(&self, collection: Collection, filter: &Value) -> Result<Vec<Value>, AppError> {
        let rows = sqlx::query_scalar::<_, Json<Value>>(
            r#"
            SELECT body FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY seq
            "#,
        )
        .bind(collection.as_str())
        .bind(Json(filter))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|Json(v)| v).collect())
    }

    async fn replace(&self, collection: Collection, id: Uuid, body: Value) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(body))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
