//! Creation store — durable append-only log of generation results.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::models::creation::CreationRow;

/// A creation row ready to be appended. `kind` is the creation-log type
/// string (`article`, `blog-title`, `image`, `resume-review`).
#[derive(Debug, Clone, Copy)]
pub struct NewCreation<'a> {
    pub user_id: &'a str,
    pub prompt: &'a str,
    pub content: &'a str,
    pub kind: &'a str,
    pub publish: bool,
}

/// Storage interface consumed by the pipeline: append-only insert plus a
/// read of the caller's own log. No update or delete.
#[async_trait]
pub trait CreationStore: Send + Sync {
    async fn append(&self, creation: NewCreation<'_>) -> Result<()>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CreationRow>>;
}

/// PostgreSQL-backed creation store.
#[derive(Clone)]
pub struct PgCreationStore {
    pool: PgPool,
}

impl PgCreationStore {
    /// Opens the PostgreSQL pool backing the creation log.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }
}

#[async_trait]
impl CreationStore for PgCreationStore {
    async fn append(&self, creation: NewCreation<'_>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO creations (user_id, prompt, content, type, publish)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(creation.user_id)
        .bind(creation.prompt)
        .bind(creation.content)
        .bind(creation.kind)
        .bind(creation.publish)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CreationRow>> {
        let rows = sqlx::query_as::<_, CreationRow>(
            "SELECT * FROM creations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
