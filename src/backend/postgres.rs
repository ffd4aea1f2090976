use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, Row};

use crate::backend::SqlBackend;
use crate::error::BackendError;

/// Warehouse backend over a PostgreSQL connection pool.
pub struct PostgresBackend {
    pub pool: Pool<Postgres>,
}

impl PostgresBackend {
    pub async fn new(database_url: &str) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool, e.g. one shared with other components.
    pub fn with_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    async fn execute(&self, statement: &str) -> Result<u64, BackendError> {
        let done = sqlx::query(statement).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn fetch_scalar(&self, statement: &str) -> Result<Option<i64>, BackendError> {
        let row = sqlx::query(statement).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(row.try_get(0)?)),
            None => Ok(None),
        }
    }
}
