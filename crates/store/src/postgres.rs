//! PostgreSQL implementation of [`RepositoryStore`].
//!
//! Every upsert is a single auto-committed statement, so a crash mid-page
//! leaves each record either fully written or untouched.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{error, info};

use starscan_core::config::DatabaseConfig;
use starscan_core::Repository;

use crate::error::StoreError;
use crate::traits::{RepositoryStore, StoredRepository, UpsertOutcome};

/// `xmax = 0` holds only for a row created by this statement.
const UPSERT_SQL: &str = "
INSERT INTO repositories
    (id, name, owner, name_with_owner, stargazers_count, url, description,
     primary_language, created_at, updated_at, crawled_at, last_updated)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now())
ON CONFLICT (id) DO UPDATE SET
    stargazers_count = EXCLUDED.stargazers_count,
    description = EXCLUDED.description,
    primary_language = EXCLUDED.primary_language,
    updated_at = GREATEST(repositories.updated_at, EXCLUDED.updated_at),
    crawled_at = GREATEST(EXCLUDED.crawled_at, repositories.crawled_at + interval '1 microsecond'),
    last_updated = now()
RETURNING (xmax = 0) AS inserted";

#[derive(Clone)]
pub struct PgRepositoryStore {
    pool: PgPool,
}

impl PgRepositoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool for the configured database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(connect_options(config))
            .await?;
        info!(host = %config.host, database = %config.database, "PostgreSQL connected");
        Ok(Self { pool })
    }

    /// Apply the bundled `repositories` schema.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied successfully");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl RepositoryStore for PgRepositoryStore {
    async fn upsert(&self, repo: &Repository) -> Result<UpsertOutcome, StoreError> {
        let inserted: bool = sqlx::query_scalar(UPSERT_SQL)
            .bind(repo.id())
            .bind(repo.name())
            .bind(repo.owner())
            .bind(repo.name_with_owner())
            .bind(i64::from(repo.stargazer_count()))
            .bind(repo.url())
            .bind(repo.description())
            .bind(repo.primary_language())
            .bind(repo.created_at())
            .bind(repo.updated_at())
            .bind(repo.crawled_at())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, repo))?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repositories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRepository>, StoreError> {
        let row = sqlx::query_as::<_, StoredRepository>(
            "SELECT id, name, owner, name_with_owner, stargazers_count, url,
                    description, primary_language, created_at, updated_at, crawled_at
             FROM repositories
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Connection parameters passed field by field, so credentials never go
/// through URL parsing.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.database);
    match config.password.as_deref() {
        Some(password) => options.password(password),
        None => options,
    }
}

/// Map a unique violation (23505) on `name_with_owner` to `NameConflict`.
///
/// The primary key never conflicts here since `ON CONFLICT (id)` absorbs it.
fn map_unique_violation(e: sqlx::Error, repo: &Repository) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::NameConflict {
                id: repo.id().to_string(),
                name_with_owner: repo.name_with_owner().to_string(),
            };
        }
    }
    error!(id = %repo.id(), "repository upsert database error: {}", e);
    StoreError::Database(e)
}
