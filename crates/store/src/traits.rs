//! Storage port shared by the PostgreSQL and in-memory stores.

use chrono::{DateTime, Utc};

use starscan_core::Repository;

use crate::error::StoreError;

/// A `repositories` row as currently stored.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredRepository {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub name_with_owner: String,
    pub stargazers_count: i64,
    pub url: String,
    pub description: Option<String>,
    pub primary_language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub crawled_at: DateTime<Utc>,
}

impl From<&Repository> for StoredRepository {
    fn from(repo: &Repository) -> Self {
        Self {
            id: repo.id().to_string(),
            name: repo.name().to_string(),
            owner: repo.owner().to_string(),
            name_with_owner: repo.name_with_owner().to_string(),
            stargazers_count: i64::from(repo.stargazer_count()),
            url: repo.url().to_string(),
            description: repo.description().map(str::to_string),
            primary_language: repo.primary_language().map(str::to_string),
            created_at: repo.created_at(),
            updated_at: repo.updated_at(),
            crawled_at: repo.crawled_at(),
        }
    }
}

/// Whether an upsert created the row or refreshed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Insert-or-update keyed by repository id.
///
/// On conflict only the mutable fields change: `stargazers_count`,
/// `description`, `primary_language`, `updated_at` (never moves backwards)
/// and `crawled_at` (always moves forwards). Identity fields and
/// `created_at` keep their first-written values. Each call writes one
/// record atomically; calls for different ids may run concurrently.
#[async_trait::async_trait]
pub trait RepositoryStore: Send + Sync {
    async fn upsert(&self, repo: &Repository) -> Result<UpsertOutcome, StoreError>;

    /// Total number of stored repositories.
    async fn count(&self) -> Result<u64, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<StoredRepository>, StoreError>;
}

/// `crawled_at` for a re-observation: the new stamp, but strictly after the
/// stored one even if the local clock stepped backwards.
pub fn advance_crawled_at(stored: DateTime<Utc>, observed: DateTime<Utc>) -> DateTime<Utc> {
    let floor = stored + chrono::Duration::microseconds(1);
    observed.max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn crawled_at_moves_forward_even_with_stale_clock() {
        let stored = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(advance_crawled_at(stored, later), later);

        let earlier = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        assert!(advance_crawled_at(stored, earlier) > stored);
        assert!(advance_crawled_at(stored, stored) > stored);
    }
}
