//! In-process [`RepositoryStore`] with the same upsert semantics as the
//! PostgreSQL store. Used by tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use starscan_core::Repository;

use crate::error::StoreError;
use crate::traits::{advance_crawled_at, RepositoryStore, StoredRepository, UpsertOutcome};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, StoredRepository>>,
    /// Ids whose upsert fails, to exercise partial-page handling.
    failing_ids: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future upsert of `id` fail.
    pub fn fail_on(&self, id: &str) {
        self.lock_failing().insert(id.to_string());
    }

    /// All rows, sorted by id.
    pub fn rows(&self) -> Vec<StoredRepository> {
        let mut rows: Vec<_> = self.lock_rows().values().cloned().collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredRepository>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.failing_ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl RepositoryStore for MemoryStore {
    async fn upsert(&self, repo: &Repository) -> Result<UpsertOutcome, StoreError> {
        if self.lock_failing().contains(repo.id()) {
            return Err(StoreError::Other(format!("injected failure for {}", repo.id())));
        }

        let mut rows = self.lock_rows();

        let name_taken = rows
            .values()
            .any(|row| row.name_with_owner == repo.name_with_owner() && row.id != repo.id());
        if name_taken {
            return Err(StoreError::NameConflict {
                id: repo.id().to_string(),
                name_with_owner: repo.name_with_owner().to_string(),
            });
        }

        match rows.get_mut(repo.id()) {
            Some(row) => {
                row.stargazers_count = i64::from(repo.stargazer_count());
                row.description = repo.description().map(str::to_string);
                row.primary_language = repo.primary_language().map(str::to_string);
                row.updated_at = row.updated_at.max(repo.updated_at());
                row.crawled_at = advance_crawled_at(row.crawled_at, repo.crawled_at());
                Ok(UpsertOutcome::Updated)
            }
            None => {
                rows.insert(repo.id().to_string(), StoredRepository::from(repo));
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.lock_rows().len() as u64)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRepository>, StoreError> {
        Ok(self.lock_rows().get(id).cloned())
    }
}
