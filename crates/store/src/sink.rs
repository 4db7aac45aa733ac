//! Persistence sink: writes one decoded page into a [`RepositoryStore`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use starscan_core::Repository;

use crate::traits::{RepositoryStore, UpsertOutcome};

/// Upserts pages of repositories, a bounded number of records at a time.
///
/// A failed record is logged and left out of the saved count. It never
/// aborts the rest of the page.
#[derive(Clone)]
pub struct PersistenceSink {
    store: Arc<dyn RepositoryStore>,
    concurrency: usize,
}

impl PersistenceSink {
    pub fn new(store: Arc<dyn RepositoryStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn RepositoryStore> {
        &self.store
    }

    /// Upsert every record of a page. Returns how many were written.
    pub async fn upsert_page(&self, records: Vec<Repository>) -> usize {
        if records.is_empty() {
            return 0;
        }
        let total = records.len();

        let outcomes: Vec<Option<UpsertOutcome>> = stream::iter(records)
            .map(|repo| {
                let store = Arc::clone(&self.store);
                async move {
                    match store.upsert(&repo).await {
                        Ok(outcome) => Some(outcome),
                        Err(e) => {
                            warn!(
                                id = %repo.id(),
                                name_with_owner = %repo.name_with_owner(),
                                error = %e,
                                "Failed to persist repository"
                            );
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let inserted = outcomes
            .iter()
            .filter(|o| matches!(o, Some(UpsertOutcome::Inserted)))
            .count();
        let saved = outcomes.iter().filter(|o| o.is_some()).count();

        debug!(total, saved, inserted, updated = saved - inserted, "Page persisted");
        saved
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use starscan_core::RepositoryFields;

    use super::*;
    use crate::memory::MemoryStore;

    fn repo(id: &str, name: &str, stars: u32) -> Repository {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        Repository::new(RepositoryFields {
            id: id.into(),
            name: name.into(),
            owner: "octo".into(),
            name_with_owner: format!("octo/{name}"),
            stargazer_count: stars,
            url: format!("https://github.com/octo/{name}"),
            description: None,
            primary_language: Some("Rust".into()),
            created_at: now,
            updated_at: now,
            crawled_at: now,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn empty_page_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let sink = PersistenceSink::new(store.clone(), 4);
        assert_eq!(sink.upsert_page(Vec::new()).await, 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn saves_every_record_of_a_page() {
        let store = Arc::new(MemoryStore::new());
        let sink = PersistenceSink::new(store.clone(), 2);
        let page = vec![repo("1", "a", 10), repo("2", "b", 20), repo("3", "c", 30)];
        assert_eq!(sink.upsert_page(page).await, 3);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn failed_record_does_not_abort_the_page() {
        let store = Arc::new(MemoryStore::new());
        store.fail_on("2");
        let sink = PersistenceSink::new(store.clone(), 4);
        let page = vec![repo("1", "a", 10), repo("2", "b", 20), repo("3", "c", 30)];
        assert_eq!(sink.upsert_page(page).await, 2);

        let ids: Vec<String> = store.rows().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1".to_string(), "3".to_string()]);
    }

    #[tokio::test]
    async fn repeated_page_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let sink = PersistenceSink::new(store.clone(), 1);
        let page = vec![repo("1", "a", 10), repo("2", "b", 20)];
        assert_eq!(sink.upsert_page(page.clone()).await, 2);
        assert_eq!(sink.upsert_page(page).await, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn zero_concurrency_still_writes() {
        let store = Arc::new(MemoryStore::new());
        let sink = PersistenceSink::new(store.clone(), 0);
        assert_eq!(sink.upsert_page(vec![repo("1", "a", 1)]).await, 1);
    }
}
