//! End-to-end: scripted GraphQL transport → page fetcher → crawl driver →
//! persistence sink → in-memory store.

use std::sync::Arc;

use serde_json::{json, Value};

use starscan_core::config::{CrawlConfig, RetryConfig};
use starscan_core::Cursor;
use starscan_crawl::{CrawlState, Crawler};
use starscan_github::transport::mock::ScriptedTransport;
use starscan_github::QueryExecutor;
use starscan_store::{MemoryStore, RepositoryStore};

fn node(id: &str, name: &str, stars: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "owner": {"login": "octo"},
        "nameWithOwner": format!("octo/{name}"),
        "stargazerCount": stars,
        "url": format!("https://github.com/octo/{name}"),
        "description": "a repository",
        "primaryLanguage": {"name": "Rust"},
        "createdAt": "2019-01-01T00:00:00Z",
        "updatedAt": "2024-05-01T00:00:00Z"
    })
}

fn search_page(nodes: Vec<Value>, has_next: bool, end: Option<&str>) -> Value {
    json!({"data": {
        "search": {
            "repositoryCount": 2,
            "pageInfo": {"hasNextPage": has_next, "endCursor": end},
            "nodes": nodes
        },
        "rateLimit": {"limit": 5000, "cost": 1, "remaining": 4990, "resetAt": "2024-06-01T09:00:00Z"}
    }})
}

fn viewer() -> Value {
    json!({"data": {
        "viewer": {"login": "octocat"},
        "rateLimit": {"limit": 5000, "cost": 1, "remaining": 4999, "resetAt": "2024-06-01T09:00:00Z"}
    }})
}

fn crawler(transport: &Arc<ScriptedTransport>, store: &Arc<MemoryStore>) -> Crawler {
    let executor = QueryExecutor::new(transport.clone(), RetryConfig::default());
    let settings = CrawlConfig {
        page_delay_ms: 0,
        ..CrawlConfig::default()
    };
    Crawler::new(executor, store.clone(), settings)
}

fn script_two_pages(transport: &ScriptedTransport) {
    transport.push_ok(viewer());
    transport.push_ok(search_page(
        vec![node("1", "alpha", 500), node("2", "beta", 300)],
        true,
        Some("c1"),
    ));
    transport.push_ok(search_page(vec![node("1", "alpha", 550)], false, None));
}

#[tokio::test]
async fn updated_star_count_wins_and_rows_are_not_duplicated() {
    let transport = Arc::new(ScriptedTransport::new());
    script_two_pages(&transport);
    let store = Arc::new(MemoryStore::new());

    let report = crawler(&transport, &store).crawl(1000, 100).await.unwrap();

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.processed_count, 3);
    assert_eq!(report.saved_count, 3);
    assert_eq!(report.pages, 2);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(store.get("1").await.unwrap().unwrap().stargazers_count, 550);
    assert_eq!(store.get("2").await.unwrap().unwrap().stargazers_count, 300);

    // viewer probe, first page, then the page after "c1"
    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].variables["cursor"], Value::Null);
    assert_eq!(requests[2].variables["cursor"], json!("c1"));
    assert_eq!(requests[1].variables["searchQuery"], json!("stars:>100 sort:stars-desc"));
}

#[tokio::test]
async fn repeated_crawls_are_idempotent() {
    let store = Arc::new(MemoryStore::new());

    let transport = Arc::new(ScriptedTransport::new());
    script_two_pages(&transport);
    crawler(&transport, &store).crawl(1000, 100).await.unwrap();
    let first = store.rows();

    let transport = Arc::new(ScriptedTransport::new());
    script_two_pages(&transport);
    crawler(&transport, &store).crawl(1000, 100).await.unwrap();
    let second = store.rows();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    for (before, after) in first.iter().zip(&second) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.created_at, after.created_at);
        assert!(after.crawled_at > before.crawled_at);
    }
}

#[tokio::test]
async fn last_page_ends_crawl_regardless_of_budget() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_ok(viewer());
    transport.push_ok(search_page(vec![node("1", "alpha", 500)], false, Some("c1")));
    let store = Arc::new(MemoryStore::new());

    let report = crawler(&transport, &store).crawl(1000, 100).await.unwrap();

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages, 1);
    assert_eq!(transport.remaining(), 0);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn page_of_undecodable_items_stalls_the_crawl() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_ok(viewer());
    let mut broken = node("1", "alpha", 500);
    broken["owner"] = json!({"login": null});
    transport.push_ok(search_page(vec![broken, json!({})], true, Some("c1")));
    transport.push_ok(search_page(vec![node("2", "beta", 300)], false, None));
    let store = Arc::new(MemoryStore::new());

    let report = crawler(&transport, &store).crawl(1000, 100).await.unwrap();

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.processed_count, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.last_cursor, Some(Cursor::new("c1")));
    assert_eq!(store.count().await.unwrap(), 0);
    // The page after the stall is never requested.
    assert_eq!(transport.remaining(), 1);
}

#[tokio::test]
async fn rejected_page_query_fails_the_crawl() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_ok(viewer());
    transport.push_ok(search_page(vec![node("1", "alpha", 500)], true, Some("c1")));
    transport.push_ok(json!({
        "data": null,
        "errors": [{"message": "Something went wrong while executing your query."}]
    }));
    let store = Arc::new(MemoryStore::new());

    let report = crawler(&transport, &store).crawl(1000, 100).await.unwrap();

    assert_eq!(report.state, CrawlState::Failed);
    assert_eq!(report.processed_count, 1);
    assert!(report.failure.is_some());
    assert_eq!(store.count().await.unwrap(), 1);
}
