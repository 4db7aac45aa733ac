//! Cursor position in, decoded page of repositories out.
//!
//! A failed query never escapes [`PageFetcher::fetch_page`]: it becomes an
//! empty page with `has_more = false` and the failure attached, so the
//! caller decides what the failure means for the crawl. Individual items
//! that fail to decode are logged and dropped; the rest of the page stands.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use starscan_core::{Cursor, Repository, RepositoryFields};

use crate::account::RateLimitStatus;
use crate::error::{DecodeSkip, QueryFailure};
use crate::executor::QueryExecutor;
use crate::queries;

/// The search API serves at most this many nodes per request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Timestamp format of `createdAt` / `updatedAt`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Repository>,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
    /// Items dropped during decoding.
    pub skipped: usize,
    /// Set when the query itself failed; the page is then empty.
    pub failure: Option<QueryFailure>,
}

impl Page {
    fn failed(failure: QueryFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }
}

// ── Wire shapes ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchData {
    search: SearchConnection,
    #[serde(rename = "rateLimit", default)]
    rate_limit: Option<RateLimitStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    #[serde(default)]
    repository_count: Option<u64>,
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    id: Option<String>,
    name: Option<String>,
    owner: Option<RawOwner>,
    name_with_owner: Option<String>,
    stargazer_count: Option<i64>,
    url: Option<String>,
    description: Option<String>,
    primary_language: Option<RawLanguage>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Deserialize)]
struct RawOwner {
    login: Option<String>,
}

#[derive(Deserialize)]
struct RawLanguage {
    name: Option<String>,
}

// ── Fetcher ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PageFetcher {
    executor: QueryExecutor,
    search_query: String,
}

impl PageFetcher {
    /// `search_query` uses the GitHub search syntax; results are sorted by
    /// descending star count unless the query names its own sort.
    pub fn new(executor: QueryExecutor, search_query: &str) -> Self {
        Self {
            executor,
            search_query: with_popularity_sort(search_query),
        }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Fetch up to `page_size` repositories after `cursor`.
    pub async fn fetch_page(&self, cursor: Option<&Cursor>, page_size: u32) -> Page {
        let first = clamp_page_size(page_size);
        let variables = json!({
            "searchQuery": self.search_query,
            "first": first,
            "cursor": cursor.map(Cursor::as_str),
        });

        let data = match self.executor.execute(queries::SEARCH_REPOSITORIES, variables).await {
            Ok(data) => data,
            Err(failure) => {
                warn!(cursor = ?cursor.map(Cursor::as_str), error = %failure, "page fetch failed");
                return Page::failed(failure);
            }
        };

        let search: SearchData = match serde_json::from_value(data) {
            Ok(search) => search,
            Err(e) => {
                let failure = QueryFailure::Unexpected {
                    status: Some(200),
                    message: format!("unexpected search payload: {e}"),
                };
                warn!(error = %failure, "page fetch failed");
                return Page::failed(failure);
            }
        };

        if let Some(rate) = &search.rate_limit {
            debug!(
                cost = rate.cost,
                remaining = rate.remaining,
                reset_at = %rate.reset_at,
                "search rate limit"
            );
        }

        let mut page = decode_nodes(&search.search.nodes);
        let (next_cursor, has_more) = continuation(&search.search.page_info);
        page.next_cursor = next_cursor;
        page.has_more = has_more;

        info!(
            decoded = page.records.len(),
            skipped = page.skipped,
            has_more = page.has_more,
            total = ?search.search.repository_count,
            "fetched search page"
        );
        page
    }
}

fn with_popularity_sort(query: &str) -> String {
    let query = query.trim();
    if query.contains("sort:") {
        query.to_string()
    } else {
        format!("{query} sort:stars-desc").trim_start().to_string()
    }
}

fn clamp_page_size(page_size: u32) -> u32 {
    if page_size > MAX_PAGE_SIZE {
        warn!(requested = page_size, max = MAX_PAGE_SIZE, "page size clamped");
    }
    page_size.clamp(1, MAX_PAGE_SIZE)
}

/// Next cursor and has-more flag, taken from the remote page info.
///
/// A page claiming more results without an end cursor cannot be continued,
/// so it is treated as the last one.
fn continuation(info: &PageInfo) -> (Option<Cursor>, bool) {
    match (info.has_next_page, info.end_cursor.as_deref()) {
        (true, Some(end)) if !end.is_empty() => (Some(Cursor::new(end)), true),
        (true, _) => {
            warn!("remote reports more pages but no end cursor; treating as last page");
            (None, false)
        }
        (false, _) => (None, false),
    }
}

fn decode_nodes(nodes: &[serde_json::Value]) -> Page {
    let mut page = Page::default();
    for node in nodes {
        match decode_node(node, Utc::now()) {
            Ok(repo) => page.records.push(repo),
            Err(reason) => {
                page.skipped += 1;
                warn!(
                    id = ?node.get("id").and_then(|v| v.as_str()),
                    name_with_owner = ?node.get("nameWithOwner").and_then(|v| v.as_str()),
                    reason = %reason,
                    "skipping undecodable repository"
                );
            }
        }
    }
    page
}

/// Decode one search node, stamping it with `crawled_at`.
pub fn decode_node(
    node: &serde_json::Value,
    crawled_at: DateTime<Utc>,
) -> Result<Repository, DecodeSkip> {
    let raw: RawRepository =
        serde_json::from_value(node.clone()).map_err(|e| DecodeSkip::Malformed(e.to_string()))?;

    let id = raw.id.ok_or(DecodeSkip::MissingField("id"))?;
    let name = raw.name.ok_or(DecodeSkip::MissingField("name"))?;
    let owner = raw
        .owner
        .and_then(|o| o.login)
        .ok_or(DecodeSkip::MissingField("owner.login"))?;
    let name_with_owner = raw
        .name_with_owner
        .ok_or(DecodeSkip::MissingField("nameWithOwner"))?;
    let stars = raw
        .stargazer_count
        .ok_or(DecodeSkip::MissingField("stargazerCount"))?;
    let stargazer_count = u32::try_from(stars).map_err(|_| DecodeSkip::NegativeStars(stars))?;
    let url = raw.url.ok_or(DecodeSkip::MissingField("url"))?;
    let created_at = parse_timestamp("createdAt", raw.created_at)?;
    let updated_at = parse_timestamp("updatedAt", raw.updated_at)?;

    Ok(Repository::new(RepositoryFields {
        id,
        name,
        owner,
        name_with_owner,
        stargazer_count,
        url,
        description: raw.description,
        primary_language: raw.primary_language.and_then(|l| l.name),
        created_at,
        updated_at,
        crawled_at,
    })?)
}

fn parse_timestamp(field: &'static str, value: Option<String>) -> Result<DateTime<Utc>, DecodeSkip> {
    let value = value.ok_or(DecodeSkip::MissingField(field))?;
    NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| DecodeSkip::InvalidTimestamp { field, value })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use starscan_core::config::RetryConfig;
    use starscan_core::RecordError;

    use super::*;
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::TransportResponse;

    fn node(id: &str, owner: &str, name: &str, stars: i64) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "owner": {"login": owner},
            "nameWithOwner": format!("{owner}/{name}"),
            "stargazerCount": stars,
            "url": format!("https://github.com/{owner}/{name}"),
            "description": null,
            "primaryLanguage": {"name": "Rust"},
            "createdAt": "2015-03-01T10:00:00Z",
            "updatedAt": "2024-06-01T08:30:00Z"
        })
    }

    fn search_page(nodes: Vec<serde_json::Value>, has_next: bool, end: Option<&str>) -> serde_json::Value {
        json!({"data": {
            "search": {
                "repositoryCount": 1234,
                "pageInfo": {"hasNextPage": has_next, "endCursor": end},
                "nodes": nodes
            },
            "rateLimit": {"limit": 5000, "cost": 1, "remaining": 4990, "resetAt": "2024-06-01T09:00:00Z"}
        }})
    }

    fn fetcher(transport: &Arc<ScriptedTransport>) -> PageFetcher {
        let executor = QueryExecutor::new(transport.clone(), RetryConfig::default());
        PageFetcher::new(executor, "stars:>100")
    }

    #[test]
    fn decodes_complete_node() {
        let crawled_at = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        let repo = decode_node(&node("R1", "rust-lang", "rust", 90_000), crawled_at).unwrap();
        assert_eq!(repo.id(), "R1");
        assert_eq!(repo.name_with_owner(), "rust-lang/rust");
        assert_eq!(repo.stargazer_count(), 90_000);
        assert_eq!(repo.description(), None);
        assert_eq!(repo.primary_language(), Some("Rust"));
        assert_eq!(repo.created_at(), Utc.with_ymd_and_hms(2015, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(repo.crawled_at(), crawled_at);
    }

    #[test]
    fn null_primary_language_is_absent() {
        let mut raw = node("R1", "a", "b", 1);
        raw["primaryLanguage"] = serde_json::Value::Null;
        let repo = decode_node(&raw, Utc::now()).unwrap();
        assert_eq!(repo.primary_language(), None);
    }

    #[test]
    fn missing_owner_login_is_skipped() {
        let mut raw = node("R1", "a", "b", 1);
        raw["owner"] = json!({});
        assert_eq!(
            decode_node(&raw, Utc::now()).unwrap_err(),
            DecodeSkip::MissingField("owner.login")
        );
    }

    #[test]
    fn fractional_seconds_timestamp_is_skipped() {
        let mut raw = node("R1", "a", "b", 1);
        raw["updatedAt"] = json!("2024-06-01T08:30:00.123Z");
        assert!(matches!(
            decode_node(&raw, Utc::now()),
            Err(DecodeSkip::InvalidTimestamp { field: "updatedAt", .. })
        ));
    }

    #[test]
    fn empty_fragment_node_is_skipped() {
        // Non-repository search hits come back as `{}`.
        assert_eq!(
            decode_node(&json!({}), Utc::now()).unwrap_err(),
            DecodeSkip::MissingField("id")
        );
        assert!(matches!(
            decode_node(&json!("nope"), Utc::now()),
            Err(DecodeSkip::Malformed(_))
        ));
    }

    #[test]
    fn inconsistent_name_with_owner_is_skipped() {
        let mut raw = node("R1", "a", "b", 1);
        raw["nameWithOwner"] = json!("a/renamed");
        assert!(matches!(
            decode_node(&raw, Utc::now()),
            Err(DecodeSkip::Record(RecordError::NameMismatch { .. }))
        ));
    }

    #[test]
    fn negative_stars_are_skipped() {
        assert_eq!(
            decode_node(&node("R1", "a", "b", -4), Utc::now()).unwrap_err(),
            DecodeSkip::NegativeStars(-4)
        );
    }

    #[test]
    fn popularity_sort_is_appended_once() {
        assert_eq!(with_popularity_sort("stars:>100"), "stars:>100 sort:stars-desc");
        assert_eq!(with_popularity_sort("language:rust sort:updated"), "language:rust sort:updated");
        assert_eq!(with_popularity_sort(""), "sort:stars-desc");
    }

    #[test]
    fn page_size_is_clamped_to_api_maximum() {
        assert_eq!(clamp_page_size(500), MAX_PAGE_SIZE);
        assert_eq!(clamp_page_size(50), 50);
    }

    #[tokio::test]
    async fn item_missing_owner_login_is_dropped_but_page_continues() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut broken = node("R2", "b", "two", 20);
        broken["owner"] = json!({"login": null});
        transport.push_ok(search_page(
            vec![node("R1", "a", "one", 10), broken, node("R3", "c", "three", 5)],
            true,
            Some("Y3Vyc29yOjM="),
        ));

        let page = fetcher(&transport).fetch_page(None, 3).await;

        let ids: Vec<_> = page.records.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["R1", "R3"]);
        assert_eq!(page.skipped, 1);
        assert!(page.has_more);
        assert_eq!(page.next_cursor, Some(Cursor::new("Y3Vyc29yOjM=")));
        assert!(page.failure.is_none());
    }

    #[tokio::test]
    async fn passes_cursor_and_page_size_as_variables() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(search_page(vec![], false, None));

        let cursor = Cursor::new("c1");
        fetcher(&transport).fetch_page(Some(&cursor), 50).await;

        let request = &transport.requests()[0];
        assert_eq!(request.variables["cursor"], "c1");
        assert_eq!(request.variables["first"], 50);
        assert_eq!(request.variables["searchQuery"], "stars:>100 sort:stars-desc");
        assert!(request.query.contains("search("));
    }

    #[tokio::test]
    async fn last_page_has_no_cursor() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(search_page(vec![node("R1", "a", "one", 10)], false, Some("Y3Vyc29yOjE=")));

        let page = fetcher(&transport).fetch_page(None, 10).await;
        assert_eq!(page.records.len(), 1);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn more_pages_without_end_cursor_stops() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(search_page(vec![node("R1", "a", "one", 10)], true, None));

        let page = fetcher(&transport).fetch_page(None, 10).await;
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn query_failure_becomes_empty_final_page() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Ok(TransportResponse::status(404)));

        let page = fetcher(&transport).fetch_page(None, 10).await;
        assert!(page.records.is_empty());
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
        assert!(matches!(page.failure, Some(QueryFailure::Unexpected { status: Some(404), .. })));
    }

    #[tokio::test]
    async fn malformed_search_payload_is_a_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(json!({"data": {"search": {"nodes": []}}}));

        let page = fetcher(&transport).fetch_page(None, 10).await;
        assert!(page.records.is_empty());
        assert!(page.failure.is_some());
    }
}
