use clap::Parser;

/// Crawl popular GitHub repositories into PostgreSQL.
///
/// Connection settings, the token and crawl defaults come from the
/// environment (and `.env`); the flags below override the crawl budget.
#[derive(Parser, Debug)]
#[command(name = "starscan", version, about = "Crawl popular GitHub repositories into PostgreSQL")]
pub struct CliArgs {
    /// Stop after this many repositories (default: CRAWL_MAX_REPOSITORIES)
    #[arg(long, env = "STARSCAN_MAX_ITEMS")]
    pub max_items: Option<u64>,

    /// Repositories requested per page, at most 100 (default: CRAWL_BATCH_SIZE)
    #[arg(long, env = "STARSCAN_PAGE_SIZE")]
    pub page_size: Option<u32>,

    /// Do not apply the bundled schema before crawling
    #[arg(long, env = "STARSCAN_SKIP_MIGRATIONS")]
    pub skip_migrations: bool,

    /// Config profile; keys resolve as {PROFILE}_{KEY} first
    #[arg(long, env = "STARSCAN_PROFILE")]
    pub profile: Option<String>,
}
