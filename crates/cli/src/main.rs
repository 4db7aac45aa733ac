mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use starscan_core::config::{load_dotenv, Config};
use starscan_crawl::{CrawlState, Crawler};
use starscan_store::{PgRepositoryStore, RepositoryStore};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let max_items = args.max_items.unwrap_or(config.crawl.max_items);
    let page_size = args.page_size.unwrap_or(config.crawl.page_size);

    ensure_credentials(&config)?;

    let store = PgRepositoryStore::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    if args.skip_migrations {
        info!("Skipping migrations");
    } else {
        store.migrate().await.context("failed to apply migrations")?;
    }
    let store: Arc<dyn RepositoryStore> = Arc::new(store);

    let crawler = Crawler::from_config(&config, Arc::clone(&store))
        .context("failed to set up GitHub client")?;

    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received; finishing the current page");
            stop.stop();
        }
    });

    let report = crawler
        .crawl(max_items, page_size)
        .await
        .context("crawl did not start")?;

    let total = store.count().await.context("failed to count stored repositories")?;

    if let Some(failure) = &report.failure {
        warn!(error = %failure, "Crawl ended early");
    }
    println!("Crawl {}.", report.state);
    println!("  Total repositories processed: {}", report.processed_count);
    println!("  Saved or updated this run:    {}", report.saved_count);
    println!("  Skipped while decoding:       {}", report.skipped);
    println!("  Total in database:            {}", total);

    if report.state == CrawlState::Failed {
        anyhow::bail!("crawl failed after {} pages", report.pages);
    }
    Ok(())
}

/// No token, no side effects: checked before the database is touched.
fn ensure_credentials(config: &Config) -> Result<()> {
    config
        .github
        .token()
        .context("GITHUB_TOKEN is required to crawl")?;
    Ok(())
}
