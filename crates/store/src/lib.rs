//! Durable storage for crawled repositories.
//!
//! `RepositoryStore` is the upsert port. `PgRepositoryStore` backs it with
//! PostgreSQL, `MemoryStore` keeps rows in process. `PersistenceSink`
//! writes whole pages through either one.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod sink;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgRepositoryStore;
pub use sink::PersistenceSink;
pub use traits::{advance_crawled_at, RepositoryStore, StoredRepository, UpsertOutcome};
