pub mod config;
pub mod error;
pub mod repository;

pub use config::Config;
pub use error::*;
pub use repository::*;
