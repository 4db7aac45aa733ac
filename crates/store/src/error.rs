use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Another id already owns this `name_with_owner`.
    #[error("name_with_owner '{name_with_owner}' already belongs to another repository (id {id})")]
    NameConflict { id: String, name_with_owner: String },

    #[error("{0}")]
    Other(String),
}
