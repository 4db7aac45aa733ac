use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Opaque continuation token for the remote search connection.
///
/// Only ever obtained from a page response; `None` at the call site means
/// "start of stream".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated field set for building a [`Repository`].
#[derive(Debug, Clone)]
pub struct RepositoryFields {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub name_with_owner: String,
    pub stargazer_count: u32,
    pub url: String,
    pub description: Option<String>,
    pub primary_language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub crawled_at: DateTime<Utc>,
}

/// One observation of a hosted repository.
///
/// Fields are private so a constructed record cannot drift from the
/// identity invariants checked in [`Repository::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Repository {
    id: String,
    name: String,
    owner: String,
    name_with_owner: String,
    stargazer_count: u32,
    url: String,
    description: Option<String>,
    primary_language: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    crawled_at: DateTime<Utc>,
}

impl Repository {
    /// Validate identity fields and build the record.
    ///
    /// `id`, `name`, `owner` and `url` must be non-empty and
    /// `name_with_owner` must equal `owner/name`.
    pub fn new(fields: RepositoryFields) -> Result<Self, RecordError> {
        for (field, value) in [
            ("id", &fields.id),
            ("name", &fields.name),
            ("owner", &fields.owner),
            ("url", &fields.url),
        ] {
            if value.trim().is_empty() {
                return Err(RecordError::EmptyField(field));
            }
        }

        let expected = format!("{}/{}", fields.owner, fields.name);
        if fields.name_with_owner != expected {
            return Err(RecordError::NameMismatch {
                expected,
                actual: fields.name_with_owner,
            });
        }

        Ok(Self {
            id: fields.id,
            name: fields.name,
            owner: fields.owner,
            name_with_owner: fields.name_with_owner,
            stargazer_count: fields.stargazer_count,
            url: fields.url,
            description: fields.description.filter(|d| !d.is_empty()),
            primary_language: fields.primary_language.filter(|l| !l.is_empty()),
            created_at: fields.created_at,
            updated_at: fields.updated_at,
            crawled_at: fields.crawled_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name_with_owner(&self) -> &str {
        &self.name_with_owner
    }

    pub fn stargazer_count(&self) -> u32 {
        self.stargazer_count
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn primary_language(&self) -> Option<&str> {
        self.primary_language.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn crawled_at(&self) -> DateTime<Utc> {
        self.crawled_at
    }
}
