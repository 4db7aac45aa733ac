//! GraphQL documents sent to the GitHub API.

/// Identity and quota probe.
pub const VIEWER: &str = r#"
query {
  viewer {
    login
  }
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;

pub const RATE_LIMIT: &str = r#"
query {
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;

/// One page of repository search results.
///
/// Variables: `searchQuery: String!`, `first: Int!`, `cursor: String`.
pub const SEARCH_REPOSITORIES: &str = r#"
query($searchQuery: String!, $first: Int!, $cursor: String) {
  search(query: $searchQuery, type: REPOSITORY, first: $first, after: $cursor) {
    repositoryCount
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      ... on Repository {
        id
        name
        owner {
          login
        }
        nameWithOwner
        stargazerCount
        url
        description
        primaryLanguage {
          name
        }
        createdAt
        updatedAt
      }
    }
  }
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;
