//! GitLab GraphQL adapter for group custom emojis.
//!
//! GitLab exposes custom emojis only through GraphQL. Failures come in three
//! shapes: an HTTP status (401 for a rejected token), a top-level `errors`
//! array, or a mutation payload whose `errors` field lists messages while the
//! HTTP status is still 200. All three are folded into [`DirectoryError`]; a
//! duplicate name is recognised by its message text.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cache::ScopeCache;
use crate::contract::{ConnectionInfo, DirectoryError, Emoji, EmojiDirectory};

pub const DEFAULT_GITLAB_BASE_URL: &str = "https://gitlab.com";

/// Page size for custom emoji listing.
const PAGE_SIZE: u32 = 100;

static NAME_TAKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)has already been taken").expect("static regex"));
static MISSING_RESOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)does not exist|not found").expect("static regex"));

const LIST_QUERY: &str = r#"
query GetCustomEmoji($groupPath: ID!, $first: Int!, $after: String) {
  group(fullPath: $groupPath) {
    id
    customEmoji(first: $first, after: $after) {
      nodes {
        id
        name
        url
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}
"#;

const CREATE_MUTATION: &str = r#"
mutation CreateCustomEmoji($groupPath: ID!, $name: String!, $url: String!) {
  createCustomEmoji(input: { groupPath: $groupPath, name: $name, url: $url }) {
    customEmoji {
      id
      name
      url
    }
    errors
  }
}
"#;

const DESTROY_MUTATION: &str = r#"
mutation DestroyCustomEmoji($id: CustomEmojiID!) {
  destroyCustomEmoji(input: { id: $id }) {
    errors
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GroupData {
    group: Option<GroupNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupNode {
    custom_emoji: Option<EmojiConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmojiConnection {
    #[serde(default)]
    nodes: Vec<Emoji>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    create_custom_emoji: Option<CreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload {
    custom_emoji: Option<Emoji>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestroyData {
    destroy_custom_emoji: Option<DestroyPayload>,
}

#[derive(Debug, Deserialize)]
struct DestroyPayload {
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    username: String,
    #[serde(default)]
    name: Option<String>,
}

/// True when a GitLab message says the emoji name is in use.
pub fn is_name_taken(message: &str) -> bool {
    NAME_TAKEN.is_match(message)
}

/// Classify mutation/query error messages.
fn classify_messages(messages: &[String]) -> DirectoryError {
    let joined = messages.join("; ");
    if messages.iter().any(|m| is_name_taken(m)) {
        DirectoryError::conflict(joined)
    } else if messages.iter().any(|m| MISSING_RESOURCE.is_match(m)) {
        DirectoryError::not_found(joined)
    } else {
        DirectoryError::upstream(joined)
    }
}

/// GitLab client bound to one bearer token.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    cache: ScopeCache,
}

impl GitLabClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_GITLAB_BASE_URL, token)
    }

    /// Create a client for a self-hosted instance (`https://gitlab.example.com`).
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            cache: ScopeCache::new(),
        }
    }

    /// Verify the token against `GET /api/v4/user`.
    pub async fn check_connection(&self) -> Result<ConnectionInfo, DirectoryError> {
        let response = self
            .http
            .get(format!("{}/api/v4/user", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = %status, "[GITLAB] Token check failed");
            return Err(DirectoryError::from_status(status, &text));
        }
        let user: GitLabUser = serde_json::from_str(&text)
            .map_err(|e| DirectoryError::upstream(format!("malformed GitLab user: {e}")))?;
        tracing::info!(username = %user.username, "[GITLAB] Connection verified");
        Ok(ConnectionInfo {
            account: user.username,
            scope: user.name,
        })
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse<T>, DirectoryError> {
        let response = self
            .http
            .post(format!("{}/api/graphql", self.base_url))
            .bearer_auth(&self.token)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "[GITLAB] Non-success HTTP status");
            return Err(DirectoryError::from_status(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = ?e, "[GITLAB] Malformed GraphQL response");
            DirectoryError::upstream(format!("malformed GitLab response: {e}"))
        })
    }

    async fn fetch_all(&self, group_path: &str) -> Result<Vec<Emoji>, DirectoryError> {
        let mut emojis = Vec::new();
        let mut after: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let variables = json!({
                "groupPath": group_path,
                "first": PAGE_SIZE,
                "after": after,
            });
            let response: GraphQlResponse<GroupData> = self.graphql(LIST_QUERY, variables).await?;

            let Some(data) = response.data else {
                let messages: Vec<String> =
                    response.errors.into_iter().map(|e| e.message).collect();
                return Err(DirectoryError::upstream(if messages.is_empty() {
                    "no data returned".to_string()
                } else {
                    messages.join("; ")
                }));
            };

            let Some(group) = data.group else {
                return Err(DirectoryError::not_found(format!(
                    "group not found or no permission: {group_path}"
                )));
            };

            let Some(connection) = group.custom_emoji else {
                break;
            };
            emojis.extend(connection.nodes);

            match connection.page_info {
                Some(PageInfo {
                    has_next_page: true,
                    end_cursor: Some(cursor),
                }) if seen_cursors.insert(cursor.clone()) => {
                    tracing::debug!(group_path, fetched = emojis.len(), "[GITLAB] Fetching next page");
                    after = Some(cursor);
                }
                _ => break,
            }
        }

        Ok(emojis)
    }
}

#[async_trait]
impl EmojiDirectory for GitLabClient {
    async fn list(&self, group_path: &str) -> Result<Vec<Emoji>, DirectoryError> {
        if let Some(cached) = self.cache.get(group_path).await {
            tracing::debug!(group_path, count = cached.len(), "[GITLAB] Serving emoji list from cache");
            return Ok(cached);
        }

        tracing::info!(group_path, "[GITLAB] Fetching custom emojis");
        let generation = self.cache.generation(group_path).await;
        match self.fetch_all(group_path).await {
            Ok(emojis) => {
                tracing::info!(group_path, count = emojis.len(), "[GITLAB] Fetched custom emojis");
                self.cache.put(group_path, emojis.clone(), generation).await;
                Ok(emojis)
            }
            Err(e) => {
                tracing::error!(group_path, error = ?e, "[GITLAB] Failed to fetch custom emojis");
                Err(e)
            }
        }
    }

    async fn create(&self, group_path: &str, name: &str, url: &str) -> Result<Emoji, DirectoryError> {
        tracing::info!(group_path, name, "[GITLAB] Creating custom emoji");
        let variables = json!({ "groupPath": group_path, "name": name, "url": url });
        let response: GraphQlResponse<CreateData> =
            self.graphql(CREATE_MUTATION, variables).await?;

        let payload = response.data.and_then(|d| d.create_custom_emoji);
        let mut messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        if let Some(p) = &payload {
            messages.extend(p.errors.iter().cloned());
        }

        if !messages.is_empty() {
            let err = classify_messages(&messages);
            if err.is_conflict() {
                self.cache.invalidate(group_path).await;
            }
            tracing::warn!(group_path, name, error = ?err, "[GITLAB] createCustomEmoji rejected");
            return Err(err);
        }

        match payload.and_then(|p| p.custom_emoji) {
            Some(emoji) => {
                self.cache.invalidate(group_path).await;
                Ok(emoji)
            }
            None => Err(DirectoryError::upstream(
                "createCustomEmoji returned no emoji and no errors",
            )),
        }
    }

    async fn delete(&self, group_path: &str, id: &str) -> Result<(), DirectoryError> {
        tracing::info!(group_path, id, "[GITLAB] Destroying custom emoji");
        let response: GraphQlResponse<DestroyData> =
            self.graphql(DESTROY_MUTATION, json!({ "id": id })).await?;

        let mut messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        if let Some(p) = response.data.and_then(|d| d.destroy_custom_emoji) {
            messages.extend(p.errors);
        }
        if !messages.is_empty() {
            let err = classify_messages(&messages);
            tracing::warn!(group_path, id, error = ?err, "[GITLAB] destroyCustomEmoji rejected");
            return Err(err);
        }

        self.cache.invalidate(group_path).await;
        Ok(())
    }
}
