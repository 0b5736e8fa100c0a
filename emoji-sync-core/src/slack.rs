//! Slack Web API adapter.
//!
//! Listing uses `emoji.list`, which returns a name → url map where aliases are
//! encoded as values prefixed with `alias:`; those are filtered out. Creation
//! and deletion go through the `admin.emoji.*` methods. Slack reports nearly
//! every failure as HTTP 200 with `{"ok": false, "error": "<code>"}`, so the
//! error code is what gets classified into [`DirectoryError`].
//!
//! The Slack identifier of a custom emoji is its name.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cache::ScopeCache;
use crate::contract::{ConnectionInfo, DirectoryError, Emoji, EmojiDirectory};

pub const DEFAULT_SLACK_BASE_URL: &str = "https://slack.com";

const ALIAS_PREFIX: &str = "alias:";

#[derive(Debug, Deserialize)]
struct EmojiListResponse {
    ok: bool,
    #[serde(default)]
    emoji: Option<Map<String, Value>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    team_id: Option<String>,
}

/// Slack client bound to one bearer token.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    cache: ScopeCache,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_SLACK_BASE_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            cache: ScopeCache::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/api/{}", self.base_url, method)
    }

    /// Verify the token with `auth.test`.
    pub async fn check_connection(&self) -> Result<ConnectionInfo, DirectoryError> {
        let request = self.http.post(self.method_url("auth.test")).bearer_auth(&self.token);
        let body: AuthTestResponse = send(request).await?;
        if !body.ok {
            let code = body.error.unwrap_or_else(|| "unknown_error".to_string());
            tracing::warn!(code = %code, "[SLACK] auth.test failed");
            return Err(classify_error(&code));
        }
        let account = body.user.unwrap_or_default();
        let scope = match (body.team, body.team_id) {
            (Some(team), Some(id)) => Some(format!("{team} ({id})")),
            (Some(team), None) => Some(team),
            (None, id) => id,
        };
        tracing::info!(account = %account, "[SLACK] Connection verified");
        Ok(ConnectionInfo { account, scope })
    }

    async fn call_status(&self, method: &str, form: &[(&str, &str)]) -> Result<(), DirectoryError> {
        let request = self
            .http
            .post(self.method_url(method))
            .bearer_auth(&self.token)
            .form(form);
        let body: StatusResponse = send(request).await?;
        if body.ok {
            Ok(())
        } else {
            let code = body.error.unwrap_or_else(|| "unknown_error".to_string());
            Err(classify_error(&code))
        }
    }
}

async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, DirectoryError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        tracing::error!(status = %status, body = %text, "[SLACK] Non-success HTTP status");
        return Err(DirectoryError::from_status(status, &text));
    }
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(error = ?e, "[SLACK] Malformed response body");
        DirectoryError::upstream(format!("malformed Slack response: {e}"))
    })
}

/// Map a Slack error code onto the directory taxonomy.
pub fn classify_error(code: &str) -> DirectoryError {
    match code {
        "invalid_auth" | "not_authed" | "token_revoked" | "token_expired"
        | "account_inactive" | "missing_scope" | "not_allowed_token_type" => {
            DirectoryError::unauthorized(code)
        }
        "team_not_found" | "team_access_not_granted" | "emoji_not_found" => {
            DirectoryError::not_found(code)
        }
        "error_name_taken" | "error_name_taken_i18n" | "name_taken" => {
            DirectoryError::conflict(code)
        }
        other => DirectoryError::upstream(other),
    }
}

/// Turn an `emoji.list` map into emojis, dropping aliases and non-string values.
pub fn normalise_emoji_map(map: Map<String, Value>) -> Vec<Emoji> {
    map.into_iter()
        .filter_map(|(name, value)| match value {
            Value::String(url) if !url.starts_with(ALIAS_PREFIX) => {
                Some(Emoji::new(name.clone(), name, url))
            }
            _ => None,
        })
        .collect()
}

#[async_trait]
impl EmojiDirectory for SlackClient {
    async fn list(&self, team_id: &str) -> Result<Vec<Emoji>, DirectoryError> {
        if let Some(cached) = self.cache.get(team_id).await {
            tracing::debug!(team_id, count = cached.len(), "[SLACK] Serving emoji list from cache");
            return Ok(cached);
        }

        tracing::info!(team_id, "[SLACK] Fetching emoji list");
        let generation = self.cache.generation(team_id).await;
        let request = self
            .http
            .get(self.method_url("emoji.list"))
            .bearer_auth(&self.token);
        let body: EmojiListResponse = send(request).await?;

        if !body.ok {
            let code = body.error.unwrap_or_else(|| "unknown_error".to_string());
            tracing::error!(team_id, code = %code, "[SLACK] emoji.list failed");
            return Err(classify_error(&code));
        }

        let Some(map) = body.emoji else {
            tracing::error!(team_id, "[SLACK] emoji.list succeeded without an emoji map");
            return Err(DirectoryError::upstream("emoji.list returned no emoji map"));
        };

        let emojis = normalise_emoji_map(map);
        tracing::info!(team_id, count = emojis.len(), "[SLACK] Fetched emoji list");
        self.cache.put(team_id, emojis.clone(), generation).await;
        Ok(emojis)
    }

    async fn create(&self, team_id: &str, name: &str, url: &str) -> Result<Emoji, DirectoryError> {
        tracing::info!(team_id, name, "[SLACK] Adding emoji");
        let result = self
            .call_status("admin.emoji.add", &[("name", name), ("url", url)])
            .await;
        match result {
            Ok(()) => {
                self.cache.invalidate(team_id).await;
                Ok(Emoji::new(name, name, url))
            }
            Err(e) => {
                if e.is_conflict() {
                    self.cache.invalidate(team_id).await;
                }
                tracing::warn!(team_id, name, error = ?e, "[SLACK] admin.emoji.add failed");
                Err(e)
            }
        }
    }

    async fn delete(&self, team_id: &str, id: &str) -> Result<(), DirectoryError> {
        tracing::info!(team_id, id, "[SLACK] Removing emoji");
        self.call_status("admin.emoji.remove", &[("name", id)]).await?;
        self.cache.invalidate(team_id).await;
        Ok(())
    }
}
