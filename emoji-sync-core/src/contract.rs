//! # contract: Universal interface for custom emoji directories
//!
//! This module defines the single trait ([`EmojiDirectory`]) every platform
//! adapter implements, the common [`Emoji`] shape, and the fixed error
//! taxonomy ([`DirectoryError`]) the sync engine is written against.
//!
//! ## Interface & Extensibility
//! - Implement [`EmojiDirectory`] to add a platform (see [`crate::slack`] and [`crate::gitlab`]).
//! - All methods are async and scope-addressed: the client owns the credential,
//!   the caller names the workspace/group on each call.
//! - Platform-specific failure shapes (HTTP status codes, `ok: false` payloads,
//!   GraphQL error arrays) must be mapped to [`DirectoryError`] inside the
//!   adapter; the engine never sees raw transport errors.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate deterministic mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A custom emoji as exposed by any directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    /// Platform-assigned identifier, only meaningful inside its own directory.
    pub id: String,
    /// Emoji name. Identity for reconciliation, compared case-insensitively.
    pub name: String,
    /// Location of the image asset.
    pub url: String,
}

impl Emoji {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// Lowercased name, the key used for duplicate detection.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Who a credential belongs to, as reported by a platform's identity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    /// User (or bot) name the token acts as.
    pub account: String,
    /// Workspace/team description, when the platform reports one.
    pub scope: Option<String>,
}

/// Errors surfaced by an emoji directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The credential was rejected by the platform.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The scope (team, group) does not exist or is not accessible.
    #[error("not found: {0}")]
    NotFound(String),

    /// The emoji name is already taken in the target scope.
    #[error("name already taken: {0}")]
    Conflict(String),

    /// Any other non-2xx, malformed or transport-level failure.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl DirectoryError {
    #[inline]
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    #[inline]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    #[inline]
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    #[inline]
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// True when the destination reported the name as already taken.
    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Classify an HTTP status code and response body into a typed error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            Self::Unauthorized(format!("{}: {}", status, body))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Self::NotFound(format!("{}: {}", status, body))
        } else {
            Self::Upstream(format!("{}: {}", status, body))
        }
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status, &err.to_string());
        }
        Self::Upstream(err.to_string())
    }
}

/// Trait for listing, creating and deleting custom emojis in one platform.
///
/// Implementors may cache `list` results per scope but must invalidate the
/// scope's entry as soon as a `create` or `delete` succeeds or turns out to be
/// a duplicate.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EmojiDirectory: Send + Sync {
    /// List every (non-alias) custom emoji in the scope.
    async fn list(&self, scope: &str) -> Result<Vec<Emoji>, DirectoryError>;

    /// Create a new emoji named `name` from the image at `url`.
    async fn create(&self, scope: &str, name: &str, url: &str) -> Result<Emoji, DirectoryError>;

    /// Delete the emoji with the platform identifier `id`.
    async fn delete(&self, scope: &str, id: &str) -> Result<(), DirectoryError>;
}
