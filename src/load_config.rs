/// `load_config` module: Loads a static YAML config and injects the platform tokens
/// from the environment, producing the typed [`CliConfig`] the commands run with.
///
/// This module is the only place where untrusted YAML is parsed.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into the `slack`, `gitlab` and `sync` sections
/// - Map the loosely-typed `name_policy` string onto [`NamePolicy`]
/// - Read `SLACK_TOKEN` and `GITLAB_TOKEN` from the environment (secrets never live in YAML)
/// - Fill in the public platform base URLs when the file omits them
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary. A missing
/// token names the variable that should be set.
use anyhow::{anyhow, Context, Result};
use emoji_sync_core::gitlab::DEFAULT_GITLAB_BASE_URL;
use emoji_sync_core::naming::NamePolicy;
use emoji_sync_core::slack::DEFAULT_SLACK_BASE_URL;
use emoji_sync_core::synchronise::SyncOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const SLACK_TOKEN_ENV: &str = "SLACK_TOKEN";
pub const GITLAB_TOKEN_ENV: &str = "GITLAB_TOKEN";

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub slack: SlackSettings,
    pub gitlab: GitLabSettings,
    pub sync: SyncOptions,
}

#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub team_id: String,
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct GitLabSettings {
    pub group_path: String,
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    slack: SlackSection,
    gitlab: GitLabSection,
    #[serde(default)]
    sync: SyncSection,
}

#[derive(Debug, Deserialize)]
struct SlackSection {
    team_id: String,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabSection {
    group_path: String,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SyncSection {
    name_policy: Option<String>,
}

/// Loads a static YAML config file (no secrets) and injects the tokens from env.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "[CLI] Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "[CLI] Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "[CLI] Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "[CLI] Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.slack.team_id.trim().is_empty() {
        return Err(anyhow!("slack.team_id must not be empty"));
    }
    if raw.gitlab.group_path.trim().is_empty() {
        return Err(anyhow!("gitlab.group_path must not be empty"));
    }

    let name_policy = match raw.sync.name_policy.as_deref() {
        None => NamePolicy::default(),
        Some(value) => value
            .parse::<NamePolicy>()
            .map_err(|e| anyhow!("Invalid sync.name_policy: {e}"))?,
    };

    let slack_token = require_env(SLACK_TOKEN_ENV)?;
    let gitlab_token = require_env(GITLAB_TOKEN_ENV)?;

    Ok(CliConfig {
        slack: SlackSettings {
            team_id: raw.slack.team_id,
            base_url: raw
                .slack
                .base_url
                .unwrap_or_else(|| DEFAULT_SLACK_BASE_URL.to_string()),
            token: slack_token,
        },
        gitlab: GitLabSettings {
            group_path: raw.gitlab.group_path,
            base_url: raw
                .gitlab
                .base_url
                .unwrap_or_else(|| DEFAULT_GITLAB_BASE_URL.to_string()),
            token: gitlab_token,
        },
        sync: SyncOptions { name_policy },
    })
}

fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("Environment variable {name} must be set"))?;
    if value.trim().is_empty() {
        return Err(anyhow!("Environment variable {name} must not be empty"));
    }
    Ok(value)
}
