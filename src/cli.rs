///
/// This module implements the CLI interface for emoji-sync: command parsing,
/// client construction from the loaded config, and printing of the event stream.
///
/// All sync logic (directory contract, reconciliation, the engine itself) lives in
/// the [`emoji-sync-core`] crate. This module is strictly CLI glue.
///
/// ## Output
/// Every command writes machine-readable JSON lines to stdout: progress events for
/// `sync` and `empty`, emojis for `list`, connection details for `check`. Logs go to
/// stderr so the two never interleave.
///
/// ## How To Use
/// - For command-line users: use the installed `emoji-sync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`emoji-sync-core`]: ../../emoji-sync-core/
use crate::load_config::{load_config, CliConfig};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use emoji_sync_core::contract::EmojiDirectory;
use emoji_sync_core::gitlab::GitLabClient;
use emoji_sync_core::progress::{ProgressSink, SyncEvent};
use emoji_sync_core::slack::SlackClient;
use emoji_sync_core::synchronise::{empty_directory, synchronise};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// CLI for emoji-sync: copy Slack custom emojis into a GitLab group.
#[derive(Parser)]
#[clap(
    name = "emoji-sync",
    version,
    about = "Copy custom emojis from a Slack workspace into a GitLab group"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy every Slack emoji the GitLab group lacks
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Print the custom emojis of one platform as JSON lines
    List {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long, value_enum)]
        platform: Platform,
    },
    /// Delete every custom emoji of one platform
    Empty {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long, value_enum)]
        platform: Platform,
        /// Confirm the deletion
        #[clap(long)]
        yes: bool,
    },
    /// Verify both tokens
    Check {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    Slack,
    Gitlab,
}

/// Writes each event as one JSON line on stdout.
pub struct JsonLinesSink;

impl ProgressSink for JsonLinesSink {
    fn emit(&self, event: SyncEvent) {
        print_json_line(&event);
    }
}

fn print_json_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => {
            let mut out = std::io::stdout().lock();
            if let Err(e) = writeln!(out, "{line}") {
                tracing::debug!(error = ?e, "[CLI] Dropping output line, stdout closed");
            }
        }
        Err(e) => tracing::warn!(error = ?e, "[CLI] Failed to serialise output line"),
    }
}

fn slack_client(config: &CliConfig) -> SlackClient {
    SlackClient::with_base_url(&config.slack.base_url, &config.slack.token)
}

fn gitlab_client(config: &CliConfig) -> GitLabClient {
    GitLabClient::with_base_url(&config.gitlab.base_url, &config.gitlab.token)
}

/// The directory and scope a single-platform command operates on.
fn directory_for(config: &CliConfig, platform: Platform) -> (Box<dyn EmojiDirectory>, String) {
    match platform {
        Platform::Slack => (Box::new(slack_client(config)), config.slack.team_id.clone()),
        Platform::Gitlab => (
            Box::new(gitlab_client(config)),
            config.gitlab.group_path.clone(),
        ),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            tracing::info!(
                command = "sync",
                team_id = %config.slack.team_id,
                group_path = %config.gitlab.group_path,
                "[CLI] Starting synchronisation"
            );
            let slack = slack_client(&config);
            let gitlab = gitlab_client(&config);
            let sink = JsonLinesSink;

            match synchronise(
                &slack,
                &config.slack.team_id,
                &gitlab,
                &config.gitlab.group_path,
                &sink,
                &config.sync,
            )
            .await
            {
                Ok(summary) => {
                    sink.emit(SyncEvent::done("Synchronization complete!"));
                    tracing::info!(command = "sync", ?summary, "[CLI] Synchronisation complete");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "[CLI] Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::List { config, platform } => {
            let config = load_config(config)?;
            let (directory, scope) = directory_for(&config, platform);
            let emojis = directory
                .list(&scope)
                .await
                .map_err(|e| anyhow!("Listing {platform:?} emojis for {scope} failed: {e}"))?;
            tracing::info!(command = "list", ?platform, count = emojis.len(), "[CLI] Listed emojis");
            for emoji in &emojis {
                print_json_line(emoji);
            }
            Ok(())
        }
        Commands::Empty {
            config,
            platform,
            yes,
        } => {
            if !yes {
                return Err(anyhow!(
                    "Refusing to delete every {platform:?} emoji without --yes"
                ));
            }
            let config = load_config(config)?;
            let (directory, scope) = directory_for(&config, platform);
            let sink = JsonLinesSink;
            let summary = empty_directory(&*directory, &scope, &sink).await?;
            sink.emit(SyncEvent::done("Deletion complete!"));
            tracing::info!(command = "empty", ?platform, ?summary, "[CLI] Directory emptied");
            Ok(())
        }
        Commands::Check { config } => {
            let config = load_config(config)?;
            let slack = slack_client(&config)
                .check_connection()
                .await
                .map_err(|e| anyhow!("Slack connection check failed: {e}"))?;
            print_json_line(&serde_json::json!({ "platform": "slack", "connection": slack }));
            let gitlab = gitlab_client(&config)
                .check_connection()
                .await
                .map_err(|e| anyhow!("GitLab connection check failed: {e}"))?;
            print_json_line(&serde_json::json!({ "platform": "gitlab", "connection": gitlab }));
            tracing::info!(command = "check", "[CLI] Both connections verified");
            Ok(())
        }
    }
}
