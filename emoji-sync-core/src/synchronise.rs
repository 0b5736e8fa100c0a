//! High-level pipeline: orchestrates fetch → reconcile → create for one
//! (source scope, destination scope) pair.
//!
//! This module provides the sync engine. A run:
//!   - Fetches the source inventory (fatal on failure: nothing to do without it)
//!   - Fetches the destination inventory (degrades to an empty snapshot on failure)
//!   - Walks the source list in order, deciding per item with [`Reconciler`]
//!   - Creates missing emojis one at a time, reclassifying conflicts as skips
//!   - Emits one `progress` and one terminal event per item, then a `summary`
//!
//! # Major Types
//! - [`SyncOptions`]: per-run knobs (destination name policy)
//! - [`SyncSummary`]: final counters returned to the caller
//! - [`SyncError`]: the only ways a run can abort
//!
//! # Concurrency
//! Creations are never issued concurrently. This bounds the request rate
//! against the destination and keeps event order equal to execution order.
//! Independent runs share nothing but the clients' scope-keyed caches.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Bulk delete: [`empty_directory`]

use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::contract::{DirectoryError, EmojiDirectory};
use crate::naming::NamePolicy;
use crate::progress::{ProgressSink, SyncEvent};
use crate::reconcile::{Decision, Outcome, Reconciler};

pub use crate::progress::SyncSummary;

/// Per-run configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// How source names are turned into destination names.
    pub name_policy: NamePolicy,
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The initial source listing failed.
    #[error("failed to fetch source emojis: {0}")]
    SourceFetch(#[source] DirectoryError),

    /// The listing preceding a bulk delete failed.
    #[error("failed to list emojis to delete: {0}")]
    ListFailed(#[source] DirectoryError),
}

/// Copy every emoji of `source_scope` that `destination_scope` lacks.
///
/// Returns the final counts. Per-item failures are reported through `sink`
/// and counted; only a failed source fetch returns an error.
pub async fn synchronise<S, D, P>(
    source: &S,
    source_scope: &str,
    destination: &D,
    destination_scope: &str,
    sink: &P,
    options: &SyncOptions,
) -> Result<SyncSummary, SyncError>
where
    S: EmojiDirectory + ?Sized,
    D: EmojiDirectory + ?Sized,
    P: ProgressSink + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = info_span!(
        "sync_run",
        run_id = %run_id,
        source_scope,
        destination_scope
    );
    run(source, source_scope, destination, destination_scope, sink, options)
        .instrument(span)
        .await
}

async fn run<S, D, P>(
    source: &S,
    source_scope: &str,
    destination: &D,
    destination_scope: &str,
    sink: &P,
    options: &SyncOptions,
) -> Result<SyncSummary, SyncError>
where
    S: EmojiDirectory + ?Sized,
    D: EmojiDirectory + ?Sized,
    P: ProgressSink + ?Sized,
{
    info!("[SYNC] Starting emoji synchronisation");

    // Step 1: source inventory
    sink.emit(SyncEvent::info(format!(
        "Fetching emojis from source scope: {source_scope}"
    )));
    let source_emojis = match source.list(source_scope).await {
        Ok(emojis) => {
            info!(count = emojis.len(), "[SYNC] Fetched source emojis");
            sink.emit(SyncEvent::info(format!(
                "Found {} emojis in source.",
                emojis.len()
            )));
            emojis
        }
        Err(e) => {
            error!(error = ?e, "[SYNC][ERROR] Failed to fetch source emojis");
            sink.emit(SyncEvent::Error {
                emoji_name: None,
                message: format!("Failed to fetch source emojis: {e}"),
            });
            return Err(SyncError::SourceFetch(e));
        }
    };

    // Step 2: destination snapshot
    sink.emit(SyncEvent::info(format!(
        "Fetching existing emojis from destination scope: {destination_scope} to avoid duplicates."
    )));
    let mut reconciler = match destination.list(destination_scope).await {
        Ok(existing) => {
            info!(count = existing.len(), "[SYNC] Fetched destination emojis");
            Reconciler::from_emojis(&existing, options.name_policy)
        }
        Err(e) => {
            warn!(error = ?e, "[SYNC] Could not fetch destination emojis, proceeding without snapshot");
            sink.emit(SyncEvent::warning(format!(
                "Could not pre-fetch existing destination emojis: {e}. Proceeding with sync."
            )));
            Reconciler::new(Vec::<String>::new(), options.name_policy)
        }
    };

    // Step 3: per item, strictly in source order
    let mut summary = SyncSummary::default();

    for emoji in &source_emojis {
        sink.emit(SyncEvent::Progress {
            emoji_name: emoji.name.clone(),
            message: format!("Processing emoji: {}", emoji.name),
        });

        let planned = reconciler.pre_check(emoji);
        let target_name = planned
            .target_name
            .clone()
            .unwrap_or_else(|| emoji.name.clone());

        let outcome = match planned.decision {
            Decision::Skip(reason) => Outcome::Skipped(reason),
            Decision::Fail(reason) => Outcome::Failed(reason),
            Decision::Create => {
                let result = destination
                    .create(destination_scope, &target_name, &emoji.url)
                    .await;
                reconciler.settle(&target_name, result)
            }
        };

        match outcome {
            Outcome::Created(created) => {
                info!(emoji = %emoji.name, target = %target_name, id = %created.id, "[SYNC] Created emoji");
                summary.success += 1;
                sink.emit(SyncEvent::Success {
                    emoji_name: target_name.clone(),
                    original_name: emoji.name.clone(),
                    message: format!(
                        "Emoji {target_name} (from source's {}) created successfully.",
                        emoji.name
                    ),
                });
            }
            Outcome::Skipped(_) => {
                info!(emoji = %emoji.name, target = %target_name, "[SYNC] Emoji already exists, skipped");
                summary.skipped += 1;
                sink.emit(SyncEvent::Skipped {
                    emoji_name: target_name.clone(),
                    original_name: emoji.name.clone(),
                    message: format!(
                        "Emoji {target_name} (from source's {}) already exists in destination. Skipped.",
                        emoji.name
                    ),
                });
            }
            Outcome::Failed(reason) => {
                error!(emoji = %emoji.name, target = %target_name, error = %reason, "[SYNC][ERROR] Failed to create emoji");
                summary.errors += 1;
                sink.emit(SyncEvent::Error {
                    emoji_name: Some(emoji.name.clone()),
                    message: format!("Failed to create emoji {}: {reason}", emoji.name),
                });
            }
        }
    }

    // Step 4: summary
    info!(
        success = summary.success,
        skipped = summary.skipped,
        errors = summary.errors,
        "[SYNC] Synchronisation finished"
    );
    sink.emit(SyncEvent::Summary {
        message: format!(
            "Synchronization finished. Successful: {}, Skipped (already exist): {}, Errors: {}.",
            summary.success, summary.skipped, summary.errors
        ),
        counts: summary,
    });

    Ok(summary)
}

/// Removes every emoji in `scope`, one at a time.
///
/// `success` counts deletions, `skipped` counts emojis that were already gone
/// (`NotFound`), `errors` everything else. A failed listing aborts.
pub async fn empty_directory<C, P>(
    client: &C,
    scope: &str,
    sink: &P,
) -> Result<SyncSummary, SyncError>
where
    C: EmojiDirectory + ?Sized,
    P: ProgressSink + ?Sized,
{
    info!(scope, "[SYNC] Emptying emoji directory");
    sink.emit(SyncEvent::info(format!("Fetching emojis to delete from scope: {scope}")));

    let emojis = client.list(scope).await.map_err(|e| {
        error!(scope, error = ?e, "[SYNC][ERROR] Failed to list emojis before deletion");
        sink.emit(SyncEvent::Error {
            emoji_name: None,
            message: format!("Failed to list emojis: {e}"),
        });
        SyncError::ListFailed(e)
    })?;

    let mut summary = SyncSummary::default();
    for emoji in &emojis {
        sink.emit(SyncEvent::Progress {
            emoji_name: emoji.name.clone(),
            message: format!("Deleting emoji: {}", emoji.name),
        });
        match client.delete(scope, &emoji.id).await {
            Ok(()) => {
                summary.success += 1;
                sink.emit(SyncEvent::Success {
                    emoji_name: emoji.name.clone(),
                    original_name: emoji.name.clone(),
                    message: format!("Emoji {} deleted.", emoji.name),
                });
            }
            Err(DirectoryError::NotFound(_)) => {
                summary.skipped += 1;
                sink.emit(SyncEvent::Skipped {
                    emoji_name: emoji.name.clone(),
                    original_name: emoji.name.clone(),
                    message: format!("Emoji {} was already gone. Skipped.", emoji.name),
                });
            }
            Err(e) => {
                error!(scope, emoji = %emoji.name, error = ?e, "[SYNC][ERROR] Failed to delete emoji");
                summary.errors += 1;
                sink.emit(SyncEvent::Error {
                    emoji_name: Some(emoji.name.clone()),
                    message: format!("Failed to delete emoji {}: {e}", emoji.name),
                });
            }
        }
    }

    sink.emit(SyncEvent::Summary {
        message: format!(
            "Deletion finished. Deleted: {}, Already gone: {}, Errors: {}.",
            summary.success, summary.skipped, summary.errors
        ),
        counts: summary,
    });
    Ok(summary)
}
