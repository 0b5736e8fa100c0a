#![doc = "emoji-sync-core: core logic library for emoji-sync."]

//! This crate contains the data model, the emoji directory contract, the
//! platform adapters (Slack, GitLab) and the sync engine that copies custom
//! emojis from one directory into another.
//!
//! # Usage
//! Construct two [`contract::EmojiDirectory`] implementations (for example
//! [`slack::SlackClient`] and [`gitlab::GitLabClient`]) and hand them to
//! [`synchronise::synchronise`] together with a [`progress::ProgressSink`].

pub mod cache;
pub mod contract;
pub mod gitlab;
pub mod naming;
pub mod progress;
pub mod reconcile;
pub mod slack;
pub mod synchronise;
