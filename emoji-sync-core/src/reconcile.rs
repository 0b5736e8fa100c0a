//! Name reconciliation between a source and a destination directory.
//!
//! Identity is the emoji name, compared case-insensitively. The destination
//! snapshot taken at the start of a run is only an optimisation: a conflict
//! reported by the destination on creation always wins and turns the item into
//! a skip.

use std::collections::HashSet;
use std::fmt;

use crate::contract::{DirectoryError, Emoji};
use crate::naming::NamePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyExists,
}

/// Why an item could not be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateError(pub String);

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-item decision taken before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    Skip(SkipReason),
    Fail(CreateError),
}

/// Final classification of an item once creation was attempted (or not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(Emoji),
    Skipped(SkipReason),
    Failed(CreateError),
}

/// A source emoji together with the name it will have in the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planned {
    /// `None` when the name policy rejected the source name.
    pub target_name: Option<String>,
    pub decision: Decision,
}

/// Evolving set of known destination names for one run.
///
/// Names are stored lowercased and are never removed.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    known: HashSet<String>,
    policy: NamePolicy,
}

impl Reconciler {
    pub fn new<I, S>(destination_names: I, policy: NamePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = destination_names
            .into_iter()
            .map(|n| n.as_ref().to_lowercase())
            .collect();
        Self { known, policy }
    }

    /// Seed from a full destination listing.
    pub fn from_emojis(destination: &[Emoji], policy: NamePolicy) -> Self {
        Self::new(destination.iter().map(|e| e.name.as_str()), policy)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.known.contains(&name.to_lowercase())
    }

    /// Record `name` as present in the destination.
    pub fn record(&mut self, name: &str) {
        self.known.insert(name.to_lowercase());
    }

    /// Decide what to do with `source` against the current known set.
    pub fn pre_check(&self, source: &Emoji) -> Planned {
        let Some(target_name) = self.policy.apply(&source.name) else {
            return Planned {
                target_name: None,
                decision: Decision::Fail(CreateError(format!(
                    "name {:?} cannot be represented in the destination",
                    source.name
                ))),
            };
        };

        let decision = if self.contains(&target_name) {
            Decision::Skip(SkipReason::AlreadyExists)
        } else {
            Decision::Create
        };

        Planned {
            target_name: Some(target_name),
            decision,
        }
    }

    /// Classify the result of a creation attempt for `target_name`.
    ///
    /// Successful creations and conflicts both add the name to the known set.
    pub fn settle(
        &mut self,
        target_name: &str,
        result: Result<Emoji, DirectoryError>,
    ) -> Outcome {
        match result {
            Ok(created) => {
                self.record(target_name);
                Outcome::Created(created)
            }
            Err(DirectoryError::Conflict(_)) => {
                self.record(target_name);
                Outcome::Skipped(SkipReason::AlreadyExists)
            }
            Err(e) => Outcome::Failed(CreateError(e.to_string())),
        }
    }
}
