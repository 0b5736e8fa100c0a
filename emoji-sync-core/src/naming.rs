//! Destination-side name policies.
//!
//! Slack and GitLab disagree on what an emoji name may contain. Rather than
//! hard-coding a transformation into the engine, the target name of every
//! source emoji is produced by a [`NamePolicy`]. The default keeps names
//! untouched.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Longest name GitLab accepts for a custom emoji.
pub const GITLAB_NAME_MAX_LEN: usize = 36;

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_-]+").expect("static regex"));
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_-]{2,}").expect("static regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamePolicy {
    /// Use the source name unchanged.
    #[default]
    Verbatim,
    /// Rewrite names into GitLab's accepted charset and length.
    GitLabSafe,
}

impl NamePolicy {
    /// Target name for `name`, or `None` when the policy cannot represent it.
    pub fn apply(&self, name: &str) -> Option<String> {
        match self {
            NamePolicy::Verbatim => {
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                }
            }
            NamePolicy::GitLabSafe => gitlab_safe(name),
        }
    }
}

fn gitlab_safe(name: &str) -> Option<String> {
    let lowered = name.to_lowercase();
    let replaced = INVALID_CHARS.replace_all(&lowered, "_");
    let collapsed = SEPARATOR_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches(|c| c == '_' || c == '-');

    let truncated: String = trimmed.chars().take(GITLAB_NAME_MAX_LEN).collect();
    let truncated = truncated.trim_end_matches(|c| c == '_' || c == '-');

    if truncated.is_empty() {
        None
    } else {
        Some(truncated.to_string())
    }
}

impl FromStr for NamePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verbatim" | "Verbatim" => Ok(NamePolicy::Verbatim),
            "gitlab_safe" | "GitLabSafe" | "gitlab-safe" => Ok(NamePolicy::GitLabSafe),
            other => Err(format!("unknown name policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_keeps_name() {
        assert_eq!(
            NamePolicy::Verbatim.apply("Party-Parrot"),
            Some("Party-Parrot".to_string())
        );
        assert_eq!(NamePolicy::Verbatim.apply(""), None);
    }

    #[test]
    fn gitlab_safe_rewrites_charset() {
        let policy = NamePolicy::GitLabSafe;
        assert_eq!(policy.apply("Party Parrot!"), Some("party_parrot".to_string()));
        assert_eq!(policy.apply("a+++b"), Some("a_b".to_string()));
        assert_eq!(policy.apply("__x__"), Some("x".to_string()));
        assert_eq!(policy.apply("ok-hand"), Some("ok-hand".to_string()));
    }

    #[test]
    fn gitlab_safe_truncates() {
        let long = "a".repeat(50);
        let out = NamePolicy::GitLabSafe.apply(&long).unwrap();
        assert_eq!(out.len(), GITLAB_NAME_MAX_LEN);
    }

    #[test]
    fn gitlab_safe_rejects_unrepresentable() {
        assert_eq!(NamePolicy::GitLabSafe.apply("!!!"), None);
        assert_eq!(NamePolicy::GitLabSafe.apply("🎉"), None);
    }

    #[test]
    fn parses_from_config_strings() {
        assert_eq!("verbatim".parse::<NamePolicy>(), Ok(NamePolicy::Verbatim));
        assert_eq!("gitlab_safe".parse::<NamePolicy>(), Ok(NamePolicy::GitLabSafe));
        assert!("shout".parse::<NamePolicy>().is_err());
    }
}
