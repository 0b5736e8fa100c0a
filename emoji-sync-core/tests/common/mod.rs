#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use emoji_sync_core::contract::{DirectoryError, Emoji, EmojiDirectory};
use emoji_sync_core::progress::SyncEvent;

/// Stateful directory keeping emojis in memory, rejecting duplicate names
/// case-insensitively the way GitLab does.
#[derive(Default)]
pub struct InMemoryDirectory {
    emojis: Mutex<Vec<Emoji>>,
    next_id: Mutex<u64>,
    create_calls: Mutex<Vec<String>>,
}

impl InMemoryDirectory {
    pub fn with(emojis: Vec<Emoji>) -> Self {
        Self {
            emojis: Mutex::new(emojis),
            ..Default::default()
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.emojis
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.create_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmojiDirectory for InMemoryDirectory {
    async fn list(&self, _scope: &str) -> Result<Vec<Emoji>, DirectoryError> {
        Ok(self.emojis.lock().unwrap().clone())
    }

    async fn create(&self, _scope: &str, name: &str, url: &str) -> Result<Emoji, DirectoryError> {
        self.create_calls.lock().unwrap().push(name.to_string());
        let mut emojis = self.emojis.lock().unwrap();
        if emojis.iter().any(|e| e.name.eq_ignore_ascii_case(name)) {
            return Err(DirectoryError::conflict("Name has already been taken"));
        }
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let emoji = Emoji::new(format!("gid://test/CustomEmoji/{next_id}"), name, url);
        emojis.push(emoji.clone());
        Ok(emoji)
    }

    async fn delete(&self, _scope: &str, id: &str) -> Result<(), DirectoryError> {
        let mut emojis = self.emojis.lock().unwrap();
        let before = emojis.len();
        emojis.retain(|e| e.id != id);
        if emojis.len() == before {
            return Err(DirectoryError::not_found(id.to_string()));
        }
        Ok(())
    }
}

pub fn emoji(name: &str, url: &str) -> Emoji {
    Emoji::new(name, name, url)
}

/// `(kind, emoji name)` of every per-item event, in order.
pub fn item_events(events: &[SyncEvent]) -> Vec<(&'static str, String)> {
    events
        .iter()
        .filter_map(|e| e.emoji_name().map(|n| (e.kind(), n.to_string())))
        .collect()
}
