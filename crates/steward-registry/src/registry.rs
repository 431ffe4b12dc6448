use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use steward_core::types::{ChatId, Platform};
use steward_store::state::StateStore;
use steward_store::types::{ChatBinding, ChatBindingType, NotificationLevel};
use tracing::info;

use crate::error::Result;

/// `bind` / `lookup` / `list` — spec.md §4.3. Lookup is O(1) via an
/// in-memory map rebuilt from the state store at startup; writes are
/// write-through.
pub struct ChatRegistry {
    store: std::sync::Arc<StateStore>,
    cache: Mutex<HashMap<(Platform, String), ChatBinding>>,
}

impl ChatRegistry {
    /// Rebuilds the in-memory map from `store` — called once at startup.
    pub fn load(store: std::sync::Arc<StateStore>) -> Result<Self> {
        let bindings = store.list_bindings()?;
        let mut cache = HashMap::new();
        for b in bindings {
            cache.insert((b.platform, b.chat_id.as_str().to_string()), b);
        }
        info!(count = cache.len(), "chat registry loaded");
        Ok(Self {
            store,
            cache: Mutex::new(cache),
        })
    }

    pub fn bind(
        &self,
        platform: Platform,
        chat_id: &ChatId,
        binding_type: ChatBindingType,
        value: &str,
        notification_level: NotificationLevel,
    ) -> Result<ChatBinding> {
        let binding = ChatBinding {
            platform,
            chat_id: chat_id.clone(),
            binding_type,
            value: value.to_string(),
            notification_level,
            registered_at: Utc::now(),
        };
        self.store.bind_chat(&binding)?;
        self.cache
            .lock()
            .unwrap()
            .insert((platform, chat_id.as_str().to_string()), binding.clone());
        Ok(binding)
    }

    pub fn lookup(&self, platform: Platform, chat_id: &ChatId) -> Option<ChatBinding> {
        self.cache
            .lock()
            .unwrap()
            .get(&(platform, chat_id.as_str().to_string()))
            .cloned()
    }

    pub fn list(&self) -> Vec<ChatBinding> {
        self.cache.lock().unwrap().values().cloned().collect()
    }

    /// First-time message from an unknown group chat whose title matches a
    /// known project auto-binds to `type=repo` (spec.md §4.3).
    pub fn maybe_auto_bind(
        &self,
        platform: Platform,
        chat_id: &ChatId,
        chat_title: &str,
        known_projects: &[String],
    ) -> Result<Option<ChatBinding>> {
        if self.lookup(platform, chat_id).is_some() {
            return Ok(None);
        }
        let matched = known_projects.iter().find(|p| chat_title.contains(p.as_str()));
        match matched {
            Some(project) => Ok(Some(self.bind(
                platform,
                chat_id,
                ChatBindingType::Repo,
                project,
                NotificationLevel::All,
            )?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn bind_then_lookup_round_trips() {
        let store = Arc::new(StateStore::in_memory().unwrap());
        let registry = ChatRegistry::load(store).unwrap();
        let chat_id = ChatId::from("c1");
        registry
            .bind(
                Platform::Primary,
                &chat_id,
                ChatBindingType::Repo,
                "projectX",
                NotificationLevel::All,
            )
            .unwrap();
        let found = registry.lookup(Platform::Primary, &chat_id).unwrap();
        assert_eq!(found.value, "projectX");
    }

    #[test]
    fn auto_bind_matches_known_project_title() {
        let store = Arc::new(StateStore::in_memory().unwrap());
        let registry = ChatRegistry::load(store).unwrap();
        let chat_id = ChatId::from("c2");
        let bound = registry
            .maybe_auto_bind(
                Platform::Primary,
                &chat_id,
                "projectX team chat",
                &["projectX".to_string()],
            )
            .unwrap();
        assert!(bound.is_some());
        assert_eq!(
            registry.lookup(Platform::Primary, &chat_id).unwrap().binding_type,
            ChatBindingType::Repo
        );
    }
}
