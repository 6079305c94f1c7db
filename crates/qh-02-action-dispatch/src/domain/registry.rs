//! The action registry.
//!
//! Built once at startup and never mutated afterwards, so lookups need no
//! locking.

use std::collections::HashMap;
use std::sync::Arc;

use super::action::{Action, ActionTag};
use crate::actions::LoginAction;

/// Read-only mapping from action tag to implementation.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<ActionTag, Arc<dyn Action>>,
}

impl ActionRegistry {
    /// Registry with every built-in action.
    #[must_use]
    pub fn standard() -> Self {
        Self::builder()
            .register(ActionTag::LoginUser, Arc::new(LoginAction::default()))
            .build()
    }

    #[must_use]
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::default()
    }

    /// Look up an action by its wire name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<(ActionTag, &Arc<dyn Action>)> {
        let tag = name.parse::<ActionTag>().ok()?;
        self.actions.get(&tag).map(|action| (tag, action))
    }

    #[must_use]
    pub fn contains(&self, tag: ActionTag) -> bool {
        self.actions.contains_key(&tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Collects registrations before the registry is frozen.
#[derive(Default)]
pub struct ActionRegistryBuilder {
    actions: HashMap<ActionTag, Arc<dyn Action>>,
}

impl ActionRegistryBuilder {
    /// Register `action` under `tag`, replacing any earlier registration.
    #[must_use]
    pub fn register(mut self, tag: ActionTag, action: Arc<dyn Action>) -> Self {
        self.actions.insert(tag, action);
        self
    }

    #[must_use]
    pub fn build(self) -> ActionRegistry {
        ActionRegistry {
            actions: self.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_serves_login() {
        let registry = ActionRegistry::standard();
        assert!(registry.contains(ActionTag::LoginUser));
        assert_eq!(registry.len(), ActionTag::ALL.len());

        let (tag, _) = registry.resolve("LoginUser").unwrap();
        assert_eq!(tag, ActionTag::LoginUser);
    }

    #[test]
    fn test_unknown_name_does_not_resolve() {
        let registry = ActionRegistry::standard();
        assert!(registry.resolve("DeleteUser").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_known_tag_without_registration_does_not_resolve() {
        let registry = ActionRegistry::builder().build();
        assert!(registry.is_empty());
        assert!(registry.resolve("LoginUser").is_none());
    }
}
