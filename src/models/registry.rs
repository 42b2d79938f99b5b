//! Process-wide registry of persisted models.
//!
//! Built once at startup by [`init`] and read-only afterwards. The persistence
//! layer resolves table names through it instead of hard-coding them.

use std::collections::HashMap;
use std::sync::OnceLock;

pub const CONVERSATION: &str = "Conversation";
pub const MEMORY: &str = "Memory";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDefinition {
    pub name: &'static str,
    pub table: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model {0} is already registered")]
    Duplicate(String),
    #[error("model {0} is not registered")]
    Unknown(String),
}

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<&'static str, ModelDefinition>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every model the service persists.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for definition in [
            ModelDefinition {
                name: CONVERSATION,
                table: "conversations",
            },
            ModelDefinition {
                name: MEMORY,
                table: "memories",
            },
        ] {
            if let Err(err) = registry.register(definition) {
                tracing::error!("Default model registration failed: {}", err);
            }
        }
        registry
    }

    pub fn register(&mut self, definition: ModelDefinition) -> Result<(), RegistryError> {
        if self.models.contains_key(definition.name) {
            return Err(RegistryError::Duplicate(definition.name.to_string()));
        }
        self.models.insert(definition.name, definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    pub fn table(&self, name: &str) -> Result<&'static str, RegistryError> {
        self.get(name)
            .map(|definition| definition.table)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

static REGISTRY: OnceLock<ModelRegistry> = OnceLock::new();

/// Initializes the global registry. Calling it again returns the existing one.
pub fn init() -> &'static ModelRegistry {
    REGISTRY.get_or_init(|| {
        let registry = ModelRegistry::with_defaults();
        tracing::debug!(models = registry.len(), "Model registry initialized");
        registry
    })
}

/// Looks up the table backing `name` in the global registry.
pub fn table(name: &str) -> Result<&'static str, RegistryError> {
    init().table(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_by_name() {
        let registry = ModelRegistry::with_defaults();
        assert_eq!(registry.table(CONVERSATION), Ok("conversations"));
        assert_eq!(registry.table(MEMORY), Ok("memories"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ModelRegistry::with_defaults();
        let err = registry
            .register(ModelDefinition {
                name: MEMORY,
                table: "memories_v2",
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate(MEMORY.to_string()));
        assert_eq!(registry.table(MEMORY), Ok("memories"));
    }

    #[test]
    fn unknown_model_is_an_error() {
        let registry = ModelRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.table("Session"),
            Err(RegistryError::Unknown("Session".to_string()))
        );
    }

    #[test]
    fn init_is_idempotent() {
        let first = init() as *const ModelRegistry;
        let second = init() as *const ModelRegistry;
        assert_eq!(first, second);
        assert_eq!(table(CONVERSATION), Ok("conversations"));
    }
}
