//! Registry of known dialects.

use indexmap::IndexMap;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::error::{PlatformError, Result};

/// Registry for platform definitions.
///
/// Owned by whoever opens sessions; there is no process-wide instance.
/// Registration order is kept and breaks ties between equal detection
/// priorities.
#[derive(Debug, Default, Clone)]
pub struct PlatformRegistry {
    platforms: IndexMap<String, PlatformDefinition>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in dialects.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for platform in [
            vendors::cisco_ios::platform(),
            vendors::arista_eos::platform(),
            vendors::juniper_junos::platform(),
            vendors::linux::platform(),
        ] {
            registry.platforms.insert(platform.name.clone(), platform);
        }
        registry
    }

    /// Register a platform definition.
    pub fn register(&mut self, platform: PlatformDefinition) -> Result<()> {
        if self.platforms.contains_key(&platform.name) {
            return Err(PlatformError::AlreadyRegistered {
                name: platform.name.clone(),
            }
            .into());
        }
        self.platforms.insert(platform.name.clone(), platform);
        Ok(())
    }

    /// Get a platform by name.
    pub fn get(&self, name: &str) -> Option<&PlatformDefinition> {
        self.platforms.get(name)
    }

    /// Get a platform by name or fail with `UnknownPlatform`.
    pub fn require(&self, name: &str) -> Result<&PlatformDefinition> {
        self.get(name).ok_or_else(|| {
            PlatformError::UnknownPlatform {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Check if a platform is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.platforms.contains_key(name)
    }

    /// List all registered platform names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.platforms.keys()
    }

    /// Platforms with a detection signature, highest priority first.
    pub fn detectable(&self) -> Vec<&PlatformDefinition> {
        let mut found: Vec<_> = self
            .platforms
            .values()
            .filter(|p| p.signature.is_some())
            .collect();
        // sort_by_key is stable, registration order breaks ties
        found.sort_by_key(|p| {
            std::cmp::Reverse(p.signature.as_ref().map(|s| s.priority).unwrap_or(0))
        });
        found
    }
}
