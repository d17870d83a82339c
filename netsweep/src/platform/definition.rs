//! Platform definition for vendor-specific configurations.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::VendorBehavior;
use super::privilege_level::PrivilegeLevel;

/// Everything the driver needs to know about one device dialect.
#[derive(Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_ios", "juniper_junos").
    pub name: String,

    /// Privilege levels for this platform, in match order.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Level commands are executed from. Elevation targets this level.
    pub default_privilege: String,

    /// Output substrings that mark a command as rejected by the device.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when connection is established (paging off etc).
    pub on_open_commands: Vec<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// How to recognise this platform during autodetection.
    pub signature: Option<DetectSignature>,

    /// Optional vendor-specific behavior.
    pub behavior: Option<Arc<dyn VendorBehavior>>,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
            signature: None,
            behavior: None,
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set the autodetection signature.
    pub fn with_signature(mut self, signature: DetectSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Set vendor behavior.
    pub fn with_behavior(mut self, behavior: Arc<dyn VendorBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Get a privilege level by name.
    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// First failure pattern contained in `output`, if any.
    pub fn failure_in(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .map(String::as_str)
            .find(|pattern| output.contains(pattern))
    }
}

impl fmt::Debug for PlatformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDefinition")
            .field("name", &self.name)
            .field("privilege_levels", &self.privilege_levels.keys())
            .field("default_privilege", &self.default_privilege)
            .field("failed_when_contains", &self.failed_when_contains)
            .field("on_open_commands", &self.on_open_commands)
            .field("signature", &self.signature)
            .field(
                "behavior",
                &self.behavior.as_ref().map(|_| "<VendorBehavior>"),
            )
            .finish()
    }
}

/// Command and output patterns that identify a platform.
///
/// Detection sends `command` on a generic session and checks the output
/// against `patterns`; among matching platforms the highest `priority` wins.
#[derive(Debug, Clone)]
pub struct DetectSignature {
    pub command: String,
    pub patterns: Vec<Regex>,
    pub priority: u8,
}

impl DetectSignature {
    pub fn new(
        command: impl Into<String>,
        patterns: &[&str],
        priority: u8,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            command: command.into(),
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
            priority,
        })
    }

    /// Whether any of the patterns occurs in `output`.
    pub fn matches(&self, output: &[u8]) -> bool {
        self.patterns.iter().any(|p| p.is_match(output))
    }
}
