//! Platform definitions for multi-vendor support.
//!
//! This module defines vendor-specific configurations including
//! prompt patterns, privilege levels, detection signatures and output
//! post-processing.

mod definition;
mod privilege_level;
mod registry;
pub mod vendors;

pub use definition::{DetectSignature, PlatformDefinition};
pub use privilege_level::PrivilegeLevel;
pub use registry::PlatformRegistry;

/// Trait for vendor-specific output handling.
pub trait VendorBehavior: Send + Sync {
    /// Normalize command output (strip command echo, trailing prompt).
    fn normalize_output(&self, raw: &str, command: &str) -> String {
        strip_echo_and_prompt(raw, command)
    }

    /// Clean up normalized output (drop context lines and the like).
    fn post_process_output(&self, output: &str) -> String {
        output.to_string()
    }
}

/// Default vendor behavior implementation.
pub struct DefaultBehavior;

impl VendorBehavior for DefaultBehavior {}

/// Strip the echoed command from the front and the prompt line from the end.
pub fn strip_echo_and_prompt(raw: &str, command: &str) -> String {
    let output = raw.trim_start_matches(['\r', '\n']);
    let output = output
        .strip_prefix(command)
        .unwrap_or(output)
        .trim_start_matches(['\r', '\n']);

    match output.rfind('\n') {
        Some(pos) => output[..pos].trim_end_matches(['\r', '\n']).to_string(),
        // Only the prompt came back
        None => String::new(),
    }
}
