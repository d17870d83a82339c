//! Linux platform definition.
//!
//! Standard shells with `$` (user) and `#` (root) prompts. Commands run as
//! the login user, so sessions are never elevated to root.

use crate::platform::{DetectSignature, PlatformDefinition, PrivilegeLevel};

/// Platform name for Linux hosts.
pub const PLATFORM_NAME: &str = "linux";

/// Create the Linux platform definition.
pub fn platform() -> PlatformDefinition {
    let user = PrivilegeLevel::new("user", r"[$]\s*$").unwrap();

    let root = PrivilegeLevel::new("root", r"[#]\s*$")
        .unwrap()
        .with_parent("user")
        .with_escalate("sudo -i")
        .with_deescalate("exit")
        .with_auth(r"[Pp]assword[^:\n]*:\s*$")
        .unwrap();

    let signature = DetectSignature::new("uname -a", &[r"Linux"], 50).unwrap();

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(user)
        .with_privilege(root)
        .with_default_privilege("user")
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
        .with_failure_pattern("Operation not permitted")
        .with_terminal_size(511, 24)
        .with_signature(signature)
}
