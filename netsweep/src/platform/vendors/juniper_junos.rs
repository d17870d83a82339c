//! Juniper JUNOS platform definition.
//!
//! ```text
//! user@router>              # exec (operational mode)
//! user@router#              # configuration
//! user@router%              # shell
//! root@router:RE:0%         # root_shell
//! ```
//!
//! JUNOS starts in operational mode, which is where commands are run; there
//! is nothing to escalate to.

use std::sync::Arc;

use crate::platform::{DetectSignature, PlatformDefinition, PrivilegeLevel, VendorBehavior};

/// Platform name for Juniper JUNOS.
pub const PLATFORM_NAME: &str = "juniper_junos";

/// Create the Juniper JUNOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new(
        "exec",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\n)?[\w\-@()/:\.]{1,63}>\s?$",
    )
    .unwrap();

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\[edit\]\n)?[\w\-@()/:\.]{1,63}#\s?$",
    )
    .unwrap()
    .with_parent("exec")
    .with_escalate("configure")
    .with_deescalate("exit configuration-mode");

    let shell = PrivilegeLevel::new("shell", r"(?mi)^.*[%$]\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("start shell")
        .with_deescalate("exit")
        .with_not_contains("root");

    let root_shell = PrivilegeLevel::new("root_shell", r"(?mi)^.*root@(?:\S*:?\S*\s?)?[%#]\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("start shell user root")
        .with_deescalate("exit")
        .with_auth(r"(?i)^password:\s?$")
        .unwrap();

    let signature = DetectSignature::new(
        "show version",
        &[
            r"JUNOS Software Release",
            r"JUNOS .+ Software",
            r"JUNOS OS Kernel",
            r"JUNOS Base Version",
        ],
        99,
    )
    .unwrap();

    // root_shell before configuration so `root@fw#` is not taken for config mode
    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(root_shell)
        .with_privilege(configuration)
        .with_privilege(shell)
        .with_default_privilege("exec")
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("is ambiguous")
        .with_failure_pattern("No valid completions")
        .with_failure_pattern("missing argument")
        .with_on_open_command("set cli screen-length 0")
        .with_on_open_command("set cli screen-width 511")
        .with_terminal_size(511, 24)
        .with_signature(signature)
        .with_behavior(Arc::new(JunosBehavior))
}

/// Drops the `[edit ...]` context lines JUNOS prints around output.
pub struct JunosBehavior;

impl VendorBehavior for JunosBehavior {
    fn post_process_output(&self, output: &str) -> String {
        output
            .lines()
            .filter(|line| !line.trim_start().starts_with("[edit"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
