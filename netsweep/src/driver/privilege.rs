//! Privilege level tracking and navigation.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{DriverError, Result};
use crate::platform::PrivilegeLevel;

/// Tracks the current privilege level and plans moves between levels.
///
/// Levels form a tree through `previous_priv`. A move between two levels
/// climbs from the start to their closest common ancestor and then descends
/// to the target, one escalate or de-escalate command per edge.
#[derive(Debug)]
pub struct PrivilegeManager {
    levels: IndexMap<String, PrivilegeLevel>,

    /// Unknown until the first prompt has been read.
    current: Option<String>,
}

impl PrivilegeManager {
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// Determine the privilege level a prompt belongs to.
    ///
    /// Levels are tried in definition order; the first match wins.
    pub fn determine_from_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Resolve `prompt` and make its level the current one.
    pub fn update_from_prompt(&mut self, prompt: &str) -> Result<&str> {
        let name = self.determine_from_prompt(prompt)?.name.clone();
        self.current = Some(name);
        Ok(self.current.as_deref().unwrap_or_default())
    }

    pub fn current(&self) -> Option<&PrivilegeLevel> {
        self.current.as_ref().and_then(|name| self.levels.get(name))
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn get(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.levels.get(name)
    }

    /// `name` followed by its parents up to the root.
    fn ancestors<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = vec![];
        let mut next = Some(name);
        // bounded by the number of levels so a cyclic definition cannot spin
        while let Some(level) = next.and_then(|n| self.levels.get(n)) {
            if chain.len() > self.levels.len() {
                break;
            }
            chain.push(level.name.as_str());
            next = level.previous_priv.as_deref();
        }
        chain
    }

    /// Whether `current` is `target` or one of its descendants.
    pub fn is_at_or_above(&self, current: &str, target: &str) -> bool {
        self.ancestors(current).contains(&target)
    }

    /// Levels to walk through from `from` to `to`, both included.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let up = self.ancestors(from);
        let down = self.ancestors(to);

        let no_path = || DriverError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        };
        if up.is_empty() || down.is_empty() {
            return Err(no_path().into());
        }

        let (climb, common) = up
            .iter()
            .enumerate()
            .find_map(|(i, name)| down.iter().position(|d| d == name).map(|j| (i, j)))
            .ok_or_else(no_path)?;

        let path = up[..=climb]
            .iter()
            .chain(down[..common].iter().rev())
            .map(|name| name.to_string())
            .collect();
        Ok(path)
    }

    /// The command that moves between two adjacent levels.
    pub fn get_transition(&self, from: &str, to: &str) -> Option<Transition> {
        let from_level = self.levels.get(from)?;
        let to_level = self.levels.get(to)?;

        if to_level.previous_priv.as_deref() == Some(from) {
            return Some(Transition {
                command: to_level.escalate_command.clone()?,
                auth_prompt: to_level.escalate_prompt.clone(),
            });
        }

        if from_level.previous_priv.as_deref() == Some(to) {
            return Some(Transition {
                command: from_level.deescalate_command.clone()?,
                auth_prompt: None,
            });
        }

        None
    }
}

/// One step between adjacent privilege levels.
#[derive(Debug, Clone)]
pub struct Transition {
    pub command: String,

    /// Set when the device asks for a secret after `command`.
    pub auth_prompt: Option<Regex>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // exec -> privilege_exec -> configuration, plus exec -> shell
    fn levels() -> IndexMap<String, PrivilegeLevel> {
        let exec = PrivilegeLevel::new("exec", r">\s?$").unwrap();
        let privilege_exec = PrivilegeLevel::new("privilege_exec", r"#\s?$")
            .unwrap()
            .with_parent("exec")
            .with_escalate("enable")
            .with_deescalate("disable")
            .with_auth(r"(?i)password:\s?$")
            .unwrap()
            .with_not_contains("(config");
        let configuration = PrivilegeLevel::new("configuration", r"\(config[^)]*\)#\s?$")
            .unwrap()
            .with_parent("privilege_exec")
            .with_escalate("configure terminal")
            .with_deescalate("end");
        let shell = PrivilegeLevel::new("shell", r"%\s?$")
            .unwrap()
            .with_parent("exec")
            .with_escalate("start shell")
            .with_deescalate("exit");

        [exec, privilege_exec, configuration, shell]
            .into_iter()
            .map(|l| (l.name.clone(), l))
            .collect()
    }

    #[test]
    fn test_determine_from_prompt() {
        let manager = PrivilegeManager::new(levels());
        assert_eq!(manager.determine_from_prompt("edge1>").unwrap().name, "exec");
        assert_eq!(
            manager.determine_from_prompt("edge1#").unwrap().name,
            "privilege_exec"
        );
        assert_eq!(
            manager.determine_from_prompt("edge1(config-if)#").unwrap().name,
            "configuration"
        );
        assert!(manager.determine_from_prompt("Username:").is_err());
    }

    #[test]
    fn test_update_from_prompt() {
        let mut manager = PrivilegeManager::new(levels());
        assert!(manager.current().is_none());
        assert_eq!(manager.update_from_prompt("edge1#").unwrap(), "privilege_exec");
        assert_eq!(manager.current_name(), Some("privilege_exec"));
        manager.reset();
        assert!(manager.current_name().is_none());
    }

    #[test]
    fn test_find_path() {
        let manager = PrivilegeManager::new(levels());
        assert_eq!(
            manager.find_path("exec", "configuration").unwrap(),
            vec!["exec", "privilege_exec", "configuration"]
        );
        assert_eq!(
            manager.find_path("configuration", "exec").unwrap(),
            vec!["configuration", "privilege_exec", "exec"]
        );
        assert_eq!(
            manager.find_path("configuration", "shell").unwrap(),
            vec!["configuration", "privilege_exec", "exec", "shell"]
        );
        assert_eq!(manager.find_path("exec", "exec").unwrap(), vec!["exec"]);
        assert!(manager.find_path("exec", "root").is_err());
    }

    #[test]
    fn test_is_at_or_above() {
        let manager = PrivilegeManager::new(levels());
        assert!(manager.is_at_or_above("privilege_exec", "privilege_exec"));
        assert!(manager.is_at_or_above("configuration", "privilege_exec"));
        assert!(!manager.is_at_or_above("exec", "privilege_exec"));
        assert!(!manager.is_at_or_above("shell", "privilege_exec"));
    }

    #[test]
    fn test_get_transition() {
        let manager = PrivilegeManager::new(levels());

        let up = manager.get_transition("exec", "privilege_exec").unwrap();
        assert_eq!(up.command, "enable");
        assert!(up.auth_prompt.is_some());

        let down = manager.get_transition("privilege_exec", "exec").unwrap();
        assert_eq!(down.command, "disable");
        assert!(down.auth_prompt.is_none());

        assert!(manager.get_transition("exec", "configuration").is_none());
    }
}
