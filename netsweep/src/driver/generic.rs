//! Generic driver implementation that works with any platform.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use memchr::memrchr;
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::Driver;
use super::privilege::{PrivilegeManager, Transition};
use super::response::Response;
use crate::channel::patterns::{self, GENERIC_PROMPT};
use crate::channel::{PtyChannel, PtyConfig, SessionSink};
use crate::error::{ChannelError, DriverError, Result};
use crate::platform::{DefaultBehavior, PlatformDefinition, VendorBehavior};
use crate::transport::{AuthMethod, SshConfig, SshTransport};

/// Driver for any device described by a [`PlatformDefinition`].
///
/// Owns one SSH connection and one interactive shell channel on it. Every
/// read is bounded by the configured timeout, so a silent device surfaces
/// as a timeout error instead of a hang.
pub struct GenericDriver {
    ssh_config: SshConfig,

    platform: PlatformDefinition,

    behavior: Arc<dyn VendorBehavior>,

    /// Secret for escalation prompts.
    secret: Option<SecretString>,

    /// Handed to the channel on open.
    session_log: Option<SessionSink>,

    transport: Option<SshTransport>,

    channel: Option<PtyChannel>,

    privilege_manager: PrivilegeManager,

    timeout: Duration,

    /// Matches the prompt of any privilege level.
    prompt_pattern: Regex,

    /// Last prompt seen.
    prompt: String,
}

impl GenericDriver {
    pub fn new(
        ssh_config: SshConfig,
        platform: PlatformDefinition,
        secret: Option<SecretString>,
        session_log: Option<SessionSink>,
    ) -> Result<Self> {
        let prompt_pattern = patterns::combine(
            platform
                .privilege_levels
                .values()
                .map(|level| level.pattern.as_str()),
        )
        .map_err(ChannelError::from)?;

        let behavior = platform
            .behavior
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultBehavior));

        Ok(Self {
            timeout: ssh_config.timeout,
            privilege_manager: PrivilegeManager::new(platform.privilege_levels.clone()),
            ssh_config,
            platform,
            behavior,
            secret,
            session_log,
            transport: None,
            channel: None,
            prompt_pattern,
            prompt: String::new(),
        })
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    pub fn prompt_pattern(&self) -> &Regex {
        &self.prompt_pattern
    }

    pub fn privilege_manager(&self) -> &PrivilegeManager {
        &self.privilege_manager
    }

    async fn open_inner(&mut self) -> Result<()> {
        let transport = SshTransport::connect(&self.ssh_config).await?;
        let transport = self.transport.insert(transport);
        let channel = transport.open_channel().await?;

        let config = PtyConfig {
            timeout: self.timeout,
            ..PtyConfig::default()
        };
        let channel = self
            .channel
            .insert(PtyChannel::new(channel, config, self.session_log.take()));

        // The dialect's own patterns are not trusted until the prompt is seen
        let data = channel.read_until(&GENERIC_PROMPT).await?;
        let prompt = trailing_prompt(&data);
        let level = self.privilege_manager.update_from_prompt(&prompt)?;
        debug!(
            "{}: initial prompt '{}' is {}",
            self.ssh_config.host, prompt, level
        );
        self.prompt = prompt;

        for command in self.platform.on_open_commands.clone() {
            let response = self.send_command(&command).await?;
            if let Some(failure) = response.failure_message {
                warn!(
                    "{}: on-open command '{}' rejected: {}",
                    self.ssh_config.host, command, failure
                );
            }
        }

        Ok(())
    }

    /// Send a transition command and answer a secret prompt if one shows up.
    async fn run_transition(&mut self, transition: &Transition, to: &str) -> Result<Vec<u8>> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        channel.send(&transition.command).await?;

        let Some(auth) = &transition.auth_prompt else {
            return channel.read_after_input(&self.prompt_pattern).await;
        };

        // Some devices skip the password prompt (no enable secret set)
        let auth_or_prompt = patterns::combine([auth.as_str(), self.prompt_pattern.as_str()])
            .map_err(ChannelError::from)?;
        let data = channel.read_after_input(&auth_or_prompt).await?;
        if !auth.is_match(last_line(&data)) {
            return Ok(data);
        }

        let failed = || DriverError::PrivilegeAcquisitionFailed {
            target: to.to_string(),
        };
        let secret = escalation_secret(self.secret.as_ref(), &self.ssh_config.auth)
            .ok_or_else(failed)?;
        trace!("{}: answering escalation prompt", self.ssh_config.host);
        channel.send(secret).await?;

        let data = channel.read_until(&auth_or_prompt).await?;
        if auth.is_match(last_line(&data)) {
            // Asked again: the secret was rejected
            return Err(failed().into());
        }
        Ok(data)
    }
}

impl Driver for GenericDriver {
    async fn open(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let result = self.open_inner().await;
        if result.is_err() {
            if let Err(e) = self.close().await {
                debug!("{}: close after failed open: {}", self.ssh_config.host, e);
            }
        }
        result
    }

    async fn close(&mut self) -> Result<()> {
        self.privilege_manager.reset();

        let channel_result = match self.channel.take() {
            Some(channel) => channel.close().await,
            None => Ok(()),
        };
        let transport_result = match self.transport.take() {
            Some(transport) => transport.close().await,
            None => Ok(()),
        };

        channel_result.and(transport_result)
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        let start = Instant::now();
        channel.send(command).await?;
        let data = channel.read_after_input(&self.prompt_pattern).await?;
        let elapsed = start.elapsed();

        let raw_result = String::from_utf8_lossy(&data).into_owned();
        let prompt = trailing_prompt(&data);

        match self.privilege_manager.update_from_prompt(&prompt) {
            Ok(level) => trace!("{}: at {}", self.ssh_config.host, level),
            Err(e) => debug!("{}: {}", self.ssh_config.host, e),
        }

        let result = self
            .behavior
            .post_process_output(&self.behavior.normalize_output(&raw_result, command));

        let response = Response::new(command, result, raw_result, prompt.clone(), elapsed);
        self.prompt = prompt;

        Ok(match self.platform.failure_in(&response.result) {
            Some(pattern) => response.with_failure(pattern),
            None => response,
        })
    }

    async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        let current = self
            .privilege_manager
            .current_name()
            .ok_or_else(|| DriverError::UnknownPrivilege {
                prompt: self.prompt.clone(),
            })?
            .to_string();

        if current == target {
            return Ok(());
        }

        let path = self.privilege_manager.find_path(&current, target)?;

        for step in path.windows(2) {
            let (from, to) = (&step[0], &step[1]);
            let transition = self
                .privilege_manager
                .get_transition(from, to)
                .ok_or_else(|| DriverError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                })?;

            debug!(
                "{}: {} -> {} via '{}'",
                self.ssh_config.host, from, to, transition.command
            );

            let data = self.run_transition(&transition, to).await?;
            let prompt = trailing_prompt(&data);
            let reached = self.privilege_manager.update_from_prompt(&prompt)?.to_string();
            self.prompt = prompt;

            if reached != *to {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: to.clone() }.into());
            }
        }

        Ok(())
    }

    async fn elevate(&mut self) -> Result<()> {
        let target = self.platform.default_privilege.clone();
        if target.is_empty() {
            return Ok(());
        }

        let current = self
            .privilege_manager
            .current_name()
            .ok_or(DriverError::NotConnected)?;

        if self.privilege_manager.is_at_or_above(current, &target) {
            return Ok(());
        }

        self.acquire_privilege(&target).await
    }

    fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn platform_name(&self) -> &str {
        &self.platform.name
    }
}

fn last_line(data: &[u8]) -> &[u8] {
    match memrchr(b'\n', data) {
        Some(pos) => &data[pos + 1..],
        None => data,
    }
}

/// The prompt is the last line of a read that ended on a prompt match.
fn trailing_prompt(data: &[u8]) -> String {
    String::from_utf8_lossy(last_line(data)).trim().to_string()
}

/// Enable secret, or the login password when no secret was given.
fn escalation_secret<'a>(secret: Option<&'a SecretString>, auth: &'a AuthMethod) -> Option<&'a str> {
    match (secret, auth) {
        (Some(secret), _) => Some(secret.expose_secret()),
        (None, AuthMethod::Password(password)) => Some(password.expose_secret()),
        (None, _) => None,
    }
}
