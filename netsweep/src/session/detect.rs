//! Dialect autodetection.
//!
//! Log in on a plain shell, run each distinct signature command once and
//! pick the highest-priority platform whose signature matches the output.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use russh::Channel;
use russh::client::Msg;

use crate::channel::patterns::{self, GENERIC_PROMPT, PAGER_PROMPT};
use crate::channel::{PtyChannel, PtyConfig};
use crate::error::{ChannelError, PlatformError, Result};
use crate::platform::{PlatformDefinition, PlatformRegistry};
use crate::transport::{SshConfig, SshTransport};

/// Upper bound on pager prompts answered for one sample.
const MAX_PAGES: usize = 8;

/// Runs a command on a not yet identified device and returns its output.
pub trait Sampler: Send {
    fn sample(&mut self, command: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Picks a platform from the registry by probing the device.
pub struct DialectDetector<'a> {
    registry: &'a PlatformRegistry,
}

impl<'a> DialectDetector<'a> {
    pub fn new(registry: &'a PlatformRegistry) -> Self {
        Self { registry }
    }

    /// Walk the signatures in priority order and return the first match.
    ///
    /// Outputs are cached per command, so platforms sharing a command
    /// (`show version`) cost one round trip.
    pub async fn detect<S: Sampler>(
        &self,
        host: &str,
        sampler: &mut S,
    ) -> Result<&'a PlatformDefinition> {
        let mut outputs: HashMap<String, Vec<u8>> = HashMap::new();

        for platform in self.registry.detectable() {
            let Some(signature) = &platform.signature else {
                continue;
            };

            if !outputs.contains_key(&signature.command) {
                let output = sampler.sample(&signature.command).await?;
                trace!(
                    "{}: '{}' returned {} bytes",
                    host,
                    signature.command,
                    output.len()
                );
                outputs.insert(signature.command.clone(), output);
            }

            let matched = outputs
                .get(&signature.command)
                .is_some_and(|output| signature.matches(output));
            if matched {
                debug!("{}: detected {}", host, platform.name);
                return Ok(platform);
            }
        }

        Err(PlatformError::DetectionFailed {
            host: host.to_string(),
        }
        .into())
    }

    /// Open a throwaway SSH session to `config.host` and detect over it.
    pub async fn detect_over_ssh(&self, config: &SshConfig) -> Result<&'a PlatformDefinition> {
        let transport = SshTransport::connect(config).await?;
        let result = self.detect_on(&transport, config).await;
        if let Err(e) = transport.close().await {
            debug!("{}: closing detection session: {}", config.host, e);
        }
        result
    }

    async fn detect_on(
        &self,
        transport: &SshTransport,
        config: &SshConfig,
    ) -> Result<&'a PlatformDefinition> {
        let channel = transport.open_channel().await?;
        let mut sampler = ShellSampler::start(channel, config.timeout).await?;
        let result = self.detect(&config.host, &mut sampler).await;
        if let Err(e) = sampler.channel.close().await {
            debug!("{}: closing detection channel: {}", config.host, e);
        }
        result
    }
}

/// [`Sampler`] over an interactive shell that only knows generic prompts.
struct ShellSampler {
    channel: PtyChannel,
    prompt_or_pager: Regex,
}

impl ShellSampler {
    /// Wait for the first prompt after login.
    async fn start(channel: Channel<Msg>, timeout: Duration) -> Result<Self> {
        let config = PtyConfig {
            timeout,
            ..PtyConfig::default()
        };
        let mut channel = PtyChannel::new(channel, config, None);
        channel.read_until(&GENERIC_PROMPT).await?;

        let prompt_or_pager = patterns::combine([GENERIC_PROMPT.as_str(), PAGER_PROMPT.as_str()])
            .map_err(ChannelError::from)?;

        Ok(Self {
            channel,
            prompt_or_pager,
        })
    }
}

impl Sampler for ShellSampler {
    async fn sample(&mut self, command: &str) -> Result<Vec<u8>> {
        self.channel.send(command).await?;
        let mut output = self.channel.read_after_input(&self.prompt_or_pager).await?;

        // Paging is still on at this point; quit the pager, the first page is enough
        for _ in 0..MAX_PAGES {
            if !PAGER_PROMPT.is_match(&output) {
                break;
            }
            self.channel.write_raw(b"q").await?;
            let rest = self.channel.read_until(&self.prompt_or_pager).await?;
            output.extend_from_slice(&rest);
        }

        Ok(output)
    }
}
