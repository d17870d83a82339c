//! SSH-backed session factory.

use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::SessionFactory;
use super::detect::DialectDetector;
use crate::channel::SessionSink;
use crate::driver::{Driver, DriverBuilder, GenericDriver};
use crate::error::Result;
use crate::inventory::HostRecord;
use crate::platform::{PlatformDefinition, PlatformRegistry};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Connection settings shared by every host of a batch.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub port: u16,

    /// Bound for connecting, detection and each command.
    pub timeout: Duration,

    pub host_key_verification: HostKeyVerification,

    pub known_hosts_path: Option<PathBuf>,

    /// Dialect used for every host without its own `platform` column.
    pub platform: Option<String>,

    pub registry: PlatformRegistry,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            port: 22,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            platform: None,
            registry: PlatformRegistry::with_builtin(),
        }
    }
}

/// Opens [`GenericDriver`] sessions over SSH.
///
/// Without a configured dialect the device is probed first on a separate
/// connection, then a fresh session is opened with the detected dialect.
#[derive(Debug, Clone, Default)]
pub struct SshSessionFactory {
    options: SessionOptions,
}

impl SshSessionFactory {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Login-only settings used for detection.
    fn detect_config(&self, host: &HostRecord) -> SshConfig {
        SshConfig {
            host: host.host.clone(),
            port: self.options.port,
            username: host.username.clone(),
            auth: AuthMethod::Password(copy_secret(&host.password)),
            timeout: self.options.timeout,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: self.options.host_key_verification,
            known_hosts_path: self.options.known_hosts_path.clone(),
        }
    }

    async fn resolve_platform(&self, host: &HostRecord) -> Result<&PlatformDefinition> {
        let forced = host.platform.as_deref().or(self.options.platform.as_deref());
        match forced {
            Some(name) => self.options.registry.require(name),
            None => {
                let config = self.detect_config(host);
                DialectDetector::new(&self.options.registry)
                    .detect_over_ssh(&config)
                    .await
            }
        }
    }
}

impl SessionFactory for SshSessionFactory {
    type Session = GenericDriver;

    async fn open(
        &self,
        host: &HostRecord,
        session_log: Option<SessionSink>,
    ) -> Result<GenericDriver> {
        let platform = self.resolve_platform(host).await?;
        debug!("{}: using {}", host.host, platform.name);

        let mut builder = DriverBuilder::new(host.host.clone())
            .port(self.options.port)
            .username(host.username.clone())
            .password(host.password.expose_secret())
            .platform(platform.clone())
            .timeout(self.options.timeout)
            .host_key_verification(self.options.host_key_verification);

        if let Some(secret) = &host.secret {
            builder = builder.secret(secret.expose_secret());
        }
        if let Some(path) = &self.options.known_hosts_path {
            builder = builder.known_hosts_path(path.clone());
        }
        if let Some(sink) = session_log {
            builder = builder.session_log(sink);
        }

        let mut driver = builder.build()?;
        driver.open().await?;

        if let Err(e) = driver.elevate().await {
            if let Err(close_err) = driver.close().await {
                debug!("{}: close after failed elevation: {}", host.host, close_err);
            }
            return Err(e);
        }

        Ok(driver)
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
