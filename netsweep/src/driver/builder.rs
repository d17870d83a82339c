//! Builder for creating device drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::generic::GenericDriver;
use crate::channel::SessionSink;
use crate::error::{DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Builder for constructing a [`GenericDriver`].
///
/// ```rust,no_run
/// use netsweep::driver::{Driver, DriverBuilder};
/// use netsweep::platform::vendors::cisco_ios;
///
/// # async fn example() -> Result<(), netsweep::Error> {
/// let mut driver = DriverBuilder::new("192.0.2.1")
///     .username("admin")
///     .password("secret")
///     .secret("enable-secret")
///     .platform(cisco_ios::platform())
///     .build()?;
///
/// driver.open().await?;
/// driver.elevate().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    secret: Option<SecretString>,
    platform: Option<PlatformDefinition>,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    session_log: Option<SessionSink>,
}

impl DriverBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            secret: None,
            platform: None,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            session_log: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Secret sent when escalation asks for a password (`enable`).
    ///
    /// Without one the login password is tried.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the device dialect.
    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Bound for connecting and for every read.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Tee every byte received from the device into `sink`.
    pub fn session_log(mut self, sink: SessionSink) -> Self {
        self.session_log = Some(sink);
        self
    }

    /// Build the driver.
    ///
    /// Does not connect; call `open()` on the returned driver.
    pub fn build(self) -> Result<GenericDriver> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "username is required".to_string(),
        })?;

        let platform = self.platform.ok_or_else(|| DriverError::InvalidConfig {
            message: "platform must be specified".to_string(),
        })?;

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            terminal_width: platform.terminal_width,
            terminal_height: platform.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        GenericDriver::new(ssh_config, platform, self.secret, self.session_log)
    }
}
