//! Host and command tables.
//!
//! Both tables are CSV files with a header row. The host table is read into
//! [`HostRecord`]s by column name; the command table contributes the first
//! column of every non-blank row.

use std::fmt;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{InventoryError, Result};

/// One row of the host table.
pub struct HostRecord {
    pub host: String,
    pub username: String,
    pub password: SecretString,
    /// Enable secret; the login password is used when absent.
    pub secret: Option<SecretString>,
    /// Dialect name that skips autodetection.
    pub platform: Option<String>,
}

impl HostRecord {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            secret: None,
            platform: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

impl fmt::Debug for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRecord")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("platform", &self.platform)
            .finish()
    }
}

#[derive(Deserialize)]
struct HostRow {
    #[serde(default)]
    host: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    secret: String,
    #[serde(default)]
    platform: String,
}

/// Ordered list of commands run against every host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList(Vec<String>);

impl CommandList {
    pub fn new(commands: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(commands.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Load the host table. Row order is batch order.
pub fn load_hosts(path: impl AsRef<Path>) -> Result<Vec<HostRecord>> {
    let path = path.as_ref();
    let csv_err = |source| InventoryError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut hosts = vec![];
    for (index, row) in reader.deserialize::<HostRow>().enumerate() {
        let row = row.map_err(csv_err)?;
        // header is line 1
        let line = index + 2;
        let missing = |field| InventoryError::MissingField {
            path: path.to_path_buf(),
            row: line,
            field,
        };

        if row.host.is_empty() {
            return Err(missing("host").into());
        }
        if row.username.is_empty() {
            return Err(missing("username").into());
        }
        if row.password.is_empty() {
            return Err(missing("password").into());
        }

        hosts.push(HostRecord {
            host: row.host,
            username: row.username,
            password: SecretString::from(row.password),
            secret: (!row.secret.is_empty()).then(|| SecretString::from(row.secret)),
            platform: (!row.platform.is_empty()).then_some(row.platform),
        });
    }

    Ok(hosts)
}

/// Load the command table. The header row is discarded and blank rows are skipped.
pub fn load_commands(path: impl AsRef<Path>) -> Result<CommandList> {
    let path = path.as_ref();
    let csv_err = |source| InventoryError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut commands = vec![];
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if let Some(command) = record.get(0).map(str::trim).filter(|c| !c.is_empty()) {
            commands.push(command.to_string());
        }
    }

    Ok(CommandList(commands))
}
