//! Error types for netsweep.
//!
//! Session errors are layered the same way the stack is layered
//! (transport, channel, driver, platform). Every error can be reduced to a
//! [`FailureKind`], which is what the batch orchestrator classifies on.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netsweep operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/dialect errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Host or command table could not be loaded
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Log artifact could not be created, written or renamed
    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host not present in known_hosts under strict verification
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, privilege escalation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown privilege level detected
    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },
}

/// Platform/dialect errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Platform name not present in the registry
    #[error("Unknown platform '{name}'")]
    UnknownPlatform { name: String },

    /// Platform name registered twice
    #[error("Platform '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// Autodetection sampled the device but no signature matched
    #[error("No dialect matched the output of {host}")]
    DetectionFailed { host: String },
}

/// Host and command table loading errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Table could not be opened or parsed
    #[error("Failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required cell was empty
    #[error("{path}: row {row} has an empty '{field}' column")]
    MissingField {
        path: PathBuf,
        row: usize,
        field: &'static str,
    },
}

/// Log artifact errors. These are fatal for a batch.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Batch directory could not be created
    #[error("Cannot create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Per-host artifact could not be created
    #[error("Cannot create log file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to an artifact failed
    #[error("Cannot write log file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renaming an artifact on finalize failed
    #[error("Cannot rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Closed set of failure categories a host run can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Login credentials or enable secret rejected.
    Authentication,
    /// No answer within the configured bound.
    Timeout,
    /// Session is inconsistent with the expected protocol or dialect.
    Protocol,
    /// Anything else.
    Unclassified,
}

impl Error {
    /// Reduce this error to the category the orchestrator reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Transport(e) => match e {
                TransportError::AuthenticationFailed { .. } => FailureKind::Authentication,
                TransportError::Timeout(_) | TransportError::ConnectionFailed { .. } => {
                    FailureKind::Timeout
                }
                TransportError::Io(io) if io.kind() == io::ErrorKind::TimedOut => {
                    FailureKind::Timeout
                }
                TransportError::Ssh(russh::Error::IO(io))
                    if io.kind() == io::ErrorKind::TimedOut =>
                {
                    FailureKind::Timeout
                }
                TransportError::Ssh(russh::Error::InactivityTimeout) => FailureKind::Timeout,
                TransportError::Ssh(_)
                | TransportError::HostKeyChanged { .. }
                | TransportError::HostKeyUnknown { .. }
                | TransportError::Disconnected => FailureKind::Protocol,
                TransportError::KnownHosts(_) | TransportError::Io(_) => {
                    FailureKind::Unclassified
                }
            },
            Error::Channel(e) => match e {
                ChannelError::PatternTimeout(_) => FailureKind::Timeout,
                ChannelError::PtyOpenFailed | ChannelError::Closed | ChannelError::Ssh(_) => {
                    FailureKind::Protocol
                }
                ChannelError::InvalidPattern(_) => FailureKind::Unclassified,
            },
            Error::Driver(e) => match e {
                DriverError::PrivilegeAcquisitionFailed { .. } => FailureKind::Authentication,
                DriverError::UnknownPrivilege { .. } | DriverError::NoPrivilegePath { .. } => {
                    FailureKind::Protocol
                }
                DriverError::NotConnected => FailureKind::Protocol,
                DriverError::AlreadyConnected | DriverError::InvalidConfig { .. } => {
                    FailureKind::Unclassified
                }
            },
            Error::Platform(_) | Error::Inventory(_) | Error::Recorder(_) => {
                FailureKind::Unclassified
            }
        }
    }
}

/// Result type alias using netsweep's Error.
pub type Result<T> = std::result::Result<T, Error>;
