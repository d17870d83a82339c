//! Reachability probe run after a host fails.
//!
//! The verdict only annotates the failure line; it never changes the
//! host's outcome.

mod icmp;

pub use icmp::IcmpProber;

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Default bound for one probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Checks whether a host answers at all.
pub trait Prober: Send + Sync {
    /// Probe `host`. Never fails; problems are reported in the verdict.
    fn probe(&self, host: &str) -> impl Future<Output = ProbeVerdict> + Send;
}

/// What the probe found out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Echo reply received.
    Reachable { rtt: Duration },

    /// No reply within the bound, or the network reported the host unreachable.
    Unreachable(String),

    /// The probe itself could not be carried out.
    ProbeError(ProbeFailure),
}

/// Why a probe could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Raw or ICMP datagram sockets are not permitted for this process.
    InsufficientPrivilege,

    /// The host name did not resolve.
    Resolve(String),

    Other(String),
}

impl ProbeVerdict {
    /// Short label used in console lines.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeVerdict::Reachable { .. } => "reachable",
            ProbeVerdict::Unreachable(_) => "unreachable",
            ProbeVerdict::ProbeError(_) => "probe-error",
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeVerdict::Reachable { .. })
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeVerdict::Reachable { rtt } => write!(f, "reachable ({:.1?})", rtt),
            ProbeVerdict::Unreachable(reason) => write!(f, "unreachable ({})", reason),
            ProbeVerdict::ProbeError(failure) => write!(f, "probe-error ({})", failure),
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::InsufficientPrivilege => write!(f, "insufficient privilege"),
            ProbeFailure::Resolve(reason) => write!(f, "cannot resolve: {}", reason),
            ProbeFailure::Other(reason) => write!(f, "{}", reason),
        }
    }
}
