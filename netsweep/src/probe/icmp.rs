//! ICMP echo probe.

use std::future::Future;
use std::io;
use std::net::IpAddr;
use std::time::Duration;

use log::debug;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::time::Instant;

use super::{DEFAULT_PROBE_TIMEOUT, ProbeFailure, ProbeVerdict, Prober};

const PAYLOAD: [u8; 56] = [0; 56];

/// Sends a single ICMP echo request.
///
/// Needs a raw socket, or an unprivileged ICMP datagram socket where the
/// OS allows one (`net.ipv4.ping_group_range` on Linux).
#[derive(Debug, Clone)]
pub struct IcmpProber {
    timeout: Duration,
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl IcmpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn resolve(host: &str) -> Result<IpAddr, ProbeFailure> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        let mut addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ProbeFailure::Resolve(e.to_string()))?;
        addrs
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| ProbeFailure::Resolve(format!("no address for {}", host)))
    }

    async fn echo(&self, ip: IpAddr) -> ProbeVerdict {
        let config = match ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };

        let client = match Client::new(&config) {
            Ok(client) => client,
            Err(e) => return ProbeVerdict::ProbeError(io_failure(&e)),
        };

        let mut pinger = client
            .pinger(ip, PingIdentifier(std::process::id() as u16))
            .await;
        pinger.timeout(self.timeout);

        match pinger.ping(PingSequence(0), &PAYLOAD).await {
            Ok((_, rtt)) => ProbeVerdict::Reachable { rtt },
            Err(SurgeError::Timeout { .. }) => {
                ProbeVerdict::Unreachable(format!("no reply within {:?}", self.timeout))
            }
            Err(SurgeError::IOError(e)) if e.kind() == io::ErrorKind::PermissionDenied => {
                ProbeVerdict::ProbeError(ProbeFailure::InsufficientPrivilege)
            }
            Err(SurgeError::IOError(e)) => ProbeVerdict::Unreachable(e.to_string()),
            Err(e) => ProbeVerdict::ProbeError(ProbeFailure::Other(e.to_string())),
        }
    }
}

impl Prober for IcmpProber {
    async fn probe(&self, host: &str) -> ProbeVerdict {
        // One deadline covers name lookup, socket setup and the echo
        let deadline = Instant::now() + self.timeout + Duration::from_millis(100);

        let ip = match resolve_before(deadline, Self::resolve(host)).await {
            Ok(ip) => ip,
            Err(failure) => return ProbeVerdict::ProbeError(failure),
        };

        let verdict = tokio::time::timeout_at(deadline, self.echo(ip))
            .await
            .unwrap_or_else(|_| {
                ProbeVerdict::Unreachable(format!("no reply within {:?}", self.timeout))
            });
        debug!("probe {} ({}): {}", host, ip, verdict);
        verdict
    }
}

async fn resolve_before(
    deadline: Instant,
    lookup: impl Future<Output = Result<IpAddr, ProbeFailure>>,
) -> Result<IpAddr, ProbeFailure> {
    tokio::time::timeout_at(deadline, lookup)
        .await
        .unwrap_or_else(|_| Err(ProbeFailure::Resolve("timed out".to_string())))
}

fn io_failure(e: &io::Error) -> ProbeFailure {
    match e.kind() {
        io::ErrorKind::PermissionDenied => ProbeFailure::InsufficientPrivilege,
        _ => ProbeFailure::Other(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_failure_permission() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(io_failure(&denied), ProbeFailure::InsufficientPrivilege);

        let other = io::Error::other("no route");
        assert!(matches!(io_failure(&other), ProbeFailure::Other(_)));
    }

    #[tokio::test]
    async fn test_resolve_literal() {
        let ip = IcmpProber::resolve("192.0.2.7").await.unwrap();
        assert_eq!(ip, "192.0.2.7".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let verdict = IcmpProber::default().probe("host.invalid").await;
        assert_eq!(verdict.label(), "probe-error");
    }

    #[tokio::test]
    async fn test_stalled_lookup_is_bounded() {
        let started = std::time::Instant::now();
        let deadline = Instant::now() + Duration::from_millis(50);

        let stalled = std::future::pending::<Result<IpAddr, ProbeFailure>>();
        let result = resolve_before(deadline, stalled).await;

        assert_eq!(result, Err(ProbeFailure::Resolve("timed out".to_string())));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_lookup_within_deadline() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let ip: IpAddr = "192.0.2.9".parse().unwrap();
        assert_eq!(resolve_before(deadline, async move { Ok(ip) }).await, Ok(ip));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(IcmpProber::default().timeout(), Duration::from_millis(500));
    }
}
