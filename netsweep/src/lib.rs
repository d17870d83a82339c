//! # netsweep
//!
//! Run one list of commands against a batch of network devices over SSH,
//! record a transcript per device and classify every device's run.
//!
//! The device dialect does not have to be known up front: each host is
//! probed with the detection signatures of the built-in platforms (Cisco
//! IOS, Arista EOS, Juniper JUNOS, Linux) and the session is then opened
//! with the matching prompt patterns and privilege levels.
//!
//! ## Layers
//!
//! - [`transport`]: russh connection and authentication
//! - [`channel`]: PTY channel with ANSI-stripped prompt matching
//! - [`platform`]: dialect definitions and the registry
//! - [`driver`]: command execution and privilege navigation
//! - [`session`]: dialect detection and ready-to-use sessions
//! - [`batch`]: the orchestrator, with [`probe`] and [`recorder`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netsweep::batch::BatchOrchestrator;
//! use netsweep::probe::IcmpProber;
//! use netsweep::session::SshSessionFactory;
//! use netsweep::inventory;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netsweep::Error> {
//!     let hosts = inventory::load_hosts("hostlist.csv")?;
//!     let commands = inventory::load_commands("commandlist.csv")?;
//!
//!     let orchestrator =
//!         BatchOrchestrator::new(SshSessionFactory::default(), IcmpProber::default(), ".");
//!
//!     for report in orchestrator.run(hosts, &commands).await? {
//!         println!("{} {}", report.host.host, report.outcome);
//!     }
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod channel;
pub mod driver;
pub mod error;
pub mod inventory;
pub mod outcome;
pub mod platform;
pub mod probe;
pub mod recorder;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use batch::{BatchOptions, BatchOrchestrator, HostReport, Transcript};
pub use driver::{Driver, DriverBuilder, GenericDriver, Response};
pub use error::{Error, FailureKind, Result};
pub use inventory::{CommandList, HostRecord};
pub use outcome::RunOutcome;
pub use platform::{PlatformDefinition, PlatformRegistry, PrivilegeLevel};
pub use session::{SessionFactory, SshSessionFactory};
