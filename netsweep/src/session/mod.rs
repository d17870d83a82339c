//! Opening ready-to-use sessions for host records.
//!
//! A session is a [`Driver`] that is connected, bound to the device's dialect
//! and already elevated. The batch orchestrator only sees the
//! [`SessionFactory`] trait, so it can run against fakes.

mod detect;
mod ssh;

pub use detect::{DialectDetector, Sampler};
pub use ssh::{SessionOptions, SshSessionFactory};

use std::future::Future;

use crate::channel::SessionSink;
use crate::driver::Driver;
use crate::error::Result;
use crate::inventory::HostRecord;

/// Produces one live session per host.
pub trait SessionFactory: Send + Sync {
    type Session: Driver;

    /// Connect to `host`, resolve its dialect, log in and elevate.
    ///
    /// Every byte received on the session is written to `session_log` when
    /// one is given. Failures carry an [`Error`](crate::Error) whose
    /// [`kind`](crate::Error::kind) tells authentication, timeout and
    /// protocol problems apart.
    fn open(
        &self,
        host: &HostRecord,
        session_log: Option<SessionSink>,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}
