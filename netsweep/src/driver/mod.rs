//! High-level driver for device interaction.
//!
//! The driver layer provides the API the batch runs against: open a session,
//! keep it at the dialect's working privilege level and send commands.

mod builder;
mod generic;
mod privilege;
mod response;

pub use builder::DriverBuilder;
pub use generic::GenericDriver;
pub use privilege::{PrivilegeManager, Transition};
pub use response::Response;

use std::future::Future;

use crate::error::Result;

/// Trait for device drivers.
///
/// A driver is one live session to one device. It is owned by a single
/// host run and never shared, so only `Send` is required.
pub trait Driver: Send {
    /// Open the connection and settle at the first prompt.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    ///
    /// A command the device rejects still returns `Ok` with
    /// [`Response::failure_message`] set; `Err` means the session itself failed.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Move to a specific privilege level.
    fn acquire_privilege(&mut self, privilege: &str) -> impl Future<Output = Result<()>> + Send;

    /// Make sure the session sits at or above the dialect's working level.
    ///
    /// Does nothing when already there, so it is safe to call before every
    /// command. Never de-escalates.
    fn elevate(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Check if the driver is connected.
    fn is_open(&self) -> bool;

    /// The last prompt seen.
    fn prompt(&self) -> &str;

    /// Name of the dialect this driver speaks.
    fn platform_name(&self) -> &str;
}
