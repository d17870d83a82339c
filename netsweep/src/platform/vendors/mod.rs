//! Built-in device dialects.
//!
//! Each module exposes a `platform()` constructor. Prompt patterns follow
//! common open-source drivers for the same devices.

pub mod arista_eos;
pub mod cisco_ios;
pub mod juniper_junos;
pub mod linux;
