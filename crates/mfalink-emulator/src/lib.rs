//! Bench emulator for the HC-05 side of the mfalink protocol.
//!
//! Lets the session run end to end over the TCP bridge transport without
//! real hardware.

pub mod config;
pub mod policy;
pub mod server;

pub use config::{DEFAULT_PORT, EmulatorConfig};
pub use policy::ResponsePolicy;
pub use server::{ConnectionStats, EmulatorError, PeripheralEmulator};
