//! Capability traits consumed by the session layer.
//!
//! Two capabilities sit outside the session core:
//!
//! - [`SerialTransport`]: a stream-oriented serial link keyed by a peripheral
//!   address and opened against a fixed service identifier, plus an optional
//!   discovery side-channel
//! - [`BiometricSensor`]: the platform biometric prompt
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! so they are not object-safe. Dispatch goes through the enum wrappers in
//! [`crate::devices`].
//!
//! # Link halves
//!
//! [`SerialTransport::open`] returns a [`SerialLink`] with independent read
//! and write halves. The session gives the read half to its read loop (the
//! only reader) and keeps the write half for outgoing packets, so writes
//! never wait on a blocked read.

#![allow(async_fn_in_trait)]

use crate::{Result, types::DiscoveredPeripheral};
use mfalink_core::{BiometricModality, PeripheralAddress};
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Read half of an open link.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of an open link.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open serial link to a peripheral.
pub struct SerialLink {
    /// Name the peripheral reported while connecting, if any.
    pub peer_name: Option<String>,

    /// Incoming byte stream.
    pub reader: BoxedReader,

    /// Outgoing byte stream.
    pub writer: BoxedWriter,
}

impl SerialLink {
    pub fn new<R, W>(peer_name: Option<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            peer_name,
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

impl fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLink")
            .field("peer_name", &self.peer_name)
            .finish_non_exhaustive()
    }
}

/// Serial-over-radio transport abstraction.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic parameters or [`crate::devices::AnyTransport`].
///
/// ```no_run
/// use mfalink_core::{PeripheralAddress, constants::SERIAL_PORT_SERVICE_UUID};
/// use mfalink_hardware::traits::SerialTransport;
/// use mfalink_hardware::error::Result;
///
/// async fn open_hc05<T: SerialTransport>(transport: &T) -> Result<Option<String>> {
///     let address = PeripheralAddress::new("98:D3:31:F5:2A:10");
///     let link = transport.open(&address, SERIAL_PORT_SERVICE_UUID).await?;
///     Ok(link.peer_name)
/// }
/// ```
pub trait SerialTransport: Send + Sync {
    /// Whether the host has a usable adapter.
    fn is_available(&self) -> bool;

    /// Start scanning for peripherals.
    ///
    /// Discovered peripherals are delivered on the returned channel. The
    /// channel closes when discovery ends or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter is unavailable or scanning cannot
    /// start.
    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveredPeripheral>>;

    /// Stop an in-progress scan. A no-op when nothing is scanning.
    async fn cancel_discovery(&self);

    /// Open a link to `address` against the service record `service`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The adapter is unavailable
    /// - The peripheral cannot be reached or refuses the connection
    async fn open(&self, address: &PeripheralAddress, service: Uuid) -> Result<SerialLink>;
}

/// Platform biometric prompt abstraction.
///
/// Success carries the modality that performed the check: face when the
/// device reports a face sensor, fingerprint otherwise.
pub trait BiometricSensor: Send + Sync {
    /// Whether a real biometric check can be performed on this device.
    fn supports_real_biometric(&self) -> bool;

    /// Prompt the user and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The biometric did not match (`BiometricRejected`)
    /// - The sensor reported an error code (`BiometricError`)
    /// - No real sensor is present (`Unsupported`)
    async fn authenticate(&mut self) -> Result<BiometricModality>;
}
