//! Capability boundaries for the mfalink session.
//!
//! The session core never talks to a radio or a sensor directly. It consumes
//! two capabilities defined here:
//!
//! - [`SerialTransport`]: opens a serial link to a peripheral address
//!   against the Serial Port Profile service and optionally scans for
//!   peripherals
//! - [`BiometricSensor`]: reports whether a real biometric check is possible
//!   and runs it, yielding the modality on success
//!
//! # Implementations
//!
//! - [`mock::MockTransport`] / [`mock::MockBiometric`]: channel-driven mocks
//!   scripted through their handles, used by tests and demos
//! - [`tcp::TcpTransport`]: a serial-over-TCP bridge for bench setups
//!
//! The enum wrappers in [`devices`] dispatch between them.
//!
//! # Example
//!
//! ```
//! use mfalink_hardware::mock::MockBiometric;
//! use mfalink_hardware::traits::BiometricSensor;
//!
//! #[tokio::main]
//! async fn main() -> mfalink_hardware::Result<()> {
//!     let (mut sensor, handle) = MockBiometric::new();
//!     handle.queue_mismatch().await?;
//!
//!     let err = sensor.authenticate().await.unwrap_err();
//!     assert_eq!(err.to_string(), "Biometric did not match, try again");
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod error;
pub mod mock;
pub mod tcp;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyBiometricSensor, AnyTransport};
pub use error::{HardwareError, Result};
pub use traits::{BiometricSensor, BoxedReader, BoxedWriter, SerialLink, SerialTransport};
pub use types::DiscoveredPeripheral;
