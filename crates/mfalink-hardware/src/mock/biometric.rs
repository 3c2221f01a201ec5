//! Mock biometric sensor implementation for testing and development.
//!
//! This module provides a simulated biometric prompt that can be controlled
//! programmatically for testing without requiring a platform sensor.

use crate::{HardwareError, Result, traits::BiometricSensor};
use mfalink_core::BiometricModality;
use tokio::sync::mpsc;

/// Mock biometric sensor for testing and development.
///
/// Each call to `authenticate()` waits for the next event queued on the
/// [`MockBiometricHandle`].
///
/// # Examples
///
/// ```
/// use mfalink_core::BiometricModality;
/// use mfalink_hardware::mock::MockBiometric;
/// use mfalink_hardware::traits::BiometricSensor;
///
/// #[tokio::main]
/// async fn main() -> mfalink_hardware::Result<()> {
///     let (mut sensor, handle) = MockBiometric::new();
///
///     handle.queue_match().await?;
///     assert_eq!(sensor.authenticate().await?, BiometricModality::Fingerprint);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockBiometric {
    /// Channel receiver for prompt outcomes
    event_rx: mpsc::Receiver<BiometricEvent>,

    /// Whether the simulated device has a usable sensor
    supported: bool,

    /// Whether the simulated device reports a face sensor
    has_face_sensor: bool,
}

impl MockBiometric {
    /// Create a mock fingerprint sensor.
    pub fn new() -> (Self, MockBiometricHandle) {
        Self::with_capabilities(true, false)
    }

    /// Create a mock sensor with explicit capabilities.
    ///
    /// `supported = false` simulates a device whose sensor is present but
    /// unusable (not enrolled, disabled), which sends the session down the
    /// emulated path.
    pub fn with_capabilities(supported: bool, has_face_sensor: bool) -> (Self, MockBiometricHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);

        let sensor = Self {
            event_rx,
            supported,
            has_face_sensor,
        };

        (sensor, MockBiometricHandle { event_tx })
    }

    fn modality(&self) -> BiometricModality {
        if self.has_face_sensor {
            BiometricModality::Face
        } else {
            BiometricModality::Fingerprint
        }
    }
}

impl BiometricSensor for MockBiometric {
    fn supports_real_biometric(&self) -> bool {
        self.supported
    }

    async fn authenticate(&mut self) -> Result<BiometricModality> {
        if !self.supported {
            return Err(HardwareError::unsupported("biometric authentication"));
        }

        let event = self
            .event_rx
            .recv()
            .await
            .ok_or_else(|| HardwareError::disconnected("Biometric event channel closed"))?;

        match event {
            BiometricEvent::Match => Ok(self.modality()),
            BiometricEvent::Mismatch => Err(HardwareError::BiometricRejected),
            BiometricEvent::Error { code, message } => Err(HardwareError::biometric(code, message)),
        }
    }
}

/// Internal event type for mock biometric sensor.
#[derive(Debug, Clone)]
enum BiometricEvent {
    Match,
    Mismatch,
    Error { code: i32, message: String },
}

/// Handle for controlling a mock biometric sensor.
#[derive(Debug, Clone)]
pub struct MockBiometricHandle {
    /// Channel sender for prompt outcomes
    event_tx: mpsc::Sender<BiometricEvent>,
}

impl MockBiometricHandle {
    /// Queue a successful match for the next prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped and the channel is closed.
    pub async fn queue_match(&self) -> Result<()> {
        self.send(BiometricEvent::Match).await
    }

    /// Queue a non-matching read for the next prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped and the channel is closed.
    pub async fn queue_mismatch(&self) -> Result<()> {
        self.send(BiometricEvent::Mismatch).await
    }

    /// Queue a sensor error for the next prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped and the channel is closed.
    pub async fn queue_error(&self, code: i32, message: impl Into<String>) -> Result<()> {
        self.send(BiometricEvent::Error {
            code,
            message: message.into(),
        })
        .await
    }

    async fn send(&self, event: BiometricEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Biometric event channel closed"))
    }
}
