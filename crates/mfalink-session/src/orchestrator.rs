//! The MFA session front: one object a presentation layer drives.
//!
//! [`MfaSession`] owns the [`SessionStore`], the [`ConnectionManager`] and the
//! [`BiometricGate`]. Every operation is total: precondition violations and
//! failures end up as a state value plus an activity log entry, never as an
//! error or a panic.
//!
//! # Flow
//!
//! ```text
//! Bluetooth ── connect ──> Connected ── navigate_to_biometrics ──> Biometrics
//!                                                                    │
//!                     biometric outcome ─> token ─> send_packet ─────┘
//!                                                                    │
//! Result <──────────────── read loop publishes the decision ─────────┘
//! ```

use crate::biometric::{BiometricGate, BiometricOutcome, BiometricSnapshot};
use crate::config::SessionConfig;
use crate::connection::{ConnectionManager, INVALID_ADDRESS};
use crate::state::{BiometricState, Session, SessionStore, Stage};
use mfalink_core::{Error, PeripheralAddress};
use mfalink_hardware::{AnyBiometricSensor, AnyTransport};
use mfalink_protocol::{BiometricToken, Packet};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One multi-factor authentication session.
///
/// # Examples
///
/// ```
/// use mfalink_hardware::{AnyBiometricSensor, AnyTransport, mock::MockTransport};
/// use mfalink_session::{MfaSession, SessionConfig, Stage};
///
/// # #[tokio::main]
/// # async fn main() {
/// let (transport, _handle) = MockTransport::new();
/// let session = MfaSession::new(
///     SessionConfig::default(),
///     AnyTransport::Mock(transport),
///     AnyBiometricSensor::Absent,
/// );
///
/// session.emulate_biometric_result(true);
/// assert_eq!(session.snapshot().stage, Stage::Bluetooth);
/// # }
/// ```
#[derive(Clone)]
pub struct MfaSession {
    store: SessionStore,
    connection: ConnectionManager,
    gate: BiometricGate,
}

impl MfaSession {
    pub fn new(config: SessionConfig, transport: AnyTransport, sensor: AnyBiometricSensor) -> Self {
        let store = SessionStore::new(Session::new(&config));
        let connection = ConnectionManager::new(
            transport,
            store.clone(),
            config.service_uuid,
            config.peripheral_name.clone(),
        );
        let gate = BiometricGate::new(sensor);

        info!(
            user_id = %config.user_id,
            peripheral = %config.peripheral_name,
            real_biometric = gate.supports_real_biometric(),
            "MFA session created"
        );

        Self {
            store,
            connection,
            gate,
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> Session {
        self.store.snapshot()
    }

    /// Receiver that sees every published state.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    pub fn supports_real_biometric(&self) -> bool {
        self.gate.supports_real_biometric()
    }

    pub fn set_user_id(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        self.store.update(|session| session.user_id = user_id);
    }

    /// Store the address, normalized (trimmed, uppercase).
    pub fn set_address(&self, raw: &str) {
        let address = PeripheralAddress::new(raw);
        self.store.update(|session| session.address = address);
    }

    /// Store the Bluetooth permission flag; logs only when it changes.
    pub fn set_permission(&self, granted: bool) {
        self.store.update_if(|session| {
            if session.permission_granted == granted {
                return false;
            }
            session.permission_granted = granted;
            session.record(if granted {
                "Bluetooth permissions granted"
            } else {
                "Bluetooth permissions denied"
            });
            true
        });
    }

    /// Connect to the stored address.
    ///
    /// An address shorter than 11 characters is logged and ignored: the
    /// connection state stays as it is and the transport is not touched.
    /// Otherwise `Connecting` is published before this returns; the returned
    /// task completes once the attempt has succeeded or failed. Outside a
    /// Tokio runtime the attempt cannot start: `Error` is published and
    /// `None` returned.
    pub fn connect(&self) -> Option<JoinHandle<()>> {
        let address = self.store.snapshot().address;
        if !address.is_well_formed() {
            debug!(%address, "Refusing to connect to malformed address");
            self.store.log(INVALID_ADDRESS);
            return None;
        }
        self.connection.connect(address)
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    /// Move to the biometric stage; a no-op unless connected.
    pub fn navigate_to_biometrics(&self) -> bool {
        self.store.update_if(|session| {
            if !session.can_navigate_to_biometrics() {
                return false;
            }
            session.stage = Stage::Biometrics;
            true
        })
    }

    /// Mark the biometric check as running.
    pub fn request_biometric(&self) {
        self.store
            .update(|session| session.biometric = BiometricState::Running);
    }

    /// Turn a biometric outcome into session state and the packet token.
    pub fn record_biometric_outcome(&self, outcome: BiometricOutcome) {
        self.store.update(|session| match outcome {
            BiometricOutcome::Success(modality) => {
                let snapshot = BiometricSnapshot::capture(&session.user_id, modality);
                debug!(
                    quality = snapshot.quality,
                    token = %snapshot.token,
                    "Biometric snapshot captured"
                );
                session.biometric = BiometricState::Success { modality, snapshot };
                session.biometric_token = Some(BiometricToken::Ok);
                session.record(format!("Biometric success via {}", modality.label()));
            }
            BiometricOutcome::Failure(message) => {
                session.biometric_token = Some(BiometricToken::Fail);
                session.record(format!("Biometric failed: {}", message));
                session.biometric = BiometricState::Failure { message };
            }
        });
    }

    /// Record an emulated result, regardless of sensor support.
    pub fn emulate_biometric_result(&self, success: bool) {
        self.record_biometric_outcome(BiometricGate::emulate(success));
    }

    /// Run the real sensor and record its outcome.
    pub async fn authenticate_biometric(&self) {
        self.request_biometric();
        let outcome = self.gate.authenticate().await;
        self.record_biometric_outcome(outcome);
    }

    /// Send the auth packet carrying the current token.
    ///
    /// Without a token, or while not connected, only a log entry is written.
    /// A write failure is logged as an I/O error; the connection manager has
    /// already published the `Error` state. The decision arrives later
    /// through the read loop.
    pub async fn send_packet(&self) {
        let session = self.store.snapshot();
        let Some(token) = session.biometric_token else {
            self.store.log("No biometric result available");
            return;
        };
        if !session.connection.is_connected() {
            self.store.log("Bluetooth socket is not connected");
            return;
        }

        match self.connection.send(Packet::Auth(token)).await {
            Ok(payload) => {
                let length = payload.chars().count();
                self.store.update(|session| {
                    session.last_request = Some(payload);
                    session.record(format!("Sent auth packet ({} chars)", length));
                });
            }
            // Already logged and published by the connection manager
            Err(Error::NotConnected) => {}
            Err(e) => self.store.log(format!("I/O error: {}", io_detail(&e))),
        }
    }

    /// Send the `{"test":"hello"}` probe.
    pub async fn send_test_packet(&self) {
        if !self.store.snapshot().connection.is_connected() {
            self.store.log("Bluetooth socket is not connected");
            return;
        }

        match self.connection.send(Packet::Probe).await {
            Ok(payload) => self.store.update(|session| {
                session.record(format!("Sent test data: {}", payload));
                session.last_request = Some(payload);
            }),
            Err(Error::NotConnected) => {}
            Err(e) => self
                .store
                .log(format!("I/O error while sending test data: {}", io_detail(&e))),
        }
    }

    /// Reset biometric and result fields; address and permission survive.
    pub fn restart(&self) {
        self.store.update(|session| {
            session.reset_flow();
            session.record("Flow restarted");
        });
    }

    /// Scan for the configured peripheral and autofill its address.
    pub async fn start_discovery(&self) {
        self.connection.start_discovery().await;
    }

    /// Stop discovery and close the link.
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
    }
}

fn io_detail(error: &Error) -> String {
    match error {
        Error::Io(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConnectionState;
    use mfalink_core::BiometricModality;
    use mfalink_hardware::mock::{MockBiometric, MockTransport, MockTransportHandle};
    use rstest::rstest;

    fn session() -> (MfaSession, MockTransportHandle) {
        let (transport, handle) = MockTransport::new();
        let session = MfaSession::new(
            SessionConfig::default(),
            AnyTransport::Mock(transport),
            AnyBiometricSensor::Absent,
        );
        (session, handle)
    }

    #[test]
    fn test_set_address_normalizes() {
        let (session, _handle) = session();
        session.set_address("  aa:bb:cc:dd:ee:ff ");
        assert_eq!(session.snapshot().address.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_set_permission_logs_only_on_change() {
        let (session, _handle) = session();

        session.set_permission(false);
        assert!(session.snapshot().log.is_empty());

        session.set_permission(true);
        session.set_permission(true);
        let state = session.snapshot();
        assert!(state.permission_granted);
        assert_eq!(state.log.len(), 1);
        assert!(state.log.contains("Bluetooth permissions granted"));

        session.set_permission(false);
        assert!(session.snapshot().log.contains("Bluetooth permissions denied"));
    }

    #[rstest]
    #[case("")]
    #[case("AA:BB")]
    #[case("  AA:BB:CC ")]
    #[case("0123456789")]
    #[tokio::test]
    async fn test_connect_short_address_is_ignored(#[case] raw: &str) {
        let (session, handle) = session();
        session.set_address(raw);

        assert!(session.connect().is_none());

        let state = session.snapshot();
        assert_eq!(state.connection, ConnectionState::Idle);
        assert!(state.log.contains("Invalid peripheral MAC address"));
        assert_eq!(handle.connect_attempts(), 0);
    }

    #[test]
    fn test_connect_short_address_needs_no_runtime() {
        let (session, _handle) = session();
        session.set_address("AA:BB");
        assert!(session.connect().is_none());
    }

    #[test]
    fn test_connect_outside_runtime_fails_cleanly() {
        let (session, handle) = session();
        session.set_address("AA:BB:CC:DD:EE:FF");

        assert!(session.connect().is_none());

        let state = session.snapshot();
        assert_eq!(
            state.connection,
            ConnectionState::Error("Connection failed: no async runtime".to_string())
        );
        assert!(state.log.contains("Connection failed: no async runtime"));
        assert_eq!(handle.connect_attempts(), 0);
    }

    #[test]
    fn test_navigate_requires_connection() {
        let (session, _handle) = session();
        assert!(!session.navigate_to_biometrics());
        assert_eq!(session.snapshot().stage, Stage::Bluetooth);
    }

    #[test]
    fn test_request_biometric_sets_running() {
        let (session, _handle) = session();
        session.request_biometric();
        assert!(session.snapshot().biometric.is_running());
    }

    #[test]
    fn test_emulated_success_captures_snapshot() {
        let (session, _handle) = session();
        session.request_biometric();
        session.emulate_biometric_result(true);

        let state = session.snapshot();
        assert_eq!(state.biometric_token, Some(BiometricToken::Ok));
        assert!(state.log.contains("Biometric success via Emulated Demo"));
        match state.biometric {
            BiometricState::Success { modality, snapshot } => {
                assert_eq!(modality, BiometricModality::Demo);
                assert_eq!(snapshot.token.chars().count(), 16);
                assert_eq!(snapshot.dfa_hash.len(), 64);
            }
            other => panic!("unexpected biometric state: {:?}", other),
        }
    }

    #[test]
    fn test_emulated_failure() {
        let (session, _handle) = session();
        session.emulate_biometric_result(false);

        let state = session.snapshot();
        assert_eq!(
            state.biometric,
            BiometricState::Failure {
                message: "Emulated failure".to_string()
            }
        );
        assert_eq!(state.biometric_token, Some(BiometricToken::Fail));
        assert!(state.log.contains("Biometric failed: Emulated failure"));
    }

    #[tokio::test]
    async fn test_authenticate_biometric_with_sensor() {
        let (transport, _transport_handle) = MockTransport::new();
        let (sensor, sensor_handle) = MockBiometric::new();
        let session = MfaSession::new(
            SessionConfig::default(),
            AnyTransport::Mock(transport),
            AnyBiometricSensor::Mock(sensor),
        );
        assert!(session.supports_real_biometric());

        sensor_handle.queue_match().await.unwrap();
        session.authenticate_biometric().await;

        let state = session.snapshot();
        assert_eq!(state.biometric_token, Some(BiometricToken::Ok));
        assert!(state.log.contains("Biometric success via Real Fingerprint"));
    }

    #[tokio::test]
    async fn test_authenticate_biometric_without_sensor() {
        let (session, _handle) = session();
        assert!(!session.supports_real_biometric());

        session.authenticate_biometric().await;

        let state = session.snapshot();
        assert_eq!(state.biometric_token, Some(BiometricToken::Fail));
        assert!(matches!(state.biometric, BiometricState::Failure { .. }));
    }

    #[tokio::test]
    async fn test_send_packet_without_token() {
        let (session, _handle) = session();
        session.send_packet().await;

        let state = session.snapshot();
        assert!(state.log.contains("No biometric result available"));
        assert_eq!(state.last_request, None);
        assert_eq!(state.connection, ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_send_packet_while_disconnected() {
        let (session, _handle) = session();
        session.emulate_biometric_result(true);
        let before = session.snapshot();

        session.send_packet().await;

        let after = session.snapshot();
        assert!(after.log.contains("Bluetooth socket is not connected"));
        assert_eq!(after.connection, before.connection);
        assert_eq!(after.stage, before.stage);
        assert_eq!(after.last_request, None);
    }

    #[tokio::test]
    async fn test_send_test_packet_while_disconnected() {
        let (session, _handle) = session();
        session.send_test_packet().await;
        assert!(
            session
                .snapshot()
                .log
                .contains("Bluetooth socket is not connected")
        );
    }

    #[test]
    fn test_set_user_id() {
        let (session, _handle) = session();
        session.set_user_id("lab07");
        assert_eq!(session.snapshot().user_id, "lab07");
    }

    #[test]
    fn test_restart_logs() {
        let (session, _handle) = session();
        session.set_address("AA:BB:CC:DD:EE:FF");
        session.emulate_biometric_result(false);

        session.restart();

        let state = session.snapshot();
        assert_eq!(state.stage, Stage::Bluetooth);
        assert_eq!(state.biometric, BiometricState::Idle);
        assert_eq!(state.biometric_token, None);
        assert_eq!(state.address.as_str(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(state.log.latest().unwrap().message, "Flow restarted");
    }

    #[test]
    fn test_io_detail_unwraps_io_errors() {
        let error = Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "broken pipe",
        ));
        assert_eq!(io_detail(&error), "broken pipe");
        assert_eq!(io_detail(&Error::NotConnected), "Not connected");
    }
}
