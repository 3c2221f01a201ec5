//! Session orchestration for the mfalink MFA flow.
//!
//! This crate ties the transport, the biometric sensor and the line codec
//! into one observable session:
//!
//! - [`MfaSession`]: the operations a presentation layer calls
//! - [`ConnectionManager`]: connect, read loop, send, disconnect, discovery
//! - [`BiometricGate`]: real or emulated biometric outcome plus snapshot
//! - [`SessionStore`]: `watch`-backed state, published as whole values
//!
//! Every activity log line is also emitted as a `tracing` event with target
//! `mfalink::activity`.

pub mod biometric;
pub mod config;
pub mod connection;
pub mod orchestrator;
pub mod state;

pub use biometric::{BiometricGate, BiometricOutcome, BiometricSnapshot};
pub use config::SessionConfig;
pub use connection::ConnectionManager;
pub use orchestrator::MfaSession;
pub use state::{
    ActivityLog, BiometricState, ConnectionState, LogEntry, Session, SessionStore, Stage,
};
