//! Session state and its publish/subscribe store.
//!
//! [`Session`] is a plain value. [`SessionStore`] keeps the current value in
//! a `tokio::sync::watch` channel: every mutation runs under the channel's
//! lock and subscribers see whole new values, never a half-applied change.
//!
//! # Connection states
//!
//! - `Idle` → `Connecting(address)` → `Connected(name)` | `Error(reason)`
//! - `Connected` → `Idle` (disconnect) | `Error` (read or write failure)
//! - `Error` / `Idle` → `Connecting` (fresh attempt)
//!
//! `Connected` is only reachable from `Connecting`; everything else may be
//! entered from any state.

use crate::biometric::BiometricSnapshot;
use crate::config::SessionConfig;
use chrono::{DateTime, Utc};
use mfalink_core::{BiometricModality, Error, PeripheralAddress, Result};
use mfalink_protocol::{BiometricToken, Decision};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Phase of the MFA flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Choosing and connecting to the peripheral.
    Bluetooth,
    /// Running the biometric check and sending the packet.
    Biometrics,
    /// Showing the peripheral's decision.
    Result,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage_str = match self {
            Stage::Bluetooth => "Bluetooth",
            Stage::Biometrics => "Biometrics",
            Stage::Result => "Result",
        };
        write!(f, "{}", stage_str)
    }
}

/// Connection substate of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    /// Attempt in progress to this address.
    Connecting(PeripheralAddress),
    /// Link open; carries the name the peripheral reported, if any.
    Connected(Option<String>),
    /// Last attempt or link failed.
    Error(String),
}

impl ConnectionState {
    /// Check if transition to `target` is valid from this state.
    ///
    /// ```
    /// use mfalink_core::PeripheralAddress;
    /// use mfalink_session::ConnectionState;
    ///
    /// let connecting = ConnectionState::Connecting(PeripheralAddress::new("AA:BB:CC:DD:EE:FF"));
    /// assert!(connecting.can_transition_to(&ConnectionState::Connected(None)));
    /// assert!(!ConnectionState::Idle.can_transition_to(&ConnectionState::Connected(None)));
    /// ```
    pub fn can_transition_to(&self, target: &ConnectionState) -> bool {
        match target {
            ConnectionState::Connected(_) => matches!(self, ConnectionState::Connecting(_)),
            _ => true,
        }
    }

    /// Like [`can_transition_to`](Self::can_transition_to), as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] naming both states.
    pub fn check_transition(&self, target: &ConnectionState) -> Result<()> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(Error::InvalidStateTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Connecting(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Connecting(address) => write!(f, "Connecting to {}", address),
            ConnectionState::Connected(Some(name)) => write!(f, "Connected to {}", name),
            ConnectionState::Connected(None) => write!(f, "Connected"),
            ConnectionState::Error(reason) => write!(f, "Error: {}", reason),
        }
    }
}

/// Biometric substate of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BiometricState {
    Idle,
    Running,
    Success {
        modality: BiometricModality,
        snapshot: BiometricSnapshot,
    },
    Failure {
        message: String,
    },
}

impl BiometricState {
    pub fn is_running(&self) -> bool {
        matches!(self, BiometricState::Running)
    }
}

/// One timestamped activity log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.at.timestamp_millis(), self.message)
    }
}

/// Capacity-bounded activity log; the oldest entry is evicted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    #[serde(skip)]
    capacity: usize,
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Messages from oldest to newest.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.message.as_str())
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.messages().any(|m| m == message)
    }
}

/// The whole observable state of one MFA session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub address: PeripheralAddress,
    pub stage: Stage,
    pub permission_granted: bool,
    pub connection: ConnectionState,
    pub biometric: BiometricState,
    /// Outcome marker sent in the next auth packet.
    pub biometric_token: Option<BiometricToken>,
    pub decision: Option<Decision>,
    /// Last payload written to the peripheral.
    pub last_request: Option<String>,
    /// Body of the last peripheral response.
    pub received_body: Option<String>,
    pub session_id: Option<String>,
    /// Label of the last decision ("Access granted" / "Access denied").
    pub final_result: Option<String>,
    pub log: ActivityLog,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            user_id: config.user_id.clone(),
            address: PeripheralAddress::new(&config.initial_address),
            stage: Stage::Bluetooth,
            permission_granted: false,
            connection: ConnectionState::Idle,
            biometric: BiometricState::Idle,
            biometric_token: None,
            decision: None,
            last_request: None,
            received_body: None,
            session_id: None,
            final_result: None,
            log: ActivityLog::with_capacity(config.log_capacity),
        }
    }

    pub fn can_navigate_to_biometrics(&self) -> bool {
        self.connection.is_connected()
    }

    /// Token presence, not its value, gates sending.
    pub fn can_send_packet(&self) -> bool {
        self.can_navigate_to_biometrics() && self.biometric_token.is_some()
    }

    /// Append to the activity log and emit the same line as a tracing event.
    pub fn record(&mut self, message: impl Into<String>) {
        let entry = LogEntry::now(message);
        info!(target: "mfalink::activity", "{}", entry.message);
        self.log.push(entry);
    }

    /// Move the connection to `next` if the transition is allowed.
    pub fn set_connection(&mut self, next: ConnectionState) -> bool {
        if let Err(e) = self.connection.check_transition(&next) {
            warn!("Rejected connection state change: {}", e);
            return false;
        }
        self.connection = next;
        true
    }

    /// Store a peripheral decision and jump to the result stage.
    pub fn apply_decision(&mut self, decision: Decision) {
        self.received_body = Some(decision.display_body().to_string());
        self.session_id = decision.session_id().map(str::to_string);
        self.final_result = Some(decision.display_result().to_string());
        self.stage = Stage::Result;
        self.decision = Some(decision);
    }

    /// Clear biometric and result fields; address and permission survive.
    pub fn reset_flow(&mut self) {
        self.stage = Stage::Bluetooth;
        self.biometric = BiometricState::Idle;
        self.biometric_token = None;
        self.decision = None;
        self.last_request = None;
        self.received_body = None;
        self.session_id = None;
        self.final_result = None;
    }
}

/// Shared single-writer store for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl SessionStore {
    pub fn new(session: Session) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self { tx: Arc::new(tx) }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Apply `f` and publish the result as one new value.
    ///
    /// `f` runs under the store lock and must not call back into the store.
    pub fn update(&self, f: impl FnOnce(&mut Session)) {
        self.tx.send_modify(f);
    }

    /// Like [`update`](Self::update), publishing only when `f` returns `true`.
    pub fn update_if(&self, f: impl FnOnce(&mut Session) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|session| session.record(message));
    }
}
