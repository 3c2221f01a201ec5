//! Biometric gate and snapshot derivation.
//!
//! The gate normalizes both paths to a [`BiometricOutcome`]:
//!
//! - real: the platform sensor (through [`AnyBiometricSensor`]) reports a
//!   modality or an error message
//! - emulated: the caller supplies the outcome; success is always
//!   [`BiometricModality::Demo`]
//!
//! A success is turned into a [`BiometricSnapshot`]. The snapshot's token and
//! digest are demonstration values for the log, not credentials.

use chrono::{DateTime, Utc};
use mfalink_core::{
    BiometricModality,
    constants::{MAX_SIGNAL_QUALITY, MIN_SIGNAL_QUALITY, SNAPSHOT_TOKEN_LENGTH},
};
use mfalink_hardware::{AnyBiometricSensor, BiometricSensor};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Message recorded for an emulated failure.
pub const EMULATED_FAILURE: &str = "Emulated failure";

/// Metadata captured at the moment of a successful biometric check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BiometricSnapshot {
    pub modality: BiometricModality,
    pub captured_at: DateTime<Utc>,
    /// Synthetic signal quality in `80..=100`.
    pub quality: u8,
    /// Last 16 characters of the seed.
    pub token: String,
    /// Lowercase hex SHA-256 of the seed.
    pub dfa_hash: String,
}

impl BiometricSnapshot {
    /// Capture a snapshot now, with a random quality and a fresh nonce.
    pub fn capture(user_id: &str, modality: BiometricModality) -> Self {
        let quality = rand::thread_rng().gen_range(MIN_SIGNAL_QUALITY..=MAX_SIGNAL_QUALITY);
        Self::derive(user_id, modality, Utc::now(), quality, Uuid::new_v4())
    }

    /// Derive a snapshot from explicit inputs.
    ///
    /// The seed is `{user_id}-{modality}-{millis}-{nonce}`.
    pub fn derive(
        user_id: &str,
        modality: BiometricModality,
        captured_at: DateTime<Utc>,
        quality: u8,
        nonce: Uuid,
    ) -> Self {
        let seed = format!(
            "{}-{}-{}-{}",
            user_id,
            modality.name(),
            captured_at.timestamp_millis(),
            nonce
        );

        let token_start = seed
            .char_indices()
            .rev()
            .nth(SNAPSHOT_TOKEN_LENGTH - 1)
            .map_or(0, |(index, _)| index);
        let token = seed[token_start..].to_string();

        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        let dfa_hash = hex::encode(hasher.finalize());

        debug!(%modality, quality, "Derived biometric snapshot");

        Self {
            modality,
            captured_at,
            quality,
            token,
            dfa_hash,
        }
    }
}

/// Normalized result of one biometric check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricOutcome {
    Success(BiometricModality),
    Failure(String),
}

impl BiometricOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BiometricOutcome::Success(_))
    }
}

/// Front for the platform sensor plus the emulated path.
#[derive(Debug, Clone)]
pub struct BiometricGate {
    sensor: Arc<Mutex<AnyBiometricSensor>>,
    supported: bool,
}

impl BiometricGate {
    pub fn new(sensor: AnyBiometricSensor) -> Self {
        let supported = sensor.supports_real_biometric();
        Self {
            sensor: Arc::new(Mutex::new(sensor)),
            supported,
        }
    }

    /// Whether the real path is usable; otherwise drive [`Self::emulate`].
    pub fn supports_real_biometric(&self) -> bool {
        self.supported
    }

    /// Run the platform prompt. Errors become a failure message.
    pub async fn authenticate(&self) -> BiometricOutcome {
        let result = self.sensor.lock().await.authenticate().await;
        match result {
            Ok(modality) => BiometricOutcome::Success(modality),
            Err(e) => BiometricOutcome::Failure(e.to_string()),
        }
    }

    /// Outcome for the emulated path.
    pub fn emulate(success: bool) -> BiometricOutcome {
        if success {
            BiometricOutcome::Success(BiometricModality::Demo)
        } else {
            BiometricOutcome::Failure(EMULATED_FAILURE.to_string())
        }
    }
}
