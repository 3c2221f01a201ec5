//! How the emulated peripheral answers auth packets.

use clap::ValueEnum;
use mfalink_core::constants::{RESULT_ALLOW, RESULT_DENY};
use mfalink_protocol::BiometricToken;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResponsePolicy {
    /// `ok` is allowed, `fail` is denied.
    #[default]
    TokenGate,

    /// Every packet is denied.
    AlwaysDeny,

    /// Packets are read but never answered.
    Silent,
}

impl ResponsePolicy {
    /// Result string for `token`, or `None` when no answer is sent.
    ///
    /// ```
    /// use mfalink_emulator::ResponsePolicy;
    /// use mfalink_protocol::BiometricToken;
    ///
    /// assert_eq!(ResponsePolicy::TokenGate.respond(BiometricToken::Ok), Some("allow"));
    /// assert_eq!(ResponsePolicy::Silent.respond(BiometricToken::Ok), None);
    /// ```
    pub fn respond(self, token: BiometricToken) -> Option<&'static str> {
        match (self, token) {
            (ResponsePolicy::TokenGate, BiometricToken::Ok) => Some(RESULT_ALLOW),
            (ResponsePolicy::TokenGate, BiometricToken::Fail) => Some(RESULT_DENY),
            (ResponsePolicy::AlwaysDeny, _) => Some(RESULT_DENY),
            (ResponsePolicy::Silent, _) => None,
        }
    }
}

impl fmt::Display for ResponsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy_str = match self {
            ResponsePolicy::TokenGate => "token-gate",
            ResponsePolicy::AlwaysDeny => "always-deny",
            ResponsePolicy::Silent => "silent",
        };
        write!(f, "{}", policy_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ResponsePolicy::TokenGate, BiometricToken::Ok, Some("allow"))]
    #[case(ResponsePolicy::TokenGate, BiometricToken::Fail, Some("deny"))]
    #[case(ResponsePolicy::AlwaysDeny, BiometricToken::Ok, Some("deny"))]
    #[case(ResponsePolicy::AlwaysDeny, BiometricToken::Fail, Some("deny"))]
    #[case(ResponsePolicy::Silent, BiometricToken::Ok, None)]
    #[case(ResponsePolicy::Silent, BiometricToken::Fail, None)]
    fn test_respond(
        #[case] policy: ResponsePolicy,
        #[case] token: BiometricToken,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(policy.respond(token), expected);
    }

    #[test]
    fn test_display_matches_cli_names() {
        for policy in ResponsePolicy::value_variants() {
            let parsed = ResponsePolicy::from_str(&policy.to_string(), false).unwrap();
            assert_eq!(&parsed, policy);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ResponsePolicy::AlwaysDeny).unwrap(),
            "\"always-deny\""
        );
    }
}
