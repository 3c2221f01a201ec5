//! Peripheral response decoding.
//!
//! A peripheral answers an auth packet with one JSON line such as
//! `{"result":"allow","session_id":7}`. Decoding never fails: anything the
//! peripheral sends degrades to a deny-biased [`Decision`].

use mfalink_core::constants::{LABEL_ACCESS_DENIED, LABEL_ACCESS_GRANTED, RESULT_ALLOW, RESULT_DENY};
use serde::Serialize;
use serde_json::Value;

/// Access decision parsed from one peripheral line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    session_id: Option<String>,
    result: String,
    raw_body: String,
    line: String,
}

impl Decision {
    /// Decision used when the peripheral sent nothing usable.
    pub fn no_data() -> Self {
        Self {
            session_id: None,
            result: RESULT_DENY.to_string(),
            raw_body: String::new(),
            line: String::new(),
        }
    }

    fn raw(line: &str) -> Self {
        Self {
            session_id: None,
            result: RESULT_DENY.to_string(),
            raw_body: line.to_string(),
            line: line.to_string(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    /// Pretty-printed JSON object, or the verbatim line if it was not one.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// The line as received, without its terminator.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Body to show for this response: the decoded body, or the received
    /// line when the body is blank.
    pub fn display_body(&self) -> &str {
        if self.raw_body.trim().is_empty() {
            &self.line
        } else {
            &self.raw_body
        }
    }

    /// `true` when the result equals `allow`, ignoring case.
    pub fn is_allowed(&self) -> bool {
        self.result.eq_ignore_ascii_case(RESULT_ALLOW)
    }

    pub fn display_result(&self) -> &'static str {
        if self.is_allowed() {
            LABEL_ACCESS_GRANTED
        } else {
            LABEL_ACCESS_DENIED
        }
    }
}

/// Decode one peripheral line into a [`Decision`].
///
/// - absent or blank line: no session id, `deny`, empty body
/// - JSON object: `session_id` stringified when present and not null,
///   `result` when it is a string (else `deny`), pretty-printed body
/// - anything else: no session id, `deny`, body is the line verbatim
///
/// # Example
///
/// ```
/// use mfalink_protocol::decode;
///
/// let decision = decode(Some(r#"{"result":"allow","session_id":7}"#));
/// assert_eq!(decision.session_id(), Some("7"));
/// assert!(decision.is_allowed());
/// assert_eq!(decision.display_result(), "Access granted");
/// ```
pub fn decode(line: Option<&str>) -> Decision {
    let Some(line) = line else {
        return Decision::no_data();
    };
    if line.trim().is_empty() {
        return Decision {
            line: line.to_string(),
            ..Decision::no_data()
        };
    }

    let object = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(object)) => object,
        _ => return Decision::raw(line),
    };

    let session_id = object.get("session_id").and_then(|value| match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    });

    let result = object
        .get("result")
        .and_then(Value::as_str)
        .unwrap_or(RESULT_DENY)
        .to_string();

    let value = Value::Object(object);
    let raw_body = serde_json::to_string_pretty(&value).unwrap_or_else(|_| line.to_string());

    Decision {
        session_id,
        result,
        raw_body,
        line: line.to_string(),
    }
}
