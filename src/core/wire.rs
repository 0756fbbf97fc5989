//! Purpose: Define the JSON envelopes exchanged with remote callers.
//! Exports: `CallRequest`, `CallResponse`.
//! Role: Stable wire contract; requests decode leniently, responses encode exactly.
//! Invariants: Responses echo the caller-supplied correlation id unchanged.
//! Invariants: `code` is omitted (not null) when the failure carries none.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::dispatch::Outcome;

/// Inbound call envelope. `id` and `path` default to empty so incomplete
/// requests decode cleanly and get discarded by the relay instead of being
/// treated as malformed.
#[derive(Clone, Debug, Deserialize)]
pub struct CallRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Outbound result envelope, tagged by `ok`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CallResponse {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
}

impl CallResponse {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            ok: true,
            result: Some(result),
            error: None,
            code: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>, code: Option<Value>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            result: None,
            error: Some(error.into()),
            code,
        }
    }

    pub fn from_outcome(id: impl Into<String>, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(result) => Self::success(id, result),
            Outcome::Failure { message, code } => Self::failure(id, message, code),
        }
    }
}
