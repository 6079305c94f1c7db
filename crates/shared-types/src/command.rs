//! # Command Message
//!
//! The inbound request describing one action to perform, with a deadline.
//!
//! ## Wire Format
//!
//! Field-tagged JSON. Unknown fields are ignored so newer producers can add
//! fields without breaking this consumer. Type mismatches fail the decode.
//! `action` and `responseTopic` default to empty when absent; the intake gate
//! rejects them rather than the decoder.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use uuid::Uuid;

use crate::errors::CodecError;

/// An inbound command, immutable once parsed.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Unique identifier of this request.
    pub id: Uuid,

    /// Identifier the caller may use for its own bookkeeping.
    ///
    /// Results are correlated on `id`, not on this field.
    #[serde(default)]
    pub correlation_id: Uuid,

    /// Name of the operation to perform.
    #[serde(default)]
    pub action: String,

    /// Action-specific payload.
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub payload: Vec<u8>,

    /// Destination topic for the result.
    #[serde(default)]
    pub response_topic: String,

    /// Service that issued the command. Informational.
    #[serde(default)]
    pub source: String,

    /// Topic the command was published on. Informational.
    #[serde(default)]
    pub source_topic: String,

    /// Unix timestamp (seconds, UTC) at which the command was issued.
    pub issued_at: i64,

    /// Validity window in seconds, relative to `issued_at`.
    pub ttl_seconds: i64,
}

impl Command {
    /// Decode a command from its wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Encode this command to its wire representation.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }
}
