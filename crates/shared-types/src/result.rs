//! # Command Result
//!
//! The outbound response correlated to exactly one `Command`.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use uuid::Uuid;

use crate::errors::{ActionError, CodecError};

/// An outbound result, immutable once built.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Freshly generated identifier of this result.
    pub id: Uuid,

    /// The originating command's `id`.
    pub correlation_id: Uuid,

    /// Success payload; empty on failure.
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub payload: Vec<u8>,

    /// Zero on success, taxonomy code on failure.
    #[serde(default)]
    pub error_code: i16,

    /// Empty on success, human-readable cause on failure.
    #[serde(default)]
    pub error_message: String,

    /// Handler instance that emitted this result.
    #[serde(default)]
    pub source_service: String,

    /// Transport routing key, copied from the command's `responseTopic`.
    pub topic: String,
}

impl CommandResult {
    /// Build a result from an action outcome.
    ///
    /// On failure the payload is left empty and the error's code and message
    /// are embedded instead.
    pub fn from_outcome(
        id: Uuid,
        correlation_id: Uuid,
        outcome: Result<Vec<u8>, ActionError>,
        source_service: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        let (payload, error_code, error_message) = match outcome {
            Ok(payload) => (payload, 0, String::new()),
            Err(e) => (Vec::new(), e.code(), e.to_string()),
        };

        Self {
            id,
            correlation_id,
            payload,
            error_code,
            error_message,
            source_service: source_service.into(),
            topic: topic.into(),
        }
    }

    /// Returns true if the result carries no error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }

    /// Decode a result from its wire representation.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Encode this result to its wire representation.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes;

    #[test]
    fn test_success_outcome() {
        let result = CommandResult::from_outcome(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Ok(b"{}".to_vec()),
            "rm-userauth-users",
            "resp",
        );
        assert!(result.is_success());
        assert_eq!(result.payload, b"{}");
        assert!(result.error_message.is_empty());
    }

    #[test]
    fn test_failure_outcome_clears_payload() {
        let result = CommandResult::from_outcome(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Err(ActionError::InvalidCredentials),
            "svc",
            "resp",
        );
        assert!(!result.is_success());
        assert!(result.payload.is_empty());
        assert_eq!(result.error_code, codes::INVALID_CREDENTIALS);
        assert_eq!(result.error_message, "invalid username or password");
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let result = CommandResult {
            id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            payload: vec![0, 159, 255, 10],
            error_code: codes::STORAGE_FAILURE,
            error_message: "storage failure: timed out".to_string(),
            source_service: "svc".to_string(),
            topic: "resp".to_string(),
        };
        let decoded = CommandResult::decode(&result.encode().unwrap()).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn test_wire_field_names() {
        let result = CommandResult::from_outcome(Uuid::nil(), Uuid::nil(), Ok(vec![]), "s", "t");
        let value: serde_json::Value = serde_json::from_slice(&result.encode().unwrap()).unwrap();
        for field in [
            "id",
            "correlationId",
            "payload",
            "errorCode",
            "errorMessage",
            "sourceService",
            "topic",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
