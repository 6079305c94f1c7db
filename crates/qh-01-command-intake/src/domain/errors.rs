//! Intake rejection reasons.
//!
//! A rejected message never produces a result; the reason is only logged and
//! counted.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why the gate refused a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    /// The message body could not be decoded into a command.
    #[error("malformed command: {0}")]
    Malformed(String),

    /// `responseTopic` was empty, so there is nowhere to send a result.
    #[error("command has an empty response topic")]
    MissingResponseTopic,

    /// `action` was empty.
    #[error("command has an empty action")]
    MissingAction,

    /// The command's deadline passed before it reached the gate.
    ///
    /// `deadline` is in unix seconds.
    #[error("command expired at unix second {deadline}, now {now}")]
    Expired { deadline: i128, now: DateTime<Utc> },
}

impl Rejection {
    /// Short label used for the `reason` metric dimension.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::MissingResponseTopic => "missing_response_topic",
            Self::MissingAction => "missing_action",
            Self::Expired { .. } => "expired",
        }
    }
}
