//! The intake gate.
//!
//! Turns raw message bytes into an admitted `Command` or a `Rejection`. The
//! gate validates content only; acknowledging the delivery is the consumer's
//! job and happens whether or not the gate admits the message.

use chrono::{DateTime, Utc};
use shared_types::Command;

use super::errors::Rejection;
use crate::ports::TimeSource;

/// Unix second after which a command is expired.
///
/// Computed in `i128`, so every `issued_at + ttl_seconds` is exact, including
/// deadlines outside the range of a calendar timestamp.
#[must_use]
pub fn deadline_of(command: &Command) -> i128 {
    i128::from(command.issued_at) + i128::from(command.ttl_seconds)
}

/// Whether a deadline in whole unix seconds is strictly before `now`.
#[must_use]
pub fn is_past(deadline: i128, now: DateTime<Utc>) -> bool {
    let now_secs = i128::from(now.timestamp());
    deadline < now_secs || (deadline == now_secs && now.timestamp_subsec_nanos() > 0)
}

/// Decodes and validates inbound commands.
pub struct CommandGate<T: TimeSource> {
    time_source: T,
}

impl<T: TimeSource> CommandGate<T> {
    pub fn new(time_source: T) -> Self {
        Self { time_source }
    }

    /// Decode `raw` and admit it if it is well formed and not expired.
    pub fn admit(&self, raw: &[u8]) -> Result<Command, Rejection> {
        let command = Command::decode(raw).map_err(|e| Rejection::Malformed(e.to_string()))?;

        if command.response_topic.is_empty() {
            return Err(Rejection::MissingResponseTopic);
        }
        if command.action.is_empty() {
            return Err(Rejection::MissingAction);
        }

        self.check_expiry(&command)?;
        Ok(command)
    }

    /// Expired iff the deadline is strictly before now.
    pub fn check_expiry(&self, command: &Command) -> Result<(), Rejection> {
        let deadline = deadline_of(command);
        let now = self.time_source.now();
        if is_past(deadline, now) {
            return Err(Rejection::Expired { deadline, now });
        }
        Ok(())
    }
}
