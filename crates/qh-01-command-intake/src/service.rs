//! # Command Intake Service
//!
//! Implements `CommandIntakeApi` on top of the domain gate, adding logging
//! and the rejection counters.

use query_telemetry::COMMANDS_REJECTED;
use shared_types::Command;
use tracing::{debug, warn};

use crate::domain::{CommandGate, Rejection};
use crate::ports::{CommandIntakeApi, TimeSource};

/// Command intake service.
pub struct CommandIntakeService<T: TimeSource> {
    gate: CommandGate<T>,
}

impl<T: TimeSource> CommandIntakeService<T> {
    pub fn new(time_source: T) -> Self {
        Self {
            gate: CommandGate::new(time_source),
        }
    }

    /// Like `admit`, but returns the rejection instead of recording it.
    pub fn try_admit(&self, raw: &[u8]) -> Result<Command, Rejection> {
        self.gate.admit(raw)
    }

    fn record(&self, rejection: &Rejection) {
        COMMANDS_REJECTED
            .with_label_values(&[rejection.reason()])
            .inc();

        match rejection {
            Rejection::Expired { .. } => debug!(reason = rejection.reason(), "{rejection}"),
            _ => warn!(reason = rejection.reason(), "{rejection}"),
        }
    }
}

impl<T: TimeSource> CommandIntakeApi for CommandIntakeService<T> {
    fn admit(&self, raw: &[u8]) -> Option<Command> {
        match self.gate.admit(raw) {
            Ok(command) => {
                debug!(
                    command_id = %command.id,
                    action = %command.action,
                    response_topic = %command.response_topic,
                    "Command admitted"
                );
                Some(command)
            }
            Err(rejection) => {
                self.record(&rejection);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::MockTimeSource;
    use uuid::Uuid;

    const NOW: i64 = 1_700_000_000;

    fn raw_command(action: &str, issued_at: i64) -> Vec<u8> {
        Command {
            id: Uuid::new_v4(),
            correlation_id: Uuid::nil(),
            action: action.to_string(),
            payload: Vec::new(),
            response_topic: "resp".to_string(),
            source: String::new(),
            source_topic: String::new(),
            issued_at,
            ttl_seconds: 15,
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn test_admit_passes_valid_command() {
        let service = CommandIntakeService::new(MockTimeSource::at_secs(NOW));
        let command = service.admit(&raw_command("LoginUser", NOW)).unwrap();
        assert_eq!(command.action, "LoginUser");
    }

    #[test]
    fn test_rejection_is_counted() {
        let service = CommandIntakeService::new(MockTimeSource::at_secs(NOW));
        let before = COMMANDS_REJECTED
            .with_label_values(&["missing_action"])
            .get();

        assert!(service.admit(&raw_command("", NOW)).is_none());

        let after = COMMANDS_REJECTED
            .with_label_values(&["missing_action"])
            .get();
        assert!(after >= before + 1.0);
    }

    #[test]
    fn test_try_admit_exposes_reason() {
        let service = CommandIntakeService::new(MockTimeSource::at_secs(NOW));
        let rejection = service
            .try_admit(&raw_command("LoginUser", NOW - 100))
            .unwrap_err();
        assert_eq!(rejection.reason(), "expired");
    }
}
