//! Inbound (Driving) port for command intake.

use shared_types::Command;

/// Admission API used by the message consumer.
pub trait CommandIntakeApi: Send + Sync {
    /// Admit a raw message body.
    ///
    /// Returns `None` when the message is rejected. Rejections are logged and
    /// counted by the implementation; nothing is reported to the caller.
    fn admit(&self, raw: &[u8]) -> Option<Command>;
}
