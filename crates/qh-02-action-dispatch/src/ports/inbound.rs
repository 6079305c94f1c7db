//! Inbound (Driving) port for action dispatch.

use async_trait::async_trait;
use shared_types::{Command, CommandResult};

/// Dispatch API used by the query pipeline.
#[async_trait]
pub trait ActionDispatchApi: Send + Sync {
    /// Run the command's action and build its result.
    ///
    /// Returns `None` when no action is registered under `command.action`.
    /// Otherwise returns exactly one result, success or failure.
    async fn dispatch(&self, command: &Command) -> Option<CommandResult>;
}
