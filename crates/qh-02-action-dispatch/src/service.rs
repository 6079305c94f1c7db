//! # Dispatcher
//!
//! Routes admitted commands to their action and builds the correlated
//! result. Unroutable commands are logged and dropped without a result.

use async_trait::async_trait;
use query_telemetry::{RESULTS_EMITTED, UNROUTABLE_ACTIONS};
use shared_types::{ActionError, Attribution, Command, CommandResult};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::ActionRegistry;
use crate::ports::{ActionDispatchApi, IdGenerator, OsRngIdGenerator, UserStore};

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Stamped into every result's `sourceService`.
    pub service_name: String,
}

/// Action dispatcher.
pub struct Dispatcher {
    config: DispatcherConfig,
    registry: ActionRegistry,
    store: Arc<dyn UserStore>,
    ids: Arc<dyn IdGenerator>,
}

impl Dispatcher {
    /// Create a dispatcher drawing result ids from the OS RNG.
    pub fn new(config: DispatcherConfig, registry: ActionRegistry, store: Arc<dyn UserStore>) -> Self {
        Self::with_id_generator(config, registry, store, Arc::new(OsRngIdGenerator))
    }

    pub fn with_id_generator(
        config: DispatcherConfig,
        registry: ActionRegistry,
        store: Arc<dyn UserStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            ids,
        }
    }

    /// A fresh result id, or the nil id if generation fails.
    fn next_id(&self, command: &Command) -> Uuid {
        self.ids.generate().unwrap_or_else(|e| {
            error!(
                command_id = %command.id,
                error = %e,
                "Failed to generate result id, emitting result with nil id"
            );
            Uuid::nil()
        })
    }
}

fn outcome_label(outcome: &Result<Vec<u8>, ActionError>) -> &'static str {
    match outcome {
        Ok(_) => "ok",
        Err(e) => match e.attribution() {
            Attribution::Caller => "caller_error",
            Attribution::Internal => "internal_error",
        },
    }
}

#[async_trait]
impl ActionDispatchApi for Dispatcher {
    async fn dispatch(&self, command: &Command) -> Option<CommandResult> {
        let Some((tag, action)) = self.registry.resolve(&command.action) else {
            UNROUTABLE_ACTIONS.inc();
            warn!(
                command_id = %command.id,
                action = %command.action,
                "Unregistered action, dropping command"
            );
            return None;
        };

        let outcome = action.execute(self.store.as_ref(), &command.payload).await;

        let label = outcome_label(&outcome);
        RESULTS_EMITTED
            .with_label_values(&[tag.as_str(), label])
            .inc();
        match &outcome {
            Ok(_) => debug!(command_id = %command.id, action = %tag, "Action succeeded"),
            Err(e) => warn!(
                command_id = %command.id,
                action = %tag,
                code = e.code(),
                outcome = label,
                error = %e,
                "Action failed"
            ),
        }

        Some(CommandResult::from_outcome(
            self.next_id(command),
            command.id,
            outcome,
            self.config.service_name.clone(),
            command.response_topic.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, ActionTag};
    use crate::ports::{IdError, StoreError};
    use shared_types::{codes, User};

    struct NoUsers;

    #[async_trait]
    impl UserStore for NoUsers {
        async fn find_by_username(&self, user_name: &str) -> Result<User, StoreError> {
            Err(StoreError::NotFound(user_name.to_string()))
        }
    }

    /// Echoes the payload, or fails when it is `fail`.
    struct Echo;

    #[async_trait]
    impl Action for Echo {
        async fn execute(
            &self,
            _store: &dyn UserStore,
            payload: &[u8],
        ) -> Result<Vec<u8>, ActionError> {
            if payload == b"fail" {
                return Err(ActionError::Storage("down".to_string()));
            }
            Ok(payload.to_vec())
        }
    }

    struct BrokenIds;

    impl IdGenerator for BrokenIds {
        fn generate(&self) -> Result<Uuid, IdError> {
            Err(IdError("entropy exhausted".to_string()))
        }
    }

    fn dispatcher(ids: Arc<dyn IdGenerator>) -> Dispatcher {
        let registry = ActionRegistry::builder()
            .register(ActionTag::LoginUser, Arc::new(Echo))
            .build();
        Dispatcher::with_id_generator(
            DispatcherConfig {
                service_name: "rm-userauth-users".to_string(),
            },
            registry,
            Arc::new(NoUsers),
            ids,
        )
    }

    fn command(action: &str, payload: &[u8]) -> Command {
        Command {
            id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            action: action.to_string(),
            payload: payload.to_vec(),
            response_topic: "user.auth.response".to_string(),
            source: String::new(),
            source_topic: String::new(),
            issued_at: 0,
            ttl_seconds: 0,
        }
    }

    #[tokio::test]
    async fn test_success_result_is_correlated_on_command_id() {
        let dispatcher = dispatcher(Arc::new(OsRngIdGenerator));
        let cmd = command("LoginUser", b"hello");

        let result = dispatcher.dispatch(&cmd).await.unwrap();

        assert_eq!(result.correlation_id, cmd.id);
        assert_ne!(result.correlation_id, cmd.correlation_id);
        assert_ne!(result.id, cmd.id);
        assert!(!result.id.is_nil());
        assert_eq!(result.topic, "user.auth.response");
        assert_eq!(result.source_service, "rm-userauth-users");
        assert_eq!(result.payload, b"hello");
        assert_eq!(result.error_code, codes::OK);
    }

    #[tokio::test]
    async fn test_failure_result_embeds_error() {
        let dispatcher = dispatcher(Arc::new(OsRngIdGenerator));
        let result = dispatcher
            .dispatch(&command("LoginUser", b"fail"))
            .await
            .unwrap();

        assert_eq!(result.error_code, codes::STORAGE_FAILURE);
        assert_eq!(result.error_message, "storage failure: down");
        assert!(result.payload.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_action_produces_no_result() {
        let dispatcher = dispatcher(Arc::new(OsRngIdGenerator));
        let before = UNROUTABLE_ACTIONS.get();

        assert!(dispatcher.dispatch(&command("DeleteUser", b"")).await.is_none());
        assert!(UNROUTABLE_ACTIONS.get() >= before + 1.0);
    }

    #[tokio::test]
    async fn test_id_failure_degrades_to_nil_id() {
        let dispatcher = dispatcher(Arc::new(BrokenIds));
        let cmd = command("LoginUser", b"hello");

        let result = dispatcher.dispatch(&cmd).await.unwrap();
        assert!(result.id.is_nil());
        assert_eq!(result.correlation_id, cmd.id);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_standard_registry_login_unknown_user() {
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                service_name: "svc".to_string(),
            },
            ActionRegistry::standard(),
            Arc::new(NoUsers),
        );
        let payload = br#"{"userName":"ghost","password":"pw"}"#;

        let result = dispatcher
            .dispatch(&command("LoginUser", payload))
            .await
            .unwrap();
        assert_eq!(result.error_code, codes::INVALID_CREDENTIALS);
        assert_eq!(result.error_message, "invalid username or password");
    }
}
