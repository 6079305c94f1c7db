//! # Query Flow
//!
//! Admission, routing and login outcomes observed on the response topic.
//!
//! ## Flow Tested
//!
//! ```text
//! request topic ──→ intake gate ──→ dispatcher ──→ LoginUser ──→ publisher ──→ response topic
//!                      │ reject         │ unroutable
//!                      ↓                ↓
//!                   (no result)      (no result)
//! ```

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use chrono::Utc;
    use qh_02_action_dispatch::{hash_password, InMemoryUserStore};
    use query_telemetry::{COMMANDS_REJECTED, PUBLISH_FAILURES};
    use query_runtime::{seed, RuntimeDeps};
    use shared_types::{codes, Attribution, Command, User};
    use uuid::Uuid;

    use crate::integration::harness::{
        login_command, test_config, Harness, PASSWORD, RESPONSE_TOPIC, RESULT_WAIT, SERVICE_NAME,
    };

    // =============================================================================
    // GATE REJECTIONS: NO RESULT
    // =============================================================================

    #[tokio::test]
    async fn test_expired_command_produces_no_result() {
        let mut harness = Harness::start();

        // Deadline is the start of the current second, so it has just passed.
        let mut expired = login_command("u1", PASSWORD);
        expired.issued_at = Utc::now().timestamp() - 15;
        expired.ttl_seconds = 15;

        harness.assert_no_result(&expired).await;
    }

    #[tokio::test]
    async fn test_long_expired_command_produces_no_result() {
        let mut harness = Harness::start();
        let mut expired = login_command("u1", PASSWORD);
        expired.issued_at -= 3600;

        harness.assert_no_result(&expired).await;
    }

    #[tokio::test]
    async fn test_empty_action_produces_no_result() {
        let mut harness = Harness::start();
        let mut command = login_command("u1", PASSWORD);
        command.action.clear();

        harness.assert_no_result(&command).await;
    }

    #[tokio::test]
    async fn test_empty_response_topic_produces_no_result() {
        let mut harness = Harness::start();
        let mut command = login_command("u1", PASSWORD);
        command.response_topic.clear();

        let rejected = COMMANDS_REJECTED.with_label_values(&["missing_response_topic"]);
        let rejected_before = rejected.get();
        let publish_failures_before = PUBLISH_FAILURES.get();

        harness.assert_no_result(&command).await;

        // The gate dropped it; nothing reached the producer.
        tokio::time::timeout(RESULT_WAIT, async {
            while rejected.get() < rejected_before + 1.0 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("rejection was not counted as missing_response_topic");
        assert_eq!(PUBLISH_FAILURES.get(), publish_failures_before);
    }

    #[tokio::test]
    async fn test_unregistered_action_produces_no_result() {
        let mut harness = Harness::start();
        let mut command = login_command("u1", PASSWORD);
        command.action = "RegisterUser".to_string();

        harness.assert_no_result(&command).await;
    }

    #[tokio::test]
    async fn test_type_mismatch_is_dropped() {
        let mut harness = Harness::start();
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"id":"{id}","action":"LoginUser","responseTopic":"{RESPONSE_TOPIC}","issuedAt":"yesterday","ttlSeconds":15}}"#
        );
        harness.send_raw(raw.into_bytes());

        harness.assert_no_result_for(id).await;
    }

    // =============================================================================
    // LOGIN OUTCOMES
    // =============================================================================

    #[tokio::test]
    async fn test_valid_login_returns_user_without_password() {
        let mut harness = Harness::start();
        let command = login_command("u1", PASSWORD);
        harness.send(&command);

        let result = harness
            .result_for(&command, RESULT_WAIT)
            .await
            .expect("no result for valid login");

        assert_eq!(result.error_code, codes::OK);
        assert!(result.error_message.is_empty());
        assert_eq!(result.correlation_id, command.id);
        assert_eq!(result.topic, command.response_topic);
        assert_eq!(result.source_service, SERVICE_NAME);
        assert!(!result.id.is_nil());

        let user: User = serde_json::from_slice(&result.payload).unwrap();
        assert_eq!(user.user_name, "u1");
        assert_eq!(user.user_id, "1");
        assert!(user.password.is_empty());
        let raw: serde_json::Value = serde_json::from_slice(&result.payload).unwrap();
        assert!(raw.get("password").is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let mut harness = Harness::start();

        let wrong_password = login_command("u1", "incorrect");
        harness.send(&wrong_password);
        let wrong = harness
            .result_for(&wrong_password, RESULT_WAIT)
            .await
            .expect("no result for wrong password");

        let unknown_user = login_command("nobody", PASSWORD);
        harness.send(&unknown_user);
        let unknown = harness
            .result_for(&unknown_user, RESULT_WAIT)
            .await
            .expect("no result for unknown user");

        for result in [&wrong, &unknown] {
            assert_ne!(result.error_code, codes::OK);
            assert_eq!(Attribution::of_code(result.error_code), Some(Attribution::Caller));
            assert!(result.payload.is_empty());
        }
        assert_eq!(wrong.error_code, unknown.error_code);
        assert_eq!(wrong.error_message, unknown.error_message);
        assert!(!wrong.error_message.contains("u1"));
        assert!(!unknown.error_message.contains("nobody"));
    }

    #[tokio::test]
    async fn test_undecodable_login_payload_is_an_internal_error() {
        let mut harness = Harness::start();
        let mut command = login_command("u1", PASSWORD);
        command.payload = b"[1,2,3]".to_vec();
        harness.send(&command);

        let result = harness
            .result_for(&command, RESULT_WAIT)
            .await
            .expect("no result for bad payload");
        assert_eq!(result.error_code, codes::PAYLOAD_DECODE);
        assert_eq!(
            Attribution::of_code(result.error_code),
            Some(Attribution::Internal)
        );
        assert!(result.payload.is_empty());
    }

    #[tokio::test]
    async fn test_result_correlates_on_command_id_not_correlation_id() {
        let mut harness = Harness::start();
        let command = Command {
            correlation_id: Uuid::new_v4(),
            ..login_command("nobody", "x")
        };
        harness.send(&command);

        let result = harness
            .result_for(&command, RESULT_WAIT)
            .await
            .expect("no result");
        assert_eq!(result.correlation_id, command.id);
        assert_ne!(result.correlation_id, command.correlation_id);
    }

    #[tokio::test]
    async fn test_result_goes_to_the_commands_response_topic() {
        let mut harness = Harness::start();
        let mut other = harness.broker.subscribe("user.auth.query.response.other");

        let mut command = login_command("nobody", "x");
        command.response_topic = "user.auth.query.response.other".to_string();
        harness.send(&command);

        let message = tokio::time::timeout(RESULT_WAIT, other.recv())
            .await
            .expect("no result on the alternate topic")
            .unwrap();
        let result = shared_types::CommandResult::decode(message.value.as_deref().unwrap()).unwrap();
        assert_eq!(result.correlation_id, command.id);
        assert_eq!(result.topic, "user.auth.query.response.other");
    }

    // =============================================================================
    // SEEDED STORE
    // =============================================================================

    #[tokio::test]
    async fn test_login_against_seed_file() {
        let seeded = User {
            user_id: "seed-1".to_string(),
            user_name: "seeded".to_string(),
            email: "seeded@example.com".to_string(),
            password: hash_password("from-file").unwrap(),
            ..Default::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&serde_json::to_vec(&vec![seeded]).unwrap())
            .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = test_config(&[("USER_SEED_FILE", path.as_str())]);
        let store = InMemoryUserStore::connect(&config.store).unwrap();
        let seed_path = config.user_seed_file.clone().unwrap();
        assert_eq!(seed::seed_store(&store, &seed_path).await.unwrap(), 1);

        let mut harness = Harness::start_with(&config, RuntimeDeps::new(Arc::new(store)));
        let command = login_command("seeded", "from-file");
        harness.send(&command);

        let result = harness
            .result_for(&command, RESULT_WAIT)
            .await
            .expect("no result for seeded login");
        assert!(result.is_success());
        let user: User = serde_json::from_slice(&result.payload).unwrap();
        assert_eq!(user.email, "seeded@example.com");
    }
}
