//! # Delivery
//!
//! Acknowledgement, fan-out and shutdown behavior of the consume loop.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use qh_02_action_dispatch::{IdError, IdGenerator, InMemoryUserStore};
    use query_runtime::RuntimeDeps;
    use shared_bus::TransportError;
    use shared_types::codes;
    use uuid::Uuid;

    use crate::integration::harness::{
        login_command, stored_user, test_config, Harness, RESULT_WAIT,
    };

    struct FailingIds;

    impl IdGenerator for FailingIds {
        fn generate(&self) -> Result<Uuid, IdError> {
            Err(IdError("entropy source unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_malformed_bytes_are_acked_without_result() {
        let mut harness = Harness::start();
        harness.send_raw(b"{not json".to_vec());
        harness.send_raw(Vec::new());

        harness.wait_for_acks(2).await;
        assert!(harness.next_result(std::time::Duration::from_millis(200)).await.is_none());
    }

    #[tokio::test]
    async fn test_tombstone_is_acked_without_result() {
        let mut harness = Harness::start();
        harness.send_tombstone();

        harness.wait_for_acks(1).await;
        assert!(harness.next_result(std::time::Duration::from_millis(200)).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_command_gets_exactly_one_result() {
        let mut harness = Harness::start();
        let commands: Vec<_> = (0..24)
            .map(|i| login_command(&format!("nobody-{i}"), "x"))
            .collect();
        for command in &commands {
            harness.send(command);
        }

        let results = harness.collect_results(commands.len() + 1, RESULT_WAIT).await;
        assert_eq!(results.len(), commands.len());

        let expected: HashSet<Uuid> = commands.iter().map(|c| c.id).collect();
        let correlated: HashSet<Uuid> = results.iter().map(|r| r.correlation_id).collect();
        assert_eq!(correlated, expected);

        let ids: HashSet<Uuid> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), results.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_message_is_acked_whatever_its_outcome() {
        let mut harness = Harness::start();

        let valid = login_command("u1", "incorrect");
        let mut expired = login_command("u1", "correct");
        expired.issued_at -= 60;
        let mut unroutable = login_command("u1", "correct");
        unroutable.action = "DeleteUser".to_string();

        harness.send(&valid);
        harness.send(&expired);
        harness.send(&unroutable);
        harness.send_raw(b"garbage".to_vec());
        harness.send_tombstone();

        harness.wait_for_acks(5).await;
        assert_eq!(harness.session().marked_count(), 5);

        let result = harness.result_for(&valid, RESULT_WAIT).await.unwrap();
        assert_eq!(result.error_code, codes::INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_acks_advance_committed_offset() {
        let harness = Harness::start();
        for _ in 0..3 {
            harness.send(&login_command("nobody", "x"));
        }

        harness.wait_for_acks(3).await;
        let session = harness.session();
        assert_eq!(
            session.committed_offset(crate::integration::harness::REQUEST_TOPIC, 0),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_shutdown_ends_consume_loop_with_context_closed() {
        let harness = Harness::start();
        harness.send(&login_command("nobody", "x"));
        harness.wait_for_acks(1).await;

        assert_eq!(harness.shutdown().await, Err(TransportError::ContextClosed));
    }

    #[tokio::test]
    async fn test_id_failure_still_publishes_with_nil_id() {
        let config = test_config(&[]);
        let store = InMemoryUserStore::connect(&config.store).unwrap();
        store.seed(vec![stored_user("1", "u1")]).unwrap();
        let deps = RuntimeDeps {
            ids: Arc::new(FailingIds),
            ..RuntimeDeps::new(Arc::new(store))
        };
        let mut harness = Harness::start_with(&config, deps);

        let command = login_command("nobody", "x");
        harness.send(&command);

        let result = harness.result_for(&command, RESULT_WAIT).await.unwrap();
        assert!(result.id.is_nil());
        assert_eq!(result.correlation_id, command.id);
        assert_eq!(result.error_code, codes::INVALID_CREDENTIALS);
    }
}
