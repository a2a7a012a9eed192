#[cfg(test)]
mod tests {
    use sluice::{
        Adapter, BridgeError, Config, Error, Persistence, RawResultSet, RawUpdateResult,
        ShapeError, StateError, Value, future,
    };
    use sluice_tests::{MockDriver, Operation, init_logs, silent_logs};
    use std::fmt;
    use tokio::runtime::Handle;

    /// Driver error type, used to check the original cause survives the bridge.
    #[derive(Debug, PartialEq)]
    struct ConstraintViolation(&'static str);

    impl fmt::Display for ConstraintViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "constraint violated: {}", self.0)
        }
    }

    impl std::error::Error for ConstraintViolation {}

    fn config() -> Config {
        Config::new("mock://memory")
    }

    async fn connected(driver: &MockDriver) -> Adapter<MockDriver> {
        Adapter::new(driver.clone())
            .init(config(), &Handle::current())
            .await
            .expect("Could not initialize the adapter")
    }

    fn state_error(error: &Error) -> Option<StateError> {
        error.downcast_ref::<StateError>().copied()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn idle_commit_and_rollback_do_not_reach_the_driver() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        let executor = Handle::current();
        assert!(!adapter.is_in_transaction());
        adapter.commit(&executor).await.expect("Idle commit");
        adapter.rollback(&executor).await.expect("Idle rollback");
        adapter.commit(&executor).await.expect("Idle commit");
        assert_eq!(driver.count(Operation::Commit), 0);
        assert_eq!(driver.count(Operation::Rollback), 0);
        assert!(!adapter.is_in_transaction());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn begin_twice_disables_autocommit_once() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        let executor = Handle::current();
        adapter.begin(&executor).await.expect("First begin");
        adapter.begin(&executor).await.expect("Second begin");
        assert_eq!(driver.count(Operation::SetAutoCommit(false)), 1);
        assert_eq!(driver.count(Operation::SetAutoCommit(true)), 0);
        assert!(adapter.is_in_transaction());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_transaction_calls_keep_the_state() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        let executor = Handle::current();
        silent_logs! {
            driver.fail_next(Operation::SetAutoCommit(false), Error::msg("begin refused"));
            let error = adapter.begin(&executor).await.expect_err("Begin must fail");
            assert_eq!(error.to_string(), "begin refused");
            assert!(!adapter.is_in_transaction());

            adapter.begin(&executor).await.expect("Begin after a failure");
            driver.fail_next(Operation::Commit, Error::msg("commit refused"));
            let error = adapter.commit(&executor).await.expect_err("Commit must fail");
            assert_eq!(error.to_string(), "commit refused");
            assert!(adapter.is_in_transaction(), "A failed commit leaves the transaction open");

            driver.fail_next(Operation::Rollback, Error::msg("rollback refused"));
            adapter.rollback(&executor).await.expect_err("Rollback must fail");
            assert!(adapter.is_in_transaction());
        }
        adapter.rollback(&executor).await.expect("Rollback");
        assert!(!adapter.is_in_transaction());
        assert_eq!(driver.count(Operation::Commit), 1);
        assert_eq!(driver.count(Operation::Rollback), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn query_is_shaped_in_driver_order() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        driver.respond_query(RawResultSet {
            columns: vec!["id".into(), "name".into()],
            rows: vec![
                vec![Value::Int64(Some(1)), Value::Varchar(Some("a".into()))],
                vec![Value::Int64(Some(2)), Value::Varchar(Some("b".into()))],
            ],
        });
        let result = adapter
            .query("SELECT id, name FROM t", &Handle::current())
            .await
            .expect("Query must succeed");
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].get::<i64>("id").unwrap(), 1);
        assert_eq!(result[0].get::<String>("name").unwrap(), "a");
        assert_eq!(result[1].get::<i64>("id").unwrap(), 2);
        assert_eq!(result[1].get::<String>("name").unwrap(), "b");
        assert_eq!(driver.calls().last().unwrap().sql.as_deref(), Some("SELECT id, name FROM t"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn driver_failure_reaches_the_caller_unchanged() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        silent_logs! {
            driver.fail_next(Operation::Query, ConstraintViolation("unique_name"));
            let error = adapter
                .query("SELECT 1", &Handle::current())
                .await
                .expect_err("Query must fail");
            assert_eq!(
                error.downcast_ref::<ConstraintViolation>(),
                Some(&ConstraintViolation("unique_name"))
            );
            assert_eq!(error.to_string(), "constraint violated: unique_name");
            assert_eq!(error.chain().count(), 1, "No context is added to driver errors");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_result_fails_instead_of_hanging() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        driver.respond_query(RawResultSet {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec![Value::Int64(Some(1))]],
        });
        silent_logs! {
            let error = adapter
                .query("SELECT id, name FROM t", &Handle::current())
                .await
                .expect_err("A short row cannot be shaped");
            assert_eq!(
                error.downcast_ref::<ShapeError>(),
                Some(&ShapeError::RowWidth { row: 0, expected: 2, found: 1 })
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropped_callback_resolves_with_an_error() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        silent_logs! {
            driver.drop_next(Operation::Update);
            let error = adapter
                .update("DELETE FROM t", &Handle::current())
                .await
                .expect_err("A dropped callback must fail the operation");
            assert_eq!(
                error.downcast_ref::<BridgeError>(),
                Some(&BridgeError::CallbackDropped)
            );
        }
        let outcome = adapter
            .update("DELETE FROM t", &Handle::current())
            .await
            .expect("The adapter stays usable");
        assert_eq!(outcome.rows_affected, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn operations_outside_the_lifecycle_fail_fast() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = Adapter::new(driver.clone());
        let executor = Handle::current();
        silent_logs! {
            let error = adapter.query("SELECT 1", &executor).await.expect_err("Before init");
            assert_eq!(state_error(&error), Some(StateError::NotConnected));
            let error = adapter.begin(&executor).await.expect_err("Before init");
            assert_eq!(state_error(&error), Some(StateError::NotConnected));
        }
        assert!(driver.calls().is_empty(), "Nothing reached the driver");

        adapter.init(config(), &executor).await.expect("Init");
        adapter.close(&executor).await.expect("Close");
        silent_logs! {
            let error = adapter.query("SELECT 1", &executor).await.expect_err("After close");
            assert_eq!(state_error(&error), Some(StateError::NotConnected));
        }
        assert_eq!(driver.count(Operation::Query), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn operations_while_connecting_fail_fast() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = Adapter::new(driver.clone());
        let executor = Handle::current();
        let release = driver.hold_next(Operation::GetConnection);
        let pending = adapter.init(config(), &executor);
        assert!(!adapter.is_connected());
        silent_logs! {
            let error = adapter.query("SELECT 1", &executor).await.expect_err("Connecting");
            assert_eq!(state_error(&error), Some(StateError::Connecting));
            let error = adapter.update("DELETE FROM t", &executor).await.expect_err("Connecting");
            assert_eq!(state_error(&error), Some(StateError::Connecting));
            let error = adapter.begin(&executor).await.expect_err("Connecting");
            assert_eq!(state_error(&error), Some(StateError::Connecting));
            let error = adapter.close(&executor).await.expect_err("Connecting");
            assert_eq!(state_error(&error), Some(StateError::Connecting));
            let error = adapter.init(config(), &executor).await.expect_err("Init in flight");
            assert_eq!(state_error(&error), Some(StateError::AlreadyConnected));
        }
        assert!(!adapter.is_in_transaction());

        let _ = release.send(());
        let adapter = pending.await.expect("The first init completes");
        assert!(adapter.is_connected());
        assert_eq!(driver.count(Operation::CreateClient), 1);
        assert_eq!(driver.count(Operation::GetConnection), 1);
        assert_eq!(driver.calls().len(), 2, "Only the first init reached the driver");
        adapter
            .query("SELECT 1", &executor)
            .await
            .expect("Usable once connected");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_outcome_carries_string_keys() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        driver.respond_update(RawUpdateResult {
            updated: 1,
            keys: vec![Value::Int64(Some(5))],
        });
        let outcome = adapter
            .update("INSERT INTO t (name) VALUES ('x')", &Handle::current())
            .await
            .expect("Update must succeed");
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.keys, ["5"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn init_transaction_commit_close() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        let executor = Handle::current();
        adapter.begin(&executor).await.expect("Begin");
        assert!(adapter.is_in_transaction());
        adapter.commit(&executor).await.expect("Commit");
        assert!(!adapter.is_in_transaction());
        adapter.close(&executor).await.expect("Close");
        assert_eq!(driver.count(Operation::Close), 1);
        assert_eq!(driver.count(Operation::CloseClient), 1);
        silent_logs! {
            for error in [
                adapter.begin(&executor).await.expect_err("After close"),
                adapter.update("DELETE FROM t", &executor).await.expect_err("After close"),
                adapter.close(&executor).await.expect_err("After close"),
            ] {
                assert_eq!(state_error(&error), Some(StateError::NotConnected));
            }
        }
        assert_eq!(
            driver
                .calls()
                .into_iter()
                .map(|v| v.operation)
                .collect::<Vec<_>>(),
            [
                Operation::CreateClient,
                Operation::GetConnection,
                Operation::SetAutoCommit(false),
                Operation::Commit,
                Operation::Close,
                Operation::CloseClient,
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_init_can_be_retried() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = Adapter::new(driver.clone());
        let executor = Handle::current();
        silent_logs! {
            driver.fail_next(Operation::CreateClient, Error::msg("bad descriptor"));
            let error = adapter.init(config(), &executor).await.expect_err("Client creation fails");
            assert_eq!(error.to_string(), "bad descriptor");
            assert!(!adapter.is_connected());

            driver.fail_next(Operation::GetConnection, Error::msg("connection refused"));
            let error = adapter.init(config(), &executor).await.expect_err("Connection fails");
            assert_eq!(error.to_string(), "connection refused");
            assert!(!adapter.is_connected());

            driver.drop_next(Operation::GetConnection);
            let error = adapter.init(config(), &executor).await.expect_err("Callback dropped");
            assert_eq!(
                error.downcast_ref::<BridgeError>(),
                Some(&BridgeError::CallbackDropped)
            );
            assert!(!adapter.is_connected());
        }
        assert_eq!(
            driver.count(Operation::CloseClient),
            1,
            "The client of a refused connection is released"
        );
        adapter.init(config(), &executor).await.expect("Init after failures");
        assert!(adapter.is_connected());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_close_keeps_the_connection() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        let executor = Handle::current();
        silent_logs! {
            driver.fail_next(Operation::Close, Error::msg("socket busy"));
            adapter.close(&executor).await.expect_err("Close must fail");
        }
        assert!(adapter.is_connected());
        assert_eq!(driver.count(Operation::CloseClient), 0);
        adapter.query("SELECT 1", &executor).await.expect("Still usable");
        adapter.close(&executor).await.expect("Close retried");
        assert!(!adapter.is_connected());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn close_with_open_transaction_is_refused() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        let executor = Handle::current();
        adapter.begin(&executor).await.expect("Begin");
        silent_logs! {
            let error = adapter.close(&executor).await.expect_err("Transaction is open");
            assert_eq!(state_error(&error), Some(StateError::TransactionActive));
        }
        assert_eq!(driver.count(Operation::Close), 0);
        assert!(adapter.is_connected());
        adapter.rollback(&executor).await.expect("Rollback");
        adapter.close(&executor).await.expect("Close");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_init_is_refused() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        silent_logs! {
            let error = adapter
                .init(config(), &Handle::current())
                .await
                .expect_err("Already connected");
            assert_eq!(state_error(&error), Some(StateError::AlreadyConnected));
        }
        assert_eq!(driver.count(Operation::GetConnection), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropped_future_does_not_cancel_the_call() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        let executor = Handle::current();
        drop(adapter.begin(&executor));
        // The driver call still completes and flips the state
        for _ in 0..100 {
            if adapter.is_in_transaction() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(adapter.is_in_transaction());
        assert_eq!(driver.count(Operation::SetAutoCommit(false)), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn results_serialize_to_json() {
        init_logs();
        let driver = MockDriver::new();
        let adapter = connected(&driver).await;
        driver.respond_query(RawResultSet {
            columns: vec!["name".into(), "id".into()],
            rows: vec![vec![Value::Varchar(Some("z".into())), Value::Null]],
        });
        let result = adapter
            .query("SELECT name, id FROM t", &Handle::current())
            .await
            .expect("Query must succeed");
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"[{"name":"z","id":null}]"#
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn independent_adapters_run_concurrently() {
        init_logs();
        let executor = Handle::current();
        let drivers = (0..4).map(|_| MockDriver::new()).collect::<Vec<_>>();
        let adapters = future::try_join_all(
            drivers
                .iter()
                .map(|driver| Adapter::new(driver.clone()).init(config(), &executor)),
        )
        .await
        .expect("Every adapter connects");
        future::try_join_all(adapters.iter().map(|adapter| adapter.begin(&executor)))
            .await
            .expect("Every adapter begins");
        assert!(adapters.iter().all(|v| v.is_in_transaction()));
        future::try_join_all(adapters.iter().map(|adapter| adapter.commit(&executor)))
            .await
            .expect("Every adapter commits");
        for driver in &drivers {
            assert_eq!(driver.count(Operation::SetAutoCommit(false)), 1);
            assert_eq!(driver.count(Operation::Commit), 1);
        }
    }
}
