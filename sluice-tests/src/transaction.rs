use crate::silent_logs;
use sluice_core::{Adapter, Config, Driver, Persistence, StateError};
use tokio::runtime::Handle;

pub async fn transaction<D: Driver>(driver: D, config: &Config) {
    let executor = Handle::current();
    let adapter = Adapter::new(driver)
        .init(config.clone(), &executor)
        .await
        .expect("Could not initialize the adapter");

    adapter
        .update("DROP TABLE IF EXISTS transaction_entry", &executor)
        .await
        .expect("Failed to drop transaction_entry");
    adapter
        .update(
            "CREATE TABLE transaction_entry (id INTEGER PRIMARY KEY, label VARCHAR(32))",
            &executor,
        )
        .await
        .expect("Failed to create transaction_entry");

    // Nothing to end yet
    adapter.commit(&executor).await.expect("Idle commit must succeed");
    adapter.rollback(&executor).await.expect("Idle rollback must succeed");
    assert!(!adapter.is_in_transaction());

    adapter.begin(&executor).await.expect("Could not begin");
    adapter.begin(&executor).await.expect("A second begin is a no-op");
    assert!(adapter.is_in_transaction());
    adapter
        .update(
            "INSERT INTO transaction_entry (id, label) VALUES (1, 'discarded')",
            &executor,
        )
        .await
        .expect("Failed to insert inside the transaction");
    silent_logs! {
        let error = adapter
            .close(&executor)
            .await
            .expect_err("Closing with an open transaction must fail");
        assert_eq!(
            error.downcast_ref::<StateError>(),
            Some(&StateError::TransactionActive)
        );
    }
    assert!(adapter.is_connected());
    adapter.rollback(&executor).await.expect("Could not roll back");
    assert!(!adapter.is_in_transaction());
    let result = adapter
        .query("SELECT id FROM transaction_entry", &executor)
        .await
        .expect("Failed to select after rollback");
    assert!(result.is_empty(), "Rolled back rows must not be visible");

    adapter.begin(&executor).await.expect("Could not begin");
    for id in 1..=3 {
        adapter
            .update(
                format!("INSERT INTO transaction_entry (id, label) VALUES ({id}, 'kept')"),
                &executor,
            )
            .await
            .expect("Failed to insert inside the transaction");
    }
    adapter.commit(&executor).await.expect("Could not commit");
    assert!(!adapter.is_in_transaction());
    adapter.commit(&executor).await.expect("Repeated commit is a no-op");
    let result = adapter
        .query("SELECT id, label FROM transaction_entry ORDER BY id", &executor)
        .await
        .expect("Failed to select after commit");
    assert_eq!(result.len(), 3);
    assert!(result.iter().all(|v| v.get::<String>("label").unwrap() == "kept"));

    // Back in autocommit mode, writes are visible right away
    adapter
        .update("DELETE FROM transaction_entry WHERE id = 3", &executor)
        .await
        .expect("Failed to delete in autocommit mode");
    adapter
        .update("DROP TABLE transaction_entry", &executor)
        .await
        .expect("Failed to drop transaction_entry");
    adapter
        .close(&executor)
        .await
        .expect("Could not close the adapter");
}
