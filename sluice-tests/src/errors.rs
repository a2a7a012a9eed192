use crate::silent_logs;
use sluice_core::{Adapter, Config, Driver, Persistence, StateError};
use tokio::runtime::Handle;

pub async fn errors<D: Driver>(driver: D, config: &Config) {
    let executor = Handle::current();
    let adapter = Adapter::new(driver)
        .init(config.clone(), &executor)
        .await
        .expect("Could not initialize the adapter");

    silent_logs! {
        let error = adapter
            .query("SELEKT nonsense FROM", &executor)
            .await
            .expect_err("A malformed query must fail");
        assert!(
            error.downcast_ref::<StateError>().is_none(),
            "Driver failures are not state errors"
        );
        assert!(!error.to_string().is_empty());

        let error = adapter
            .update("INSERT INTO table_that_does_not_exist VALUES (1)", &executor)
            .await
            .expect_err("Inserting into a missing table must fail");
        assert!(
            error.to_string().contains("table_that_does_not_exist"),
            "The driver message must reach the caller: {error:#}"
        );
    }

    let result = adapter
        .query("SELECT 7 AS seven", &executor)
        .await
        .expect("The adapter must stay usable after a failure");
    assert_eq!(result[0].get::<i64>("seven").unwrap(), 7);

    adapter
        .close(&executor)
        .await
        .expect("Could not close the adapter");
}
