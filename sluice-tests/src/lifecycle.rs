use crate::silent_logs;
use sluice_core::{Adapter, Config, Driver, Persistence, StateError};
use tokio::runtime::Handle;

fn state_error(error: &sluice_core::Error) -> Option<StateError> {
    error.downcast_ref::<StateError>().copied()
}

pub async fn lifecycle<D: Driver>(driver: D, config: &Config) {
    let executor = Handle::current();
    let adapter = Adapter::new(driver);

    silent_logs! {
        let error = adapter
            .query("SELECT 1", &executor)
            .await
            .expect_err("Query before init must fail");
        assert_eq!(state_error(&error), Some(StateError::NotConnected));
        let error = adapter
            .close(&executor)
            .await
            .expect_err("Close before init must fail");
        assert_eq!(state_error(&error), Some(StateError::NotConnected));
    }

    let connected = adapter
        .init(config.clone(), &executor)
        .await
        .expect("Could not initialize the adapter");
    assert!(adapter.is_connected());
    assert!(connected.is_connected(), "The resolved handle shares the state");
    assert!(!connected.is_in_transaction());

    silent_logs! {
        let error = adapter
            .init(config.clone(), &executor)
            .await
            .expect_err("A second init must fail");
        assert_eq!(state_error(&error), Some(StateError::AlreadyConnected));
    }
    assert!(adapter.is_connected(), "A refused init leaves the connection live");

    connected
        .close(&executor)
        .await
        .expect("Could not close the adapter");
    assert!(!adapter.is_connected());

    silent_logs! {
        let error = adapter
            .update("DELETE FROM nothing", &executor)
            .await
            .expect_err("Update after close must fail");
        assert_eq!(state_error(&error), Some(StateError::NotConnected));
        let error = adapter
            .close(&executor)
            .await
            .expect_err("Closing twice must fail");
        assert_eq!(state_error(&error), Some(StateError::NotConnected));
    }

    adapter
        .init(config.clone(), &executor)
        .await
        .expect("A closed adapter can be initialized again");
    adapter
        .close(&executor)
        .await
        .expect("Could not close the adapter");
}
