use crate::{Config, Pending, TabularResult, UpdateOutcome};
use tokio::runtime::Handle;

/// Transaction aware persistence interface consumed by orchestration layers.
///
/// Every operation is dispatched on the given executor as soon as the method
/// is called and reports through the returned [`Pending`]. Operations on one
/// instance must not overlap: the caller awaits each before issuing the next.
pub trait Persistence: Send + Sync + Sized {
    /// Connect using `config`. Resolves with a handle sharing this instance's state.
    fn init(&self, config: Config, executor: &Handle) -> Pending<Self>;

    /// Close the connection and release the driver client.
    fn close(&self, executor: &Handle) -> Pending<()>;

    /// Start an explicit transaction. Resolves immediately if one is already open.
    fn begin(&self, executor: &Handle) -> Pending<()>;

    /// Commit the open transaction. Resolves immediately if there is none.
    fn commit(&self, executor: &Handle) -> Pending<()>;

    /// Roll back the open transaction. Resolves immediately if there is none.
    fn rollback(&self, executor: &Handle) -> Pending<()>;

    /// Non blocking read of the transaction state.
    fn is_in_transaction(&self) -> bool;

    fn query(&self, sql: impl Into<String>, executor: &Handle) -> Pending<TabularResult>;

    fn update(&self, sql: impl Into<String>, executor: &Handle) -> Pending<UpdateOutcome>;
}
