use crate::{Config, Result, Value};

/// Completion callback handed to every driver call. Invoked exactly once, on
/// whatever thread the driver completes the call on.
pub type Callback<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// Result set as produced by a driver: declared column labels plus positional rows.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RawResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Outcome of a data modifying statement as produced by a driver.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RawUpdateResult {
    pub updated: u64,
    /// Generated keys in the order the driver reports them.
    pub keys: Vec<Value>,
}

/// Entry point of a database backend: builds clients from a [`Config`].
pub trait Driver: Send + Sync + 'static {
    type Client: Client;

    /// Name of the backend, also the expected URL scheme.
    const NAME: &'static str;

    /// Build the client (pool) object. No connection is established yet.
    fn create_client(&self, config: &Config) -> Result<Self::Client>;
}

/// Client or pool object able to hand out connections.
pub trait Client: Send + Sync + 'static {
    type Connection: DriverConnection;

    fn get_connection(&self, callback: Callback<Self::Connection>);

    /// Release the client resources. Synchronous.
    fn close(&self);
}

/// One live physical connection. Every method returns immediately and reports
/// the outcome through the callback.
pub trait DriverConnection: Send + Sync + 'static {
    fn query(&self, sql: String, callback: Callback<RawResultSet>);

    fn update(&self, sql: String, callback: Callback<RawUpdateResult>);

    fn set_auto_commit(&self, auto_commit: bool, callback: Callback<()>);

    /// Commit the open transaction, the connection is in autocommit mode afterwards.
    fn commit(&self, callback: Callback<()>);

    /// Roll back the open transaction, the connection is in autocommit mode afterwards.
    fn rollback(&self, callback: Callback<()>);

    fn close(&self, callback: Callback<()>);
}
